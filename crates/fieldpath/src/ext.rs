use crate::{Element, Error, Path, Result};
use serde_json::Value;

fn matches_select(item: &Value, key: &str, value: &Value) -> bool {
    match item {
        Value::Object(obj) => obj.get(key).map(|found| found == value).unwrap_or(false),
        _ => false,
    }
}

pub trait FieldpathExt: Sized {
    fn get_comp(&self, comp: &Element) -> Result<&Self>;
    fn get_path(&self, path: &Path) -> Result<&Self>;

    /// Like [`FieldpathExt::get_path`], but absent fields are `Ok(None)`
    fn lookup_path(&self, path: &Path) -> Result<Option<&Self>>;
}

impl FieldpathExt for Value {
    fn get_comp(&self, comp: &Element) -> Result<&Self> {
        match comp {
            Element::Field(field) => self.get(field.as_str()).ok_or(Error::FieldNotFound),
            Element::StaticField(field) => self.get(*field).ok_or(Error::FieldNotFound),
            Element::Select(key, value) => match self {
                Value::Array(items) => {
                    let mut found = None;
                    for item in items {
                        if matches_select(item, key, value) {
                            if found.is_some() {
                                return Err(Error::SelectMatchedMultipleItems);
                            }
                            found.replace(item);
                        }
                    }
                    found.ok_or(Error::SelectMatchedNoItems)
                }
                _ => Err(Error::SelectTargetIsNotArray),
            },
            Element::Index(idx) => match self {
                Value::Array(items) => items.get(*idx).ok_or(Error::OutOfBounds),
                _ => Err(Error::SelectTargetIsNotArray),
            },
        }
    }

    fn get_path(&self, path: &Path) -> Result<&Self> {
        let mut found = self;
        for (idx, elem) in path.iter().enumerate() {
            found = found
                .get_comp(elem)
                .map_err(|e| Error::AtPath((&path[0..idx]).into(), Box::new(e)))?;
        }
        Ok(found)
    }

    fn lookup_path(&self, path: &Path) -> Result<Option<&Self>> {
        match self.get_path(path) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_missing() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
