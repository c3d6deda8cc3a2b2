use crate::{path::PathBuf, Element};
use peg::str::LineCol;
use serde_json::Value;

peg::parser! {
    pub grammar parser() for str {
        rule bare_name() -> String
            = name:$((!['.' | '\n' | '[' | '"'][_])+) {
                name.to_owned()
            }
        rule quoted_char() -> char
            = "\\" c:['"' | '\\'] { c }
            / !['"' | '\\'] c:[_] { c }
        rule quoted_name() -> String
            = "\"" chars:quoted_char()+ "\"" {
                chars.into_iter().collect()
            }
        rule name() -> String
            = quoted_name()
            / bare_name()

        rule field() -> Element
            = "." name:name() {
                Element::Field(name)
            }
        rule index() -> Element
            = "[" idx:$(['0'..='9']+) "]" {?
                idx.parse().map(Element::Index).or(Err("index"))
            }
        rule selector() -> Element
            = "[" key:$((!['=' | ']'][_])+) "=\"" value:$((!['"'][_])*) "\"]" {
                Element::Select(key.to_owned(), Value::String(value.to_owned()))
            }
        rule element() -> Element
            = field()
            / index()
            / selector()

        // Leading dot is optional: `spec.plan` == `.spec.plan`
        rule head() -> Element
            = name:name() {
                Element::Field(name)
            }

        pub rule path() -> PathBuf
            = head:head()? rest:element()* {?
                let mut out: Vec<Element> = head.into_iter().collect();
                out.extend(rest);
                if out.is_empty() {
                    Err("non-empty path")
                } else {
                    Ok(PathBuf(out))
                }
            }
    }
}

pub fn parse(input: &str) -> Result<PathBuf, peg::error::ParseError<LineCol>> {
    parser::path(input.trim())
}
