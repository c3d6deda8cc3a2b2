//! Field paths into JSON documents, as used by immutable-field policies
//!
//! Paths look like `spec.plan`, `.spec.template.spec.containers[name="app"].image`
//! or `.metadata."annotations.example.com/key"`.

mod error;
pub use error::*;
mod element;
pub use element::Element;
mod ext;
mod flatten;
mod path;
pub use ext::FieldpathExt;
pub use flatten::{flatten, flatten_prefixed, DEFAULT_MAX_DEPTH};
pub use path::{Path, PathBuf};
mod parse;
pub use parse::parse;

/// Construct &Path without parsing
#[macro_export]
macro_rules! path {
    ($(.$text:literal)+) => {
        &[$($crate::Element::StaticField($text)),+][..] as &$crate::Path
    };
}
