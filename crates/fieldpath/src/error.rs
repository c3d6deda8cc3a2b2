use thiserror::Error;

use crate::PathBuf;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("field not found")]
    FieldNotFound,
    #[error("select target is not an array")]
    SelectTargetIsNotArray,
    #[error("select matched multiple items")]
    SelectMatchedMultipleItems,
    #[error("select matched no items")]
    SelectMatchedNoItems,
    #[error("index out of bounds")]
    OutOfBounds,
    #[error("document is nested deeper than {0} levels")]
    DepthExceeded(usize),
    #[error("at {0}: {1}")]
    AtPath(PathBuf, Box<Error>),
}

impl Error {
    /// True if the error means "nothing at this path", as opposed to a
    /// path which does not fit the document shape at all
    pub fn is_missing(&self) -> bool {
        match self {
            Self::FieldNotFound | Self::SelectMatchedNoItems | Self::OutOfBounds => true,
            Self::AtPath(_, inner) => inner.is_missing(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
