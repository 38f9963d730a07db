use thiserror::Error;

use crate::model::{CategoryParseError, ParseIdError, QuizContentError, ReferenceError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error(transparent)]
    Content(#[from] QuizContentError),
    #[error(transparent)]
    Category(#[from] CategoryParseError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
}
