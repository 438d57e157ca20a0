use thiserror::Error;
use tradeseal_core::{ErrorKind, ValidationError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl BindingError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
