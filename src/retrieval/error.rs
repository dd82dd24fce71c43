use thiserror::Error;

/// Enum of the possible error variants that may be encountered
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    /// Represents arrays or parameters handed to a pipeline stage that can never produce a
    /// result, e.g. mismatched lengths or a zero-width sampling window
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(feature = "python")]
impl From<RetrievalError> for pyo3::PyErr {
    fn from(value: RetrievalError) -> Self {
        let msg = value.to_string();
        pyo3::exceptions::PyValueError::new_err(msg)
    }
}
