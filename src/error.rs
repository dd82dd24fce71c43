use crate::config::ConfigError;
use crate::retrieval::error::RetrievalError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GnssrError {
    /// Represents a bad or inconsistent configuration
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Represents a precondition violation inside the retrieval pipeline
    #[error("{0}")]
    Retrieval(#[from] RetrievalError),

    /// Unable to read a receiver log
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Unable to export retrievals
    #[error("{0}")]
    Csv(#[from] csv::Error),
}

#[cfg(feature = "python")]
impl From<GnssrError> for pyo3::PyErr {
    fn from(value: GnssrError) -> Self {
        let msg = value.to_string();
        match value {
            GnssrError::Io(_) => pyo3::exceptions::PyIOError::new_err(msg),
            _ => pyo3::exceptions::PyValueError::new_err(msg),
        }
    }
}
