use pageflow_core::{ContinuationError, PageFlowError};
use thiserror::Error;

/// Errores del host (CLI, catálogo de flujos, almacén de sesión).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error en IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error de configuración: {0}")]
    Config(String),
    #[error("JSON inválido: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    PageFlow(#[from] PageFlowError),
    #[error(transparent)]
    Continuation(#[from] ContinuationError),
}
