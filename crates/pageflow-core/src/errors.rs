//! Errores del motor de page-flows.
//!
//! - `PageFlowError`: errores de configuración/integración (definiciones
//!   inválidas, nombres reservados, acciones inexistentes, eventos
//!   inesperados). Son fatales para la activación en curso.
//! - `ContinuationError`: errores del protocolo de continuación (flow ID
//!   ausente o desconocido, ticket reutilizado contra otro flujo, instancia
//!   expirada). Son recuperables: el repositorio queda intacto.
//! - `ActionError`: fallo reportado por un handler de acciones.
//!
//! El rechazo de un guard NO es un error (ver `PageFlow::trigger_event`).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PageFlowError {
    #[error("invalid definition for flow '{flow_id}': {reason}")]
    InvalidDefinition { flow_id: String, reason: String },
    #[error("flow '{flow_id}' uses the reserved state name '{state}'")]
    ReservedState { flow_id: String, state: String },
    #[error("flow '{flow_id}' uses the reserved event name '{event}'")]
    ReservedEvent { flow_id: String, event: String },
    #[error("page flow has not been activated")]
    NotActivated,
    #[error("state '{0}' is not defined")]
    UnknownState(String),
    #[error("state '{0}' has no view")]
    NoView(String),
    #[error("action handler '{0}' not found")]
    ActionNotFound(String),
    #[error("action '{handler}' failed: {message}")]
    ActionFailed { handler: String, message: String },
    #[error("action '{handler}' returned the unexpected event '{event}'")]
    UnexpectedEvent { handler: String, event: String },
    #[error("more than {0} chained events in a single activation")]
    EventLoop(usize),
    #[error("cannot load definition for flow '{flow_id}': {reason}")]
    DefinitionSource { flow_id: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ContinuationError {
    #[error("flow ID required")]
    FlowIdRequired,
    #[error("flow '{0}' not found")]
    FlowNotFound(String),
    #[error("unexpected flow ID '{given}' for instance bound to '{expected}'")]
    UnexpectedFlowId { expected: String, given: String },
    #[error("instance '{0}' expired")]
    InstanceExpired(String),
    #[error("instance '{0}' not found")]
    InstanceNotFound(String),
    #[error("no page flow instance is active")]
    NoActiveInstance,
    #[error("invalid session state: {0}")]
    InvalidSession(String),
    #[error(transparent)]
    PageFlow(#[from] PageFlowError),
}

/// Error devuelto por un `ActionHandler`.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ActionError {
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
    #[error("{0}")]
    Failed(String),
}

impl ActionError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
