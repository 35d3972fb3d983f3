use std::fmt::Debug;

/// Fuente externa de (flow ID, instance ID, event ID) de cada activación.
/// Normalmente la implementa el host a partir de la petición entrante.
pub trait ContinuationContextProvider: Send + Sync + Debug {
    fn flow_id(&self) -> Option<String>;
    /// Ausente en el primer contacto.
    fn instance_id(&self) -> Option<String>;
    fn event_id(&self) -> Option<String>;
}

/// Contexto fijo, útil para CLIs y tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticContext {
    flow_id: Option<String>,
    instance_id: Option<String>,
    event_id: Option<String>,
}

impl StaticContext {
    pub fn new(flow_id: impl Into<String>) -> Self {
        Self { flow_id: Some(flow_id.into()),
               ..Self::default() }
    }

    pub fn with_instance(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    pub fn with_event(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }
}

impl ContinuationContextProvider for StaticContext {
    fn flow_id(&self) -> Option<String> {
        self.flow_id.clone()
    }

    fn instance_id(&self) -> Option<String> {
        self.instance_id.clone()
    }

    fn event_id(&self) -> Option<String> {
        self.event_id.clone()
    }
}
