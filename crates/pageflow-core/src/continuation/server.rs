//! `ContinuationServer`: fachada que ejecuta una activación completa.
//!
//! Protocolo de `activate(payload)`:
//!
//! 1. `mark()` del recolector (si hay) y retirada de las lápidas vencidas.
//! 2. Resolver (flow ID, instance ID) desde el proveedor de contexto: reanudar
//!    la instancia conocida o crear una nueva.
//! 3. Conectar invoker + payload y activar (arranque o evento).
//! 4. `update()` del recolector para flujos no exclusivos.
//! 5. Dejar pendiente la limpieza, que corre una sola vez por activación en
//!    `clear()` (explícito o al soltar el `ActivationScope`).

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use chrono::Duration;
use serde_json::Value;

use super::context::{ContinuationContextProvider, StaticContext};
use super::session::SessionState;
use crate::action::ActionInvoker;
use crate::clock::{system_clock, Clock};
use crate::errors::{ContinuationError, PageFlowError};
use crate::flow::PageFlow;
use crate::gc::GarbageCollector;
use crate::instance::PageFlowInstance;
use crate::repository::{FlowSource, PageFlowInstanceRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPhase {
    Idle,
    Preparing,
    Starting,
    Continuing,
    Activated,
    Cleared,
}

/// Configuración del servidor. Sin expiración no hay recolector.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    gc_expiration: Option<Duration>,
    clock: Option<Arc<dyn Clock>>,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gc_expiration(mut self, expiration: Duration) -> Self {
        self.gc_expiration = Some(expiration);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn gc_expiration(&self) -> Option<Duration> {
        self.gc_expiration
    }
}

#[derive(Debug)]
pub struct ContinuationServer {
    repository: PageFlowInstanceRepository,
    collector: Option<GarbageCollector>,
    invoker: Arc<dyn ActionInvoker>,
    context: Box<dyn ContinuationContextProvider>,
    phase: ServerPhase,
    active_instance: Option<String>,
    cleanup_pending: bool,
}

impl ContinuationServer {
    pub fn new(invoker: Arc<dyn ActionInvoker>, config: ServerConfig) -> Self {
        let collector = config.gc_expiration.map(|expiration| {
                                                let clock = config.clock.clone().unwrap_or_else(system_clock);
                                                GarbageCollector::with_clock(expiration, clock)
                                            });
        Self { repository: PageFlowInstanceRepository::new(),
               collector,
               invoker,
               context: Box::new(StaticContext::default()),
               phase: ServerPhase::Idle,
               active_instance: None,
               cleanup_pending: false }
    }

    pub fn add_page_flow(&mut self, flow_id: &str, source: FlowSource, exclusive: bool) -> Result<(), PageFlowError> {
        self.repository.add_page_flow(flow_id, source, exclusive)
    }

    pub fn set_context_provider<P>(&mut self, provider: P)
        where P: ContinuationContextProvider + 'static
    {
        self.context = Box::new(provider);
    }

    pub fn phase(&self) -> ServerPhase {
        self.phase
    }

    /// Ejecuta una activación y devuelve el ID de la instancia activa.
    ///
    /// Si la activación anterior no se limpió, se limpia primero.
    pub fn activate(&mut self, payload: Value) -> Result<String, ContinuationError> {
        if self.cleanup_pending {
            log::warn!("previous activation was not cleared, clearing it now");
            self.clear();
        }
        self.phase = ServerPhase::Preparing;
        self.cleanup_pending = true;
        self.active_instance = None;
        if let Some(gc) = self.collector.as_mut() {
            gc.mark();
            let repository = &mut self.repository;
            gc.reclaim(|instance_id| {
                  repository.remove_disabled(instance_id);
              });
        }

        let flow_id = self.context
                          .flow_id()
                          .filter(|id| !id.trim().is_empty())
                          .ok_or(ContinuationError::FlowIdRequired)?;
        let event = self.context.event_id().filter(|e| !e.is_empty());

        let instance_id = match self.resolve_instance(&flow_id)? {
            Some(id) => {
                self.phase = ServerPhase::Continuing;
                id
            }
            None => {
                self.phase = ServerPhase::Starting;
                self.create_instance(&flow_id)?
            }
        };
        self.active_instance = Some(instance_id.clone());

        let invoker = Arc::clone(&self.invoker);
        let instance = self.repository
                           .find_by_id_mut(&instance_id)
                           .ok_or_else(|| ContinuationError::InstanceNotFound(instance_id.clone()))?;
        if let Err(e) = instance.activate(invoker, payload, event.as_deref()) {
            if self.phase == ServerPhase::Starting {
                // Una instancia que no llegó a arrancar no se conserva.
                self.repository.remove(&instance_id);
                self.active_instance = None;
            }
            log::error!("activation of flow '{flow_id}' failed: {e}");
            return Err(e.into());
        }

        if !self.repository.is_exclusive(&flow_id) {
            if let Some(gc) = self.collector.as_mut() {
                gc.update(&instance_id);
            }
        }
        self.phase = ServerPhase::Activated;
        Ok(instance_id)
    }

    /// `Some(id)` si el contexto apunta a una instancia viva del flujo.
    fn resolve_instance(&mut self, flow_id: &str) -> Result<Option<String>, ContinuationError> {
        let Some(instance_id) = self.context.instance_id().filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        let Some(instance) = self.repository.find_by_id(&instance_id) else {
            log::debug!("unknown instance '{instance_id}', starting flow '{flow_id}' afresh");
            return Ok(None);
        };
        if instance.flow_id() != flow_id {
            return Err(ContinuationError::UnexpectedFlowId { expected: instance.flow_id().to_string(),
                                                             given: flow_id.to_string() });
        }
        let expired = instance.is_disabled()
                      || self.collector
                             .as_ref()
                             .is_some_and(|gc| gc.is_marked(&instance_id));
        if expired {
            self.repository.remove(&instance_id);
            if let Some(gc) = self.collector.as_mut() {
                gc.forget(&instance_id);
            }
            log::warn!("instance '{instance_id}' of flow '{flow_id}' expired");
            return Err(ContinuationError::InstanceExpired(instance_id));
        }
        Ok(Some(instance_id))
    }

    fn create_instance(&mut self, flow_id: &str) -> Result<String, ContinuationError> {
        let definition = self.repository
                             .definition(flow_id)?
                             .ok_or_else(|| ContinuationError::FlowNotFound(flow_id.to_string()))?;
        let instance_id = self.repository.generate_instance_id();
        let instance = PageFlowInstance::new(instance_id.clone(), PageFlow::new(definition));
        if let Some(evicted) = self.repository.add(instance) {
            if let Some(gc) = self.collector.as_mut() {
                gc.forget(evicted.id());
            }
        }
        Ok(instance_id)
    }

    /// Limpieza de fin de activación; corre una sola vez por activación,
    /// también si la activación falló.
    pub fn clear(&mut self) {
        if !self.cleanup_pending {
            return;
        }
        self.cleanup_pending = false;

        if let Some(instance_id) = self.active_instance.take() {
            let terminal = match self.repository.find_by_id_mut(&instance_id) {
                Some(instance) => {
                    instance.detach();
                    instance.is_in_final_state()
                }
                None => false,
            };
            if terminal {
                self.repository.remove(&instance_id);
                if let Some(gc) = self.collector.as_mut() {
                    gc.forget(&instance_id);
                }
            }
        }
        if let Some(gc) = self.collector.as_mut() {
            let repository = &mut self.repository;
            gc.sweep(|instance_id| {
                  repository.disable(instance_id);
              });
        }
        self.phase = ServerPhase::Cleared;
    }

    pub fn shutdown(&mut self) {
        self.clear();
    }

    /// Guard que ejecuta `clear()` al salir de ámbito.
    pub fn scope(&mut self) -> ActivationScope<'_> {
        ActivationScope { server: self }
    }

    pub fn page_flow_instance(&self) -> Option<&PageFlowInstance> {
        self.active_instance
            .as_deref()
            .and_then(|id| self.repository.find_by_id(id))
    }

    pub fn page_flow_instance_mut(&mut self) -> Option<&mut PageFlowInstance> {
        let id = self.active_instance.as_deref()?;
        self.repository.find_by_id_mut(id)
    }

    pub fn repository(&self) -> &PageFlowInstanceRepository {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut PageFlowInstanceRepository {
        &mut self.repository
    }

    pub fn collector(&self) -> Option<&GarbageCollector> {
        self.collector.as_ref()
    }

    pub fn current_instance_id(&self) -> Option<&str> {
        self.page_flow_instance().map(PageFlowInstance::id)
    }

    pub fn current_flow_id(&self) -> Option<&str> {
        self.page_flow_instance().map(PageFlowInstance::flow_id)
    }

    pub fn current_view(&self) -> Result<&str, ContinuationError> {
        let instance = self.page_flow_instance().ok_or(ContinuationError::NoActiveInstance)?;
        Ok(instance.current_view()?)
    }

    pub fn validate_received_event(&self) -> bool {
        self.page_flow_instance().is_some_and(PageFlowInstance::validate_received_event)
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.page_flow_instance().and_then(|i| i.attribute(name))
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ContinuationError> {
        let instance = self.page_flow_instance_mut().ok_or(ContinuationError::NoActiveInstance)?;
        Ok(instance.set_attribute(name, value)?)
    }

    /// Serializa instancias, índice de exclusividad y marcadores del GC.
    pub fn export_session(&self) -> Result<Vec<u8>, ContinuationError> {
        let markers = self.collector
                          .as_ref()
                          .map(|gc| gc.markers().clone())
                          .unwrap_or_default();
        SessionState::from_parts(self.repository.snapshot(), markers).to_blob()
    }

    pub fn restore_session(&mut self, blob: &[u8]) -> Result<(), ContinuationError> {
        let (snapshot, markers) = SessionState::from_blob(blob)?.into_parts();
        log::debug!("restoring session with {} instance(s)", snapshot.instances.len());
        self.repository.restore(snapshot);
        if let Some(gc) = self.collector.as_mut() {
            gc.restore_markers(markers);
        }
        Ok(())
    }
}

/// Activación en curso; `clear()` corre al soltarla.
#[derive(Debug)]
pub struct ActivationScope<'a> {
    server: &'a mut ContinuationServer,
}

impl Deref for ActivationScope<'_> {
    type Target = ContinuationServer;

    fn deref(&self) -> &Self::Target {
        self.server
    }
}

impl DerefMut for ActivationScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.server
    }
}

impl Drop for ActivationScope<'_> {
    fn drop(&mut self) {
        self.server.clear();
    }
}
