//! Máquina de estados en ejecución de un page-flow.
//!
//! Estados: `initial` (pseudo) -> estados de usuario -> `final` (pseudo).
//! Orden de una transición:
//!
//! guard -> exit(origen) -> acción de la transición -> entry(destino) ->
//! activity(destino) -> `end` si el destino es el último estado.
//!
//! Los eventos devueltos por acciones invoke-and-trigger se encolan y se
//! procesan en orden FIFO dentro de la misma activación.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Attributes;
use crate::action::{ActionBinding, ActionContext, ActionInvoker, ActionOutcome};
use crate::constants::{EVENT_END, EVENT_START, MAX_CHAINED_EVENTS, STATE_FINAL, STATE_INITIAL};
use crate::definition::PageFlowDefinition;
use crate::errors::PageFlowError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFlow {
    definition: Arc<PageFlowDefinition>,
    /// `None` hasta la primera activación.
    current_state: Option<String>,
    previous_state: Option<String>,
    attributes: Attributes,
    last_event_valid: bool,
    #[serde(skip)]
    queue: VecDeque<String>,
    #[serde(skip)]
    payload: Value,
    #[serde(skip)]
    invoker: Option<Arc<dyn ActionInvoker>>,
}

impl PageFlow {
    pub fn new(definition: Arc<PageFlowDefinition>) -> Self {
        Self { definition,
               current_state: None,
               previous_state: None,
               attributes: Attributes::default(),
               last_event_valid: false,
               queue: VecDeque::new(),
               payload: Value::Null,
               invoker: None }
    }

    pub fn definition(&self) -> &Arc<PageFlowDefinition> {
        &self.definition
    }

    pub fn flow_id(&self) -> &str {
        &self.definition.flow_id
    }

    /// Sustituye la definición por otra con el mismo flow ID (p. ej. la
    /// cacheada por el repositorio al restaurar una sesión).
    pub(crate) fn rebind_definition(&mut self, definition: Arc<PageFlowDefinition>) {
        debug_assert_eq!(definition.flow_id, self.definition.flow_id);
        self.definition = definition;
    }

    pub fn set_invoker(&mut self, invoker: Arc<dyn ActionInvoker>) {
        self.invoker = Some(invoker);
    }

    pub fn set_payload(&mut self, payload: Value) {
        self.payload = payload;
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Suelta lo que sólo vive durante la petición (payload e invoker).
    pub fn detach(&mut self) -> Value {
        self.invoker = None;
        std::mem::take(&mut self.payload)
    }

    pub fn is_activated(&self) -> bool {
        self.current_state.is_some()
    }

    /// Punto de entrada de cada activación: arranca la máquina la primera
    /// vez; luego dispara `event` desde el estado actual. Sin evento en una
    /// reanudación no ocurre nada y el evento se considera inválido.
    pub fn activate(&mut self, event: Option<&str>) -> Result<(), PageFlowError> {
        if !self.is_activated() {
            return self.start();
        }
        match event {
            Some(event) => self.trigger_event(event),
            None => {
                self.last_event_valid = false;
                Ok(())
            }
        }
    }

    fn start(&mut self) -> Result<(), PageFlowError> {
        let definition = Arc::clone(&self.definition);
        log::debug!("starting flow '{}' at '{}'", definition.flow_id, definition.first_state);
        self.queue.clear();
        self.current_state = Some(STATE_INITIAL.to_string());
        if let Some(initial) = &definition.initial {
            self.invoke_and_queue(initial, EVENT_START)?;
        }
        self.enter(&definition, &definition.first_state, EVENT_START)?;
        self.last_event_valid = true;
        self.drain_queue(&definition)
    }

    /// Dispara `event` desde el estado actual.
    ///
    /// Si no hay transición para el evento, o su guard la rechaza, el estado
    /// no cambia y `validate_received_event()` pasa a `false`; no es un error.
    pub fn trigger_event(&mut self, event: &str) -> Result<(), PageFlowError> {
        if !self.is_activated() {
            return Err(PageFlowError::NotActivated);
        }
        let definition = Arc::clone(&self.definition);
        self.queue.clear();
        self.last_event_valid = self.fire(&definition, event)?;
        self.drain_queue(&definition)
    }

    fn fire(&mut self, definition: &PageFlowDefinition, event: &str) -> Result<bool, PageFlowError> {
        let current = match self.current_state.as_deref() {
            Some(state) if state != STATE_FINAL && state != STATE_INITIAL => state.to_string(),
            _ => return Ok(false),
        };
        let Some(transition) = definition.transition(&current, event) else {
            log::debug!("flow '{}': no transition for '{event}' from '{current}'", definition.flow_id);
            return Ok(false);
        };

        if let Some(guard) = &transition.guard {
            if !self.invoke(guard, event)?.passes() {
                log::debug!("flow '{}': guard {} rejected '{event}'", definition.flow_id, guard.handler_name());
                return Ok(false);
            }
        }
        if let Some(exit) = definition.state(&current).and_then(|s| s.exit.as_ref()) {
            self.invoke(exit, event)?;
        }
        if let Some(action) = &transition.action {
            self.invoke_and_queue(action, event)?;
        }
        self.enter(definition, &transition.next_state, event)?;
        Ok(true)
    }

    fn enter(&mut self, definition: &PageFlowDefinition, target: &str, event: &str) -> Result<(), PageFlowError> {
        self.previous_state = self.current_state.take();
        self.current_state = Some(target.to_string());
        log::debug!("flow '{}': {} -> {target} on '{event}'",
                    definition.flow_id,
                    self.previous_state.as_deref().unwrap_or(STATE_INITIAL));

        if let Some(state) = definition.state(target) {
            if let Some(entry) = &state.entry {
                self.invoke(entry, event)?;
            }
            if let Some(activity) = &state.activity {
                self.invoke_and_queue(activity, event)?;
            }
        }
        if definition.is_last_state(target) {
            self.fire_end(definition, target)?;
        }
        Ok(())
    }

    fn fire_end(&mut self, definition: &PageFlowDefinition, last: &str) -> Result<(), PageFlowError> {
        if let Some(exit) = definition.state(last).and_then(|s| s.exit.as_ref()) {
            self.invoke(exit, EVENT_END)?;
        }
        self.previous_state = self.current_state.take();
        self.current_state = Some(STATE_FINAL.to_string());
        self.queue.clear();
        if let Some(final_action) = &definition.final_action {
            self.invoke(final_action, EVENT_END)?;
        }
        log::debug!("flow '{}' reached its final state", definition.flow_id);
        Ok(())
    }

    fn drain_queue(&mut self, definition: &PageFlowDefinition) -> Result<(), PageFlowError> {
        let mut processed = 0usize;
        while let Some(event) = self.queue.pop_front() {
            if self.is_in_final_state() {
                self.queue.clear();
                break;
            }
            processed += 1;
            if processed > MAX_CHAINED_EVENTS {
                self.queue.clear();
                return Err(PageFlowError::EventLoop(MAX_CHAINED_EVENTS));
            }
            if !self.fire(definition, &event)? {
                log::debug!("flow '{}': queued event '{event}' did not fire", definition.flow_id);
            }
        }
        Ok(())
    }

    fn invoke(&mut self, binding: &ActionBinding, event: &str) -> Result<ActionOutcome, PageFlowError> {
        let invoker = self.invoker
                          .clone()
                          .ok_or_else(|| PageFlowError::ActionNotFound(binding.handler_name()))?;
        let mut ctx = ActionContext { flow_id: &self.definition.flow_id,
                                      current_state: self.current_state.as_deref().unwrap_or(STATE_INITIAL),
                                      previous_state: self.previous_state.as_deref(),
                                      event,
                                      attributes: &mut self.attributes,
                                      payload: &mut self.payload };
        binding.invoke_action(invoker.as_ref(), &mut ctx)
    }

    fn invoke_and_queue(&mut self, binding: &ActionBinding, event: &str) -> Result<(), PageFlowError> {
        let invoker = self.invoker
                          .clone()
                          .ok_or_else(|| PageFlowError::ActionNotFound(binding.handler_name()))?;
        let mut ctx = ActionContext { flow_id: &self.definition.flow_id,
                                      current_state: self.current_state.as_deref().unwrap_or(STATE_INITIAL),
                                      previous_state: self.previous_state.as_deref(),
                                      event,
                                      attributes: &mut self.attributes,
                                      payload: &mut self.payload };
        let next = binding.invoke_action_and_trigger_event(invoker.as_ref(), &mut ctx, &self.definition)?;
        if let Some(next) = next {
            log::debug!("{} queued event '{next}'", binding.handler_name());
            self.queue.push_back(next);
        }
        Ok(())
    }

    pub fn current_state_name(&self) -> Option<&str> {
        self.current_state.as_deref()
    }

    pub fn previous_state_name(&self) -> Option<&str> {
        self.previous_state.as_deref()
    }

    pub fn is_in_final_state(&self) -> bool {
        self.current_state.as_deref() == Some(STATE_FINAL)
    }

    /// `true` si el último evento recibido (o el arranque) produjo una
    /// transición real. Permite detectar eventos forjados u obsoletos.
    pub fn validate_received_event(&self) -> bool {
        self.last_event_valid
    }

    /// Vista del estado actual o, si el flujo terminó, la del estado previo.
    pub fn current_view(&self) -> Result<&str, PageFlowError> {
        let current = self.current_state.as_deref().ok_or(PageFlowError::NotActivated)?;
        let state = if current == STATE_FINAL {
            self.previous_state.as_deref().unwrap_or(STATE_FINAL)
        } else {
            current
        };
        self.definition
            .view_of(state)
            .ok_or_else(|| PageFlowError::NoView(state.to_string()))
    }

    pub fn attributes(&self) -> Result<&Attributes, PageFlowError> {
        self.ensure_activated()?;
        Ok(&self.attributes)
    }

    pub fn attribute(&self, name: &str) -> Result<Option<&Value>, PageFlowError> {
        self.ensure_activated()?;
        Ok(self.attributes.get(name))
    }

    pub fn attribute_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, PageFlowError> {
        self.ensure_activated()?;
        Ok(self.attributes.get_as(name))
    }

    pub fn has_attribute(&self, name: &str) -> Result<bool, PageFlowError> {
        self.ensure_activated()?;
        Ok(self.attributes.has(name))
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) -> Result<(), PageFlowError> {
        self.ensure_activated()?;
        self.attributes.set(name, value);
        Ok(())
    }

    pub fn remove_attribute(&mut self, name: &str) -> Result<Option<Value>, PageFlowError> {
        self.ensure_activated()?;
        Ok(self.attributes.remove(name))
    }

    pub fn clear_attributes(&mut self) -> Result<(), PageFlowError> {
        self.ensure_activated()?;
        self.attributes.clear();
        Ok(())
    }

    fn ensure_activated(&self) -> Result<(), PageFlowError> {
        if self.is_activated() {
            Ok(())
        } else {
            Err(PageFlowError::NotActivated)
        }
    }
}
