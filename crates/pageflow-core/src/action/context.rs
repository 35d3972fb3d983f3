use serde_json::Value;

use crate::flow::Attributes;

/// Vista del flujo entregada a un handler durante una invocación.
///
/// Los nombres de estado son de sólo lectura; el handler puede escribir en
/// los atributos de la instancia y en el payload de la petición.
pub struct ActionContext<'a> {
    pub flow_id: &'a str,
    pub current_state: &'a str,
    pub previous_state: Option<&'a str>,
    /// Evento que provocó la invocación (`start`, `end`, o un evento de usuario).
    pub event: &'a str,
    pub attributes: &'a mut Attributes,
    pub payload: &'a mut Value,
}

/// Resultado de un handler.
///
/// - `Done`: sin resultado.
/// - `Event`: evento a encolar (sólo lo atienden los bindings
///   invoke-and-trigger: acciones de transición, activity, initial).
/// - `Guard`: veredicto de un guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Done,
    Event(String),
    Guard(bool),
}

impl ActionOutcome {
    /// Interpretación como guard: sólo `Guard(true)` o un evento dejan pasar.
    pub fn passes(&self) -> bool {
        match self {
            ActionOutcome::Done => false,
            ActionOutcome::Event(_) => true,
            ActionOutcome::Guard(ok) => *ok,
        }
    }

    pub fn event(&self) -> Option<&str> {
        match self {
            ActionOutcome::Event(e) => Some(e.as_str()),
            _ => None,
        }
    }
}

impl From<()> for ActionOutcome {
    fn from(_: ()) -> Self {
        ActionOutcome::Done
    }
}

impl From<bool> for ActionOutcome {
    fn from(ok: bool) -> Self {
        ActionOutcome::Guard(ok)
    }
}

impl From<&str> for ActionOutcome {
    fn from(event: &str) -> Self {
        ActionOutcome::Event(event.to_string())
    }
}

impl From<String> for ActionOutcome {
    fn from(event: String) -> Self {
        ActionOutcome::Event(event)
    }
}

impl From<Option<String>> for ActionOutcome {
    fn from(event: Option<String>) -> Self {
        event.map_or(ActionOutcome::Done, ActionOutcome::Event)
    }
}
