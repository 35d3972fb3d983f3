use serde::{Deserialize, Serialize};

use super::{ActionContext, ActionInvoker, ActionOutcome};
use crate::constants::DEFAULT_ACTION_CLASS_SUFFIX;
use crate::definition::{PageFlowDefinition, RawAction};
use crate::errors::PageFlowError;

/// Referencia resuelta a una acción, tal como la guarda la definición.
///
/// La clase se fija al generar la definición: la explícita si el autor la
/// dio, o `<FlowID>Action` en su defecto. El handler concreto se busca en el
/// `ActionInvoker` recién al invocar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBinding {
    pub class: String,
    pub method: String,
}

impl ActionBinding {
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self { class: class.into(),
               method: method.into() }
    }

    pub fn resolve(flow_id: &str, raw: &RawAction) -> Self {
        let class = match raw.class.as_deref() {
            Some(class) if !class.trim().is_empty() => class.to_string(),
            _ => default_action_class(flow_id),
        };
        Self::new(class, raw.method.clone())
    }

    /// `Clase::método`, usado en mensajes de error y logs.
    pub fn handler_name(&self) -> String {
        format!("{}::{}", self.class, self.method)
    }

    /// Invocación simple (entry, exit, guard, final): devuelve el resultado
    /// tal cual, sin encolar nada.
    pub fn invoke_action(&self,
                         invoker: &dyn ActionInvoker,
                         ctx: &mut ActionContext<'_>)
                         -> Result<ActionOutcome, PageFlowError> {
        log::debug!("invoking {} on event '{}'", self.handler_name(), ctx.event);
        invoker.invoke(&self.class, &self.method, ctx)
    }

    /// Invocación que puede disparar un evento de seguimiento (acciones de
    /// transición, activity, initial). El evento devuelto debe existir en la
    /// definición; el llamador lo encola para la misma activación.
    pub fn invoke_action_and_trigger_event(&self,
                                           invoker: &dyn ActionInvoker,
                                           ctx: &mut ActionContext<'_>,
                                           definition: &PageFlowDefinition)
                                           -> Result<Option<String>, PageFlowError> {
        match self.invoke_action(invoker, ctx)? {
            ActionOutcome::Event(event) if definition.has_event(&event) => Ok(Some(event)),
            ActionOutcome::Event(event) => Err(PageFlowError::UnexpectedEvent { handler: self.handler_name(),
                                                                                event }),
            ActionOutcome::Done | ActionOutcome::Guard(_) => Ok(None),
        }
    }
}

pub fn default_action_class(flow_id: &str) -> String {
    format!("{flow_id}{DEFAULT_ACTION_CLASS_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_defaults_to_flow_action() {
        let raw = RawAction { class: None,
                              method: "setup".into() };
        assert_eq!(ActionBinding::resolve("Counter", &raw), ActionBinding::new("CounterAction", "setup"));

        let raw = RawAction { class: Some("Shared".into()),
                              method: "setup".into() };
        assert_eq!(ActionBinding::resolve("Counter", &raw).handler_name(), "Shared::setup");
    }
}
