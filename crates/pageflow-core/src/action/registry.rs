use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{ActionContext, ActionOutcome};
use crate::errors::{ActionError, PageFlowError};

/// Punto de entrada del motor hacia el código de la aplicación.
pub trait ActionInvoker: Send + Sync + fmt::Debug {
    fn invoke(&self, class: &str, method: &str, ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, PageFlowError>;
}

/// Handler de una "clase" de acciones: despacha por nombre de método.
pub trait ActionHandler: Send + Sync {
    fn invoke(&self, method: &str, ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError>;
}

pub type ActionFn = Box<dyn Fn(&mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> + Send + Sync>;

/// Handler basado en una tabla `método -> closure`.
#[derive(Default)]
pub struct MethodTable {
    methods: HashMap<String, ActionFn>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un método. El closure puede devolver cualquier cosa
    /// convertible en `ActionOutcome` (`()`, `bool`, `&str`, `Option<String>`).
    pub fn method<F, O>(mut self, name: &str, f: F) -> Self
        where F: Fn(&mut ActionContext<'_>) -> Result<O, ActionError> + Send + Sync + 'static,
              O: Into<ActionOutcome>
    {
        self.methods.insert(name.to_string(), Box::new(move |ctx| f(ctx).map(Into::into)));
        self
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

impl ActionHandler for MethodTable {
    fn invoke(&self, method: &str, ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, ActionError> {
        let f = self.methods
                    .get(method)
                    .ok_or_else(|| ActionError::UnknownMethod(method.to_string()))?;
        f(ctx)
    }
}

/// Registro de handlers por nombre de clase.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(mut self, class: &str, handler: H) -> Self
        where H: ActionHandler + 'static
    {
        self.insert(class, handler);
        self
    }

    pub fn insert<H>(&mut self, class: &str, handler: H)
        where H: ActionHandler + 'static
    {
        self.handlers.insert(class.to_string(), Arc::new(handler));
    }

    pub fn has_handler(&self, class: &str) -> bool {
        self.handlers.contains_key(class)
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<&String> = self.handlers.keys().collect();
        classes.sort();
        f.debug_struct("ActionRegistry").field("classes", &classes).finish()
    }
}

impl ActionInvoker for ActionRegistry {
    fn invoke(&self, class: &str, method: &str, ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, PageFlowError> {
        let handler_name = format!("{class}::{method}");
        let handler = self.handlers
                          .get(class)
                          .ok_or_else(|| PageFlowError::ActionNotFound(handler_name.clone()))?;
        handler.invoke(method, ctx).map_err(|e| match e {
                                       ActionError::UnknownMethod(_) => PageFlowError::ActionNotFound(handler_name),
                                       ActionError::Failed(message) => PageFlowError::ActionFailed { handler: handler_name,
                                                                                                     message },
                                   })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::Attributes;
    use serde_json::{json, Value};

    fn call(registry: &ActionRegistry, class: &str, method: &str) -> Result<ActionOutcome, PageFlowError> {
        let mut attributes = Attributes::default();
        let mut payload = Value::Null;
        let mut ctx = ActionContext { flow_id: "F",
                                      current_state: "A",
                                      previous_state: None,
                                      event: "go",
                                      attributes: &mut attributes,
                                      payload: &mut payload };
        registry.invoke(class, method, &mut ctx)
    }

    #[test]
    fn dispatches_by_class_and_method() {
        let registry = ActionRegistry::new().register("FAction",
                                                      MethodTable::new().method("next", |_ctx| Ok("go"))
                                                                        .method("check", |ctx| {
                                                                            ctx.attributes.set("checked", json!(true));
                                                                            Ok(true)
                                                                        }));
        assert_eq!(call(&registry, "FAction", "next").unwrap(), ActionOutcome::Event("go".into()));
        assert_eq!(call(&registry, "FAction", "check").unwrap(), ActionOutcome::Guard(true));
    }

    #[test]
    fn unknown_class_or_method_is_action_not_found() {
        let registry = ActionRegistry::new().register("FAction", MethodTable::new());
        assert_eq!(call(&registry, "Other", "x").unwrap_err(),
                   PageFlowError::ActionNotFound("Other::x".into()));
        assert_eq!(call(&registry, "FAction", "x").unwrap_err(),
                   PageFlowError::ActionNotFound("FAction::x".into()));
    }

    #[test]
    fn handler_failure_names_the_handler() {
        let registry =
            ActionRegistry::new().register("FAction",
                                           MethodTable::new().method("boom", |_ctx| -> Result<(), ActionError> {
                                                                 Err(ActionError::failed("kaput"))
                                                             }));
        assert_eq!(call(&registry, "FAction", "boom").unwrap_err(),
                   PageFlowError::ActionFailed { handler: "FAction::boom".into(),
                                                 message: "kaput".into() });
    }
}
