//! `PageFlowInstance`: una ejecución direccionable (por ticket) de un flujo.
//!
//! La instancia conserva su identidad (ID + flow ID) durante toda su vida.
//! Su comportamiento es una variante etiquetada: `Active` con la máquina de
//! estados, o `Disabled` cuando el recolector la dio por expirada. Una
//! instancia deshabilitada sigue siendo consultable pero responde como
//! inactiva: sin atributos, sin vista, nunca en estado final.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::ActionInvoker;
use crate::errors::PageFlowError;
use crate::flow::PageFlow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InstanceState {
    Active(Box<PageFlow>),
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFlowInstance {
    id: String,
    flow_id: String,
    state: InstanceState,
}

impl PageFlowInstance {
    pub fn new(id: String, flow: PageFlow) -> Self {
        Self { id,
               flow_id: flow.flow_id().to_string(),
               state: InstanceState::Active(Box::new(flow)) }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub fn state(&self) -> &InstanceState {
        &self.state
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.state, InstanceState::Disabled)
    }

    pub fn page_flow(&self) -> Option<&PageFlow> {
        match &self.state {
            InstanceState::Active(flow) => Some(flow.as_ref()),
            InstanceState::Disabled => None,
        }
    }

    pub fn page_flow_mut(&mut self) -> Option<&mut PageFlow> {
        match &mut self.state {
            InstanceState::Active(flow) => Some(flow.as_mut()),
            InstanceState::Disabled => None,
        }
    }

    /// Revoca el comportamiento de la instancia conservando su identidad.
    pub fn disable(&mut self) {
        self.state = InstanceState::Disabled;
    }

    /// Conecta invoker y payload de la petición y activa la máquina.
    pub fn activate(&mut self,
                    invoker: Arc<dyn ActionInvoker>,
                    payload: Value,
                    event: Option<&str>)
                    -> Result<(), PageFlowError> {
        let flow = self.page_flow_mut().ok_or(PageFlowError::NotActivated)?;
        flow.set_invoker(invoker);
        flow.set_payload(payload);
        flow.activate(event)
    }

    /// Suelta el payload y el invoker al final de la petición.
    pub fn detach(&mut self) -> Value {
        self.page_flow_mut().map(PageFlow::detach).unwrap_or_default()
    }

    pub fn is_activated(&self) -> bool {
        self.page_flow().is_some_and(PageFlow::is_activated)
    }

    pub fn is_in_final_state(&self) -> bool {
        self.page_flow().is_some_and(PageFlow::is_in_final_state)
    }

    pub fn validate_received_event(&self) -> bool {
        self.page_flow().is_some_and(PageFlow::validate_received_event)
    }

    pub fn current_state_name(&self) -> Option<&str> {
        self.page_flow().and_then(PageFlow::current_state_name)
    }

    pub fn previous_state_name(&self) -> Option<&str> {
        self.page_flow().and_then(PageFlow::previous_state_name)
    }

    pub fn current_view(&self) -> Result<&str, PageFlowError> {
        self.page_flow().ok_or(PageFlowError::NotActivated)?.current_view()
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.page_flow().and_then(|f| f.attribute(name).ok().flatten())
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) -> Result<(), PageFlowError> {
        self.page_flow_mut().ok_or(PageFlowError::NotActivated)?.set_attribute(name, value)
    }

    pub fn definition_hash(&self) -> Option<&str> {
        self.page_flow().map(|f| f.definition().definition_hash.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionRegistry;
    use crate::definition::RawFlowDefinition;
    use crate::generator::PageFlowGenerator;
    use serde_json::json;

    fn instance() -> PageFlowInstance {
        let raw = RawFlowDefinition::from_yaml("Simple", "firstState: A\nviewState:\n  - name: A\n    view: a\n").unwrap();
        let def = PageFlowGenerator::new("Simple").generate(&raw).unwrap();
        PageFlowInstance::new("ticket".into(), PageFlow::new(Arc::new(def)))
    }

    #[test]
    fn disabled_instance_answers_as_inactive() {
        let mut inst = instance();
        inst.activate(Arc::new(ActionRegistry::new()), json!({"p": 1}), None).unwrap();
        inst.set_attribute("k", "v").unwrap();
        assert_eq!(inst.attribute("k"), Some(&json!("v")));
        assert!(inst.validate_received_event());

        inst.disable();
        assert!(inst.is_disabled());
        assert_eq!(inst.id(), "ticket");
        assert_eq!(inst.flow_id(), "Simple");
        assert!(!inst.is_activated());
        assert!(!inst.is_in_final_state());
        assert!(!inst.validate_received_event());
        assert_eq!(inst.attribute("k"), None);
        assert_eq!(inst.current_view(), Err(PageFlowError::NotActivated));
        assert_eq!(inst.activate(Arc::new(ActionRegistry::new()), Value::Null, Some("x")),
                   Err(PageFlowError::NotActivated));
    }

    #[test]
    fn detach_returns_the_request_payload() {
        let mut inst = instance();
        inst.activate(Arc::new(ActionRegistry::new()), json!({"p": 1}), None).unwrap();
        assert_eq!(inst.detach(), json!({"p": 1}));
        assert_eq!(inst.page_flow().unwrap().payload(), &Value::Null);
    }
}
