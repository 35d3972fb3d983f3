//! Forma declarativa "cruda" de un flujo tal como llega de YAML/JSON.
//!
//! Es la única estructura que el generador lee. No se valida aquí: parsear y
//! validar son pasos separados (`PageFlowGenerator::generate` valida).
//!
//! ```yaml
//! firstState: Counting
//! lastState:
//!   name: Finish
//!   view: Finish
//! viewState:
//!   - name: Counting
//!     view: Counter
//!     entry: { method: setupCounter }
//!     transition:
//!       - event: increase
//!         nextState: Counting
//!         action: { method: increaseCounter }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::PageFlowError;

/// Referencia a un método de acción: `class` opcional + `method`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransition {
    pub event: String,
    pub next_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<RawAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<RawAction>,
}

/// Estado de vista (`view` obligatorio) o de acción (`view` ausente).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawState {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transition: Vec<RawTransition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<RawAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<RawAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<RawAction>,
}

/// Último estado: un estado de vista sin transiciones propias; el motor le
/// cablea la transición `end` hacia `final`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLastState {
    pub name: String,
    pub view: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<RawAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<RawAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<RawAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFlowDefinition {
    pub first_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_state: Option<RawLastState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub view_state: Vec<RawState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub action_state: Vec<RawState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<RawAction>,
    #[serde(rename = "final", default, skip_serializing_if = "Option::is_none")]
    pub final_action: Option<RawAction>,
}

impl RawFlowDefinition {
    pub fn from_yaml(flow_id: &str, source: &str) -> Result<Self, PageFlowError> {
        serde_yaml::from_str(source).map_err(|e| PageFlowError::DefinitionSource { flow_id: flow_id.to_string(),
                                                                                  reason: e.to_string() })
    }

    pub fn from_json(flow_id: &str, source: &str) -> Result<Self, PageFlowError> {
        serde_json::from_str(source).map_err(|e| PageFlowError::DefinitionSource { flow_id: flow_id.to_string(),
                                                                                  reason: e.to_string() })
    }

    /// Lee un archivo `.yaml`/`.yml`/`.json`; el formato se decide por la
    /// extensión (YAML por defecto, ya que YAML es superconjunto de JSON).
    pub fn from_path(flow_id: &str, path: &Path) -> Result<Self, PageFlowError> {
        let source = std::fs::read_to_string(path).map_err(|e| PageFlowError::DefinitionSource {
                                                      flow_id: flow_id.to_string(),
                                                      reason: format!("{}: {e}", path.display()),
                                                  })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(flow_id, &source),
            _ => Self::from_yaml(flow_id, &source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml_with_reserved_keyword_field() {
        let yaml = r#"
firstState: Counting
lastState:
  name: Finish
  view: Finish
viewState:
  - name: Counting
    view: Counter
    entry:
      method: setupCounter
    transition:
      - event: increase
        nextState: Counting
        action:
          class: CounterAction
          method: increaseCounter
      - event: finish
        nextState: Finish
final:
  method: cleanup
"#;
        let raw = RawFlowDefinition::from_yaml("Counter", yaml).unwrap();
        assert_eq!(raw.first_state, "Counting");
        assert_eq!(raw.view_state.len(), 1);
        assert_eq!(raw.view_state[0].transition.len(), 2);
        assert_eq!(raw.view_state[0].transition[0].action.as_ref().unwrap().class.as_deref(),
                   Some("CounterAction"));
        assert_eq!(raw.final_action.unwrap().method, "cleanup");
        assert!(raw.action_state.is_empty());
    }

    #[test]
    fn parses_json() {
        let json = r#"{"firstState":"A","viewState":[{"name":"A","view":"a"}]}"#;
        let raw = RawFlowDefinition::from_json("F", json).unwrap();
        assert_eq!(raw.view_state[0].view.as_deref(), Some("a"));
        assert!(raw.last_state.is_none());
    }

    #[test]
    fn malformed_source_is_reported_with_flow_id() {
        let err = RawFlowDefinition::from_yaml("Broken", "viewState: [").unwrap_err();
        assert!(matches!(err, PageFlowError::DefinitionSource { ref flow_id, .. } if flow_id == "Broken"));
    }
}
