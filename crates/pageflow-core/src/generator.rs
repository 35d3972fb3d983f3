//! Generador de definiciones: `RawFlowDefinition` -> `PageFlowDefinition`.
//!
//! Valida la forma cruda (campos obligatorios, referencias entre estados,
//! nombres reservados) y resuelve cada referencia a acción/guard en un
//! `ActionBinding`. Nunca se construye una instancia a partir de una
//! definición inválida: todo error se reporta antes de devolver la definición.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::json;

use crate::action::ActionBinding;
use crate::constants::{is_reserved_event, is_reserved_state, ENGINE_VERSION};
use crate::definition::{PageFlowDefinition, RawAction, RawFlowDefinition, RawState, StateDefinition, StateKind,
                        Transition};
use crate::errors::PageFlowError;
use crate::hashing::hash_value;

pub struct PageFlowGenerator<'a> {
    flow_id: &'a str,
}

impl<'a> PageFlowGenerator<'a> {
    pub fn new(flow_id: &'a str) -> Self {
        Self { flow_id }
    }

    pub fn generate(&self, raw: &RawFlowDefinition) -> Result<PageFlowDefinition, PageFlowError> {
        if self.flow_id.trim().is_empty() {
            return Err(self.invalid("flow ID must not be empty"));
        }
        if raw.first_state.trim().is_empty() {
            return Err(self.invalid("firstState must not be empty"));
        }

        let mut states: IndexMap<String, StateDefinition> = IndexMap::new();
        for s in &raw.view_state {
            let view = match s.view.as_deref() {
                Some(v) if !v.trim().is_empty() => v.to_string(),
                _ => return Err(self.invalid(&format!("view state '{}' requires a view", s.name))),
            };
            self.add_state(&mut states, s, StateKind::View { view })?;
        }
        for s in &raw.action_state {
            if s.view.is_some() {
                return Err(self.invalid(&format!("action state '{}' must not declare a view", s.name)));
            }
            self.add_state(&mut states, s, StateKind::Action)?;
        }

        let last_state = match &raw.last_state {
            Some(last) => {
                if last.view.trim().is_empty() {
                    return Err(self.invalid(&format!("last state '{}' requires a view", last.name)));
                }
                let as_state = RawState { name: last.name.clone(),
                                          view: Some(last.view.clone()),
                                          transition: Vec::new(),
                                          entry: last.entry.clone(),
                                          exit: last.exit.clone(),
                                          activity: last.activity.clone() };
                self.add_state(&mut states, &as_state, StateKind::View { view: last.view.clone() })?;
                Some(last.name.clone())
            }
            None => None,
        };

        if !states.contains_key(&raw.first_state) {
            return Err(self.invalid(&format!("firstState '{}' is not a declared state", raw.first_state)));
        }
        for state in states.values() {
            for t in &state.transitions {
                if !states.contains_key(&t.next_state) {
                    return Err(self.invalid(&format!("transition '{}' from '{}' targets undeclared state '{}'",
                                                     t.event, state.name, t.next_state)));
                }
            }
        }

        let initial = self.binding(raw.initial.as_ref(), "initial")?;
        let final_action = self.binding(raw.final_action.as_ref(), "final")?;

        let definition = PageFlowDefinition { flow_id: self.flow_id.to_string(),
                                              first_state: raw.first_state.clone(),
                                              last_state,
                                              states,
                                              initial,
                                              final_action,
                                              definition_hash: self.definition_hash(raw)? };
        log::debug!("generated flow '{}' ({} states, hash {})",
                    definition.flow_id,
                    definition.len(),
                    definition.definition_hash);
        Ok(definition)
    }

    fn add_state(&self,
                 states: &mut IndexMap<String, StateDefinition>,
                 raw: &RawState,
                 kind: StateKind)
                 -> Result<(), PageFlowError> {
        let name = raw.name.trim();
        if name.is_empty() {
            return Err(self.invalid("state name must not be empty"));
        }
        if is_reserved_state(name) {
            return Err(PageFlowError::ReservedState { flow_id: self.flow_id.to_string(),
                                                      state: name.to_string() });
        }
        if states.contains_key(name) {
            return Err(self.invalid(&format!("state '{name}' is declared more than once")));
        }

        let mut seen_events: HashSet<&str> = HashSet::new();
        let mut transitions = Vec::with_capacity(raw.transition.len());
        for t in &raw.transition {
            let event = t.event.trim();
            if event.is_empty() {
                return Err(self.invalid(&format!("a transition of state '{name}' has no event")));
            }
            if is_reserved_event(event) {
                return Err(PageFlowError::ReservedEvent { flow_id: self.flow_id.to_string(),
                                                          event: event.to_string() });
            }
            if !seen_events.insert(event) {
                return Err(self.invalid(&format!("state '{name}' declares event '{event}' more than once")));
            }
            let next_state = t.next_state.trim();
            if next_state.is_empty() {
                return Err(self.invalid(&format!("transition '{event}' of state '{name}' has no nextState")));
            }
            if is_reserved_state(next_state) {
                return Err(PageFlowError::ReservedState { flow_id: self.flow_id.to_string(),
                                                          state: next_state.to_string() });
            }
            transitions.push(Transition { event: event.to_string(),
                                          next_state: next_state.to_string(),
                                          action: self.binding(t.action.as_ref(), "action")?,
                                          guard: self.binding(t.guard.as_ref(), "guard")? });
        }

        states.insert(name.to_string(),
                      StateDefinition { name: name.to_string(),
                                        kind,
                                        transitions,
                                        entry: self.binding(raw.entry.as_ref(), "entry")?,
                                        exit: self.binding(raw.exit.as_ref(), "exit")?,
                                        activity: self.binding(raw.activity.as_ref(), "activity")? });
        Ok(())
    }

    fn binding(&self, raw: Option<&RawAction>, role: &str) -> Result<Option<ActionBinding>, PageFlowError> {
        match raw {
            None => Ok(None),
            Some(a) if a.method.trim().is_empty() => Err(self.invalid(&format!("{role} action requires a method"))),
            Some(a) => Ok(Some(ActionBinding::resolve(self.flow_id, a))),
        }
    }

    fn definition_hash(&self, raw: &RawFlowDefinition) -> Result<String, PageFlowError> {
        let raw_json = serde_json::to_value(raw).map_err(|e| self.invalid(&e.to_string()))?;
        Ok(hash_value(&json!({
            "engine_version": ENGINE_VERSION,
            "flow_id": self.flow_id,
            "definition": raw_json,
        })))
    }

    fn invalid(&self, reason: &str) -> PageFlowError {
        PageFlowError::InvalidDefinition { flow_id: self.flow_id.to_string(),
                                           reason: reason.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_yaml() -> &'static str {
        r#"
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
          method: increaseCounter
        guard:
          class: Guards
          method: belowLimit
      - event: finish
        nextState: Finish
"#
    }

    fn generate(yaml: &str) -> Result<PageFlowDefinition, PageFlowError> {
        let raw = RawFlowDefinition::from_yaml("Counter", yaml)?;
        PageFlowGenerator::new("Counter").generate(&raw)
    }

    #[test]
    fn generates_states_transitions_and_bindings() {
        let def = generate(counter_yaml()).unwrap();
        assert_eq!(def.first_state, "Counting");
        assert_eq!(def.last_state.as_deref(), Some("Finish"));
        assert_eq!(def.view_of("Counting"), Some("Counter"));
        let t = def.transition("Counting", "increase").unwrap();
        assert_eq!(t.action.as_ref().unwrap().handler_name(), "CounterAction::increaseCounter");
        assert_eq!(t.guard.as_ref().unwrap().handler_name(), "Guards::belowLimit");
        assert!(def.has_event("finish"));
        assert!(!def.has_event("end"));
        assert!(!def.has_event("bogus"));
        assert_eq!(def.events(), vec!["increase", "finish"]);
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let a = generate(counter_yaml()).unwrap();
        let b = generate(counter_yaml()).unwrap();
        assert_eq!(a.definition_hash, b.definition_hash);
        let c = generate(&counter_yaml().replace("view: Counter", "view: Counter2")).unwrap();
        assert_ne!(a.definition_hash, c.definition_hash);
    }

    #[test]
    fn rejects_reserved_state_names() {
        let yaml = "firstState: initial\nviewState:\n  - name: initial\n    view: x\n";
        assert!(matches!(generate(yaml), Err(PageFlowError::ReservedState { ref state, .. }) if state == "initial"));

        let yaml = "firstState: A\nviewState:\n  - name: A\n    view: a\n    transition:\n      - event: go\n        nextState: final\n";
        assert!(matches!(generate(yaml), Err(PageFlowError::ReservedState { ref state, .. }) if state == "final"));
    }

    #[test]
    fn rejects_reserved_event_names() {
        for event in ["entry", "exit", "start", "do", "end"] {
            let yaml = format!("firstState: A\nviewState:\n  - name: A\n    view: a\n    transition:\n      - event: {event}\n        nextState: A\n");
            assert!(matches!(generate(&yaml), Err(PageFlowError::ReservedEvent { event: ref e, .. }) if e == event),
                    "event {event} should be rejected");
        }
    }

    #[test]
    fn rejects_structural_mistakes() {
        let cases = [
            // firstState vacío
            "firstState: ''\nviewState:\n  - name: A\n    view: a\n",
            // firstState no declarado
            "firstState: B\nviewState:\n  - name: A\n    view: a\n",
            // estado de vista sin vista
            "firstState: A\nviewState:\n  - name: A\n",
            // estado de acción con vista
            "firstState: A\nactionState:\n  - name: A\n    view: a\n",
            // destino inexistente
            "firstState: A\nviewState:\n  - name: A\n    view: a\n    transition:\n      - event: go\n        nextState: Z\n",
            // evento duplicado
            "firstState: A\nviewState:\n  - name: A\n    view: a\n    transition:\n      - event: go\n        nextState: A\n      - event: go\n        nextState: A\n",
            // estado duplicado
            "firstState: A\nviewState:\n  - name: A\n    view: a\nactionState:\n  - name: A\n",
            // método vacío
            "firstState: A\nviewState:\n  - name: A\n    view: a\n    entry:\n      method: ''\n",
        ];
        for yaml in cases {
            assert!(matches!(generate(yaml), Err(PageFlowError::InvalidDefinition { .. })),
                    "should reject:\n{yaml}");
        }
    }
}
