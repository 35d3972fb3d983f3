//! Definición inmutable de un page-flow (grafo de estados ya validado).
//!
//! Una `PageFlowDefinition` se construye una sola vez por flow ID con
//! `PageFlowGenerator` y se comparte (vía `Arc`) entre todas las instancias
//! del flujo. Sólo contiene datos: las acciones son `ActionBinding`s que se
//! resuelven por nombre en el momento de invocarlas, por lo que la
//! definición es serializable junto con las instancias que la usan.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::action::ActionBinding;
use crate::constants::STATE_FINAL;

/// Tipo de estado: de vista (tiene identificador de vista) o de acción.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateKind {
    View { view: String },
    Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub event: String,
    pub next_state: String,
    pub action: Option<ActionBinding>,
    pub guard: Option<ActionBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDefinition {
    pub name: String,
    pub kind: StateKind,
    pub transitions: Vec<Transition>,
    pub entry: Option<ActionBinding>,
    pub exit: Option<ActionBinding>,
    pub activity: Option<ActionBinding>,
}

impl StateDefinition {
    pub fn view(&self) -> Option<&str> {
        match &self.kind {
            StateKind::View { view } => Some(view.as_str()),
            StateKind::Action => None,
        }
    }

    pub fn transition(&self, event: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.event == event)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFlowDefinition {
    pub flow_id: String,
    pub first_state: String,
    pub last_state: Option<String>,
    /// Estados de usuario en orden de declaración.
    pub states: IndexMap<String, StateDefinition>,
    pub initial: Option<ActionBinding>,
    pub final_action: Option<ActionBinding>,
    /// Hash blake3 de la forma canónica de la definición cruda.
    pub definition_hash: String,
}

impl PageFlowDefinition {
    pub fn state(&self, name: &str) -> Option<&StateDefinition> {
        self.states.get(name)
    }

    /// Transición saliente de `state` para `event`, si existe.
    pub fn transition(&self, state: &str, event: &str) -> Option<&Transition> {
        self.state(state).and_then(|s| s.transition(event))
    }

    pub fn is_last_state(&self, state: &str) -> bool {
        self.last_state.as_deref() == Some(state)
    }

    /// Un evento es conocido si alguna transición de usuario lo usa. El `end`
    /// implícito lo dispara el motor y no cuenta.
    pub fn has_event(&self, event: &str) -> bool {
        self.states.values().any(|s| s.transition(event).is_some())
    }

    /// Todos los eventos de usuario, sin duplicados, en orden de declaración.
    pub fn events(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for t in self.states.values().flat_map(|s| s.transitions.iter()) {
            if !out.contains(&t.event.as_str()) {
                out.push(&t.event);
            }
        }
        out
    }

    /// Vista del estado `name`; `None` para estados de acción, pseudo estados
    /// o nombres desconocidos.
    pub fn view_of(&self, name: &str) -> Option<&str> {
        if name == STATE_FINAL {
            return None;
        }
        self.state(name).and_then(StateDefinition::view)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
