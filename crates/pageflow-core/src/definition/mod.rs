//! Definiciones de page-flows: forma cruda (entrada declarativa) y grafo
//! inmutable generado a partir de ella.

pub mod raw;
pub mod types;

pub use raw::{RawAction, RawFlowDefinition, RawLastState, RawState, RawTransition};
pub use types::{PageFlowDefinition, StateDefinition, StateKind, Transition};
