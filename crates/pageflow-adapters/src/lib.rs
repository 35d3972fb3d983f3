//! pageflow-adapters: handlers de acciones listos para usar.
//!
//! - `CounterAction`: contador de ejemplo (flujos `Counter` y `SecondCounter`).
//! - `RegistrationAction`: alta de usuario en tres pasos con validación.
//!
//! `default_registry()` los registra todos bajo sus nombres de clase.

pub mod counter;
pub mod registration;

use pageflow_core::ActionRegistry;

pub use counter::{CounterAction, COUNTER_CLASS};
pub use registration::{registration_actions, Registration, REGISTRATION_CLASS};

pub fn default_registry() -> ActionRegistry {
    ActionRegistry::new().register(COUNTER_CLASS, CounterAction)
                         .register(REGISTRATION_CLASS, registration_actions())
}
