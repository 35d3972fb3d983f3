//! Despacho de acciones.
//!
//! Una acción se identifica por `class` + `method`. El motor no conoce los
//! handlers: recibe un `ActionInvoker` (normalmente un `ActionRegistry`) y le
//! delega cada invocación con un `ActionContext` que expone el flujo en curso,
//! el evento que disparó la invocación y el payload de la petición.

mod binding;
mod context;
mod registry;

pub use binding::{default_action_class, ActionBinding};
pub use context::{ActionContext, ActionOutcome};
pub use registry::{ActionFn, ActionHandler, ActionInvoker, ActionRegistry, MethodTable};
