//! pageflow-core: motor de page-flows basado en continuaciones.
pub mod action;
pub mod clock;
pub mod constants;
pub mod continuation;
pub mod definition;
pub mod errors;
pub mod flow;
pub mod gc;
pub mod generator;
pub mod hashing;
pub mod instance;
pub mod repository;
pub mod ticket;

pub use action::{ActionBinding, ActionContext, ActionHandler, ActionInvoker, ActionOutcome, ActionRegistry, MethodTable};
pub use clock::{Clock, ManualClock, SystemClock};
pub use continuation::{ActivationScope, ContinuationContextProvider, ContinuationServer, ServerConfig, ServerPhase,
                       SessionState, StaticContext};
pub use definition::{PageFlowDefinition, RawFlowDefinition, StateDefinition, StateKind, Transition};
pub use errors::{ActionError, ContinuationError, PageFlowError};
pub use flow::{Attributes, PageFlow};
pub use gc::{GarbageCollector, GcMarker, GcMarkers};
pub use generator::PageFlowGenerator;
pub use instance::{InstanceState, PageFlowInstance};
pub use repository::{FlowSource, PageFlowInstanceRepository, RepositorySnapshot};
pub use ticket::generate_ticket;
