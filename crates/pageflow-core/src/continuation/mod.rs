mod context;
mod server;
mod session;

pub use context::{ContinuationContextProvider, StaticContext};
pub use server::{ActivationScope, ContinuationServer, ServerConfig, ServerPhase};
pub use session::SessionState;
