//! PageFlow Rust
//!
//! Host de los page-flows:
//! - `config`: configuración desde entorno (.env).
//! - `catalog`: flujos en disco registrados como descriptores perezosos.
//! - `session`: blob de sesión persistido en archivo.
//! - `runner`: una activación completa, usada por el binario `main-core`.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod runner;
pub mod session;

pub use catalog::{CatalogEntry, FlowCatalog};
pub use config::AppConfig;
pub use errors::AppError;
pub use runner::{run_activation, ActivationReport, ActivationRequest};
pub use session::FileSessionStore;
