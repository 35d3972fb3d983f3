//! Una activación completa desde el host: catálogo -> sesión -> activar ->
//! limpiar -> guardar sesión.

use std::sync::Arc;

use pageflow_adapters::default_registry;
use pageflow_core::{Attributes, ContinuationServer, StaticContext};
use serde::Serialize;
use serde_json::Value;

use crate::catalog::FlowCatalog;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::session::FileSessionStore;

#[derive(Debug, Clone, Default)]
pub struct ActivationRequest {
    pub flow_id: String,
    pub ticket: Option<String>,
    pub event: Option<String>,
    pub payload: Value,
}

/// Estado observable de la instancia al terminar la activación (antes de
/// `clear()`, que puede retirarla si terminó).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivationReport {
    pub ticket: String,
    pub flow_id: String,
    pub state: Option<String>,
    pub view: Option<String>,
    pub event_valid: bool,
    pub finished: bool,
    pub attributes: Attributes,
}

impl ActivationReport {
    fn capture(server: &ContinuationServer, ticket: String) -> Self {
        let instance = server.page_flow_instance();
        Self { flow_id: server.current_flow_id().unwrap_or_default().to_string(),
               state: instance.and_then(|i| i.current_state_name()).map(str::to_string),
               view: server.current_view().ok().map(str::to_string),
               event_valid: server.validate_received_event(),
               finished: instance.is_some_and(|i| i.is_in_final_state()),
               attributes: instance.and_then(|i| i.page_flow())
                                   .and_then(|f| f.attributes().ok())
                                   .cloned()
                                   .unwrap_or_default(),
               ticket }
    }
}

pub fn run_activation(config: &AppConfig, request: &ActivationRequest) -> Result<ActivationReport, AppError> {
    let catalog = FlowCatalog::scan(&config.flow_dir)?;
    let mut server = ContinuationServer::new(Arc::new(default_registry()), config.server_config());
    catalog.register(&mut server, |flow_id| config.is_exclusive(flow_id))?;

    let store = FileSessionStore::new(&config.session_file);
    if store.restore_into(&mut server)? {
        log::debug!("session restored from {}", store.path().display());
    }

    let mut context = StaticContext::new(request.flow_id.as_str());
    if let Some(ticket) = &request.ticket {
        context = context.with_instance(ticket.as_str());
    }
    if let Some(event) = &request.event {
        context = context.with_event(event.as_str());
    }
    server.set_context_provider(context);

    let mut scope = server.scope();
    let outcome = scope.activate(request.payload.clone())
                       .map(|ticket| ActivationReport::capture(&scope, ticket));
    // Soltar el scope limpia; el guardado corre también si la activación falló.
    drop(scope);
    store.save_from(&server)?;
    Ok(outcome?)
}
