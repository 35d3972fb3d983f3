use std::path::PathBuf;
use std::sync::Arc;

use pageflow_adapters::{default_registry, Registration};
use pageflow_core::{ContinuationServer, FlowSource, ServerConfig, StaticContext};
use serde_json::{json, Value};

fn server() -> ContinuationServer {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "..", "..", "flows", "Registration.yaml"].iter()
                                                                                              .collect();
    let mut server = ContinuationServer::new(Arc::new(default_registry()), ServerConfig::new());
    server.add_page_flow("Registration", FlowSource::File(path), false)
          .expect("register flow");
    server
}

fn step(server: &mut ContinuationServer, ticket: &str, event: &str, payload: Value) -> String {
    server.set_context_provider(StaticContext::new("Registration").with_instance(ticket)
                                                                   .with_event(event));
    let id = server.activate(payload).expect("activation");
    let view = server.current_view().expect("view").to_string();
    server.clear();
    assert_eq!(id, ticket);
    view
}

#[test]
fn registration_happy_path() {
    let mut server = server();
    server.set_context_provider(StaticContext::new("Registration"));
    let ticket = server.activate(Value::Null).unwrap();
    assert_eq!(server.current_view().unwrap(), "FormView");
    assert_eq!(server.attribute("formVisits"), Some(&json!(1)));
    server.clear();

    let view = step(&mut server, &ticket, "submit", json!({"name": "Ada", "email": "ada@example.org"}));
    assert_eq!(view, "ConfirmView");

    server.set_context_provider(StaticContext::new("Registration").with_instance(ticket.as_str())
                                                                   .with_event("confirm"));
    server.activate(Value::Null).unwrap();
    assert_eq!(server.current_view().unwrap(), "DoneView");
    assert_eq!(server.attribute("registeredAs"), Some(&json!("Ada")));
    assert_eq!(server.attribute("completed"), Some(&json!(true)));
    let stored: Registration = serde_json::from_value(server.attribute("registration").cloned().unwrap()).unwrap();
    assert_eq!(stored.email, "ada@example.org");
    server.clear();
    assert!(server.repository().find_by_id(&ticket).is_none());
}

#[test]
fn invalid_submission_returns_to_the_form_with_errors() {
    let mut server = server();
    server.set_context_provider(StaticContext::new("Registration"));
    let ticket = server.activate(Value::Null).unwrap();
    server.clear();

    let view = step(&mut server, &ticket, "submit", json!({"name": "", "email": "nope"}));
    assert_eq!(view, "FormView");

    server.set_context_provider(StaticContext::new("Registration").with_instance(ticket.as_str()));
    server.activate(Value::Null).unwrap();
    assert_eq!(server.attribute("formVisits"), Some(&json!(2)));
    assert_eq!(server.attribute("errors").and_then(Value::as_array).map(Vec::len), Some(2));
    assert!(!server.validate_received_event());
    server.clear();
}

#[test]
fn submit_without_payload_is_ignored_by_the_guard() {
    let mut server = server();
    server.set_context_provider(StaticContext::new("Registration"));
    let ticket = server.activate(Value::Null).unwrap();
    server.clear();

    let view = step(&mut server, &ticket, "submit", Value::Null);
    assert_eq!(view, "FormView");
    server.set_context_provider(StaticContext::new("Registration").with_instance(ticket.as_str()));
    server.activate(Value::Null).unwrap();
    assert_eq!(server.attribute("formVisits"), Some(&json!(1)));
    server.clear();
}
