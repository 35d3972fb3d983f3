use std::path::PathBuf;

use pageflow_rust::{run_activation, ActivationRequest, AppConfig, AppError, FileSessionStore};
use pageflow_core::{ContinuationError, PageFlowError};
use serde_json::{json, Value};

fn config(session_dir: &tempfile::TempDir) -> AppConfig {
    AppConfig { flow_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("flows"),
                session_file: session_dir.path().join("session.json"),
                ..AppConfig::default() }
}

fn request(flow_id: &str, ticket: Option<&str>, event: Option<&str>) -> ActivationRequest {
    ActivationRequest { flow_id: flow_id.to_string(),
                        ticket: ticket.map(str::to_string),
                        event: event.map(str::to_string),
                        payload: Value::Null }
}

#[test]
fn counter_survives_between_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);

    let first = run_activation(&config, &request("Counter", None, None)).unwrap();
    assert_eq!(first.state.as_deref(), Some("Counting"));
    assert_eq!(first.view.as_deref(), Some("CounterView"));
    assert_eq!(first.attributes.get("counter"), Some(&json!(0)));
    assert!(config.session_file.exists());

    let second = run_activation(&config, &request("Counter", Some(&first.ticket), Some("increase"))).unwrap();
    assert_eq!(second.ticket, first.ticket);
    assert_eq!(second.attributes.get("counter"), Some(&json!(1)));
    assert!(second.event_valid);

    let done = run_activation(&config, &request("Counter", Some(&first.ticket), Some("finish"))).unwrap();
    assert!(done.finished);
    assert_eq!(done.view.as_deref(), Some("FinishedView"));

    // La instancia terminada ya no está en la sesión: el ticket arranca otra.
    let again = run_activation(&config, &request("Counter", Some(&first.ticket), Some("increase"))).unwrap();
    assert_ne!(again.ticket, first.ticket);
}

#[test]
fn protocol_errors_are_reported_and_session_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let first = run_activation(&config, &request("Counter", None, None)).unwrap();

    let err = run_activation(&config, &request("SecondCounter", Some(&first.ticket), Some("increase"))).unwrap_err();
    assert!(matches!(err, AppError::Continuation(ContinuationError::UnexpectedFlowId { .. })));

    let err = run_activation(&config, &request("Missing", None, None)).unwrap_err();
    assert!(matches!(err, AppError::Continuation(ContinuationError::FlowNotFound(_))));

    let resumed = run_activation(&config, &request("Counter", Some(&first.ticket), Some("increase"))).unwrap();
    assert_eq!(resumed.ticket, first.ticket);
}

#[test]
fn failed_resume_is_cleared_and_the_session_still_saved() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let first = run_activation(&config, &request("Counter", None, None)).unwrap();
    let huge = ActivationRequest { payload: json!({"by": i64::MAX}),
                                   ..request("Counter", Some(&first.ticket), Some("increase")) };

    run_activation(&config, &huge).unwrap();
    let err = run_activation(&config, &huge).unwrap_err();
    assert!(matches!(err, AppError::Continuation(ContinuationError::PageFlow(PageFlowError::ActionFailed { .. }))));

    let after = run_activation(&config, &request("Counter", Some(&first.ticket), None)).unwrap();
    assert_eq!(after.ticket, first.ticket);
    assert_eq!(after.attributes.get("counter"), Some(&json!(i64::MAX)));
}

#[test]
fn corrupt_session_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    FileSessionStore::new(&config.session_file).save(b"not a session").unwrap();
    let err = run_activation(&config, &request("Counter", None, None)).unwrap_err();
    assert!(matches!(err, AppError::Continuation(ContinuationError::InvalidSession(_))));
}

#[test]
fn exclusive_flows_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig { exclusive_flows: vec!["Counter".into()],
                             ..config(&dir) };
    let first = run_activation(&config, &request("Counter", None, None)).unwrap();
    let second = run_activation(&config, &request("Counter", None, None)).unwrap();
    assert_ne!(first.ticket, second.ticket);

    // El primer ticket fue desalojado: reanudarlo arranca una instancia nueva.
    let resumed = run_activation(&config, &request("Counter", Some(&first.ticket), Some("increase"))).unwrap();
    assert_ne!(resumed.ticket, first.ticket);
    assert_eq!(resumed.attributes.get("counter"), Some(&json!(0)));
}
