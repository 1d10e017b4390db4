//! Integration tests for the JSON command channel.
//!
//! ## Test Coverage
//! - `url` messages dispatch exactly once and report the routed fields
//! - Unknown types, malformed frames and unknown domains fail without
//!   stopping the server
//! - Credential verification runs before any handler
//! - Built-in `ping` and `bridge.state` types
//! - Idempotent start, endpoint record lifecycle, concurrent clients
//! - A request without trailing newline is answered while the client waits
//! - A tray exit is answered before the host finishes shutting down

use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use secrandom_gateway::platform::ipc::types::{UNKNOWN_TYPE_ERROR, VERIFICATION_FAILED_ERROR};
use secrandom_gateway::core::constants::ipc::CONNECTION_READ_TIMEOUT;
use secrandom_gateway::platform::ipc::{EndpointRecord, HandlerError, Message, Response};
use secrandom_gateway::services::{BackgroundService, ExitRequest, ShutdownSignal};
use secrandom_gateway::surface::LoggingSurface;
use secrandom_gateway::{Gateway, Startup};
use serde_json::{Map, Value, json};

use crate::common::*;

fn message(kind: &str) -> Message { Message::new(kind, Map::new()) }

#[test]
fn test_tray_restart_fires_exactly_once() {
    let fixture = Fixture::new();
    let surface = RecordingSurface::new();
    let _gateway = fixture.primary(Arc::clone(&surface));

    let response = fixture.send(&Message::url("secrandom://tray/restart", None));

    assert!(response.success);
    assert_eq!(response.result.unwrap()["domain"], "tray");
    assert_eq!(surface.calls(), vec!["tray/Restart".to_string()]);
}

#[test]
fn test_unknown_type_keeps_server_available() {
    let fixture = Fixture::new();
    let _gateway = fixture.primary(RecordingSurface::new());

    assert_eq!(fixture.send(&message("teleport")), Response::failure(UNKNOWN_TYPE_ERROR));

    let ping = fixture.send(&message("ping"));
    assert!(ping.success);
    assert_eq!(ping.result.unwrap(), json!({ "pid": std::process::id(), "scheme": "secrandom" }));
}

#[test]
fn test_malformed_frame_is_a_structured_failure() {
    let fixture = Fixture::new();
    let _gateway = fixture.primary(RecordingSurface::new());

    let response = fixture.send_frame(r#"{"type": 42, "payload": {}}"#);
    assert!(!response.success);
    assert!(response.error.unwrap().starts_with("invalid message"));

    assert!(fixture.send(&message("ping")).success);
}

#[test]
fn test_unknown_domain_is_reported() {
    let fixture = Fixture::new();
    let surface = RecordingSurface::new();
    let _gateway = fixture.primary(Arc::clone(&surface));

    let response = fixture.send(&Message::url("secrandom://printer/start", None));
    assert!(!response.success);
    assert!(response.error.unwrap().contains("unknown domain"));

    assert!(fixture.send(&Message::url("secrandom://lottery", None)).success);
    assert_eq!(surface.calls(), vec!["page/Lottery".to_string()]);
}

#[test]
fn test_credential_is_checked_before_dispatch() {
    let fixture = Fixture::new().with_credential("s3cret");
    let surface = RecordingSurface::new();
    let _gateway = fixture.primary(Arc::clone(&surface));

    let missing = fixture.send(&Message::url("secrandom://rollcall/start", None));
    assert_eq!(missing, Response::failure(VERIFICATION_FAILED_ERROR));

    let wrong = fixture.send(&Message::url("secrandom://rollcall/start", Some("guess")));
    assert_eq!(wrong, Response::failure(VERIFICATION_FAILED_ERROR));
    assert!(surface.calls().is_empty());

    let correct = fixture.send(&Message::url("secrandom://rollcall/start", Some("s3cret")));
    assert!(correct.success);
    assert_eq!(surface.calls(), vec!["rollcall/start".to_string()]);

    // Unguarded built-ins stay reachable without a credential.
    assert!(fixture.send(&message("ping")).success);
}

#[test]
fn test_bridge_state_without_bridge() {
    let fixture = Fixture::new();
    let _gateway = fixture.primary(RecordingSurface::new());

    let response = fixture.send(&message("bridge.state"));
    assert!(response.success);
    assert_eq!(response.result.unwrap(), json!({ "available": false }));
}

#[test]
fn test_custom_handlers_and_panics() {
    let fixture = Fixture::new();
    let outcome = fixture
        .builder(RecordingSurface::new())
        .handler("echo", false, |payload| Ok(Value::Object(payload.clone())))
        .handler("fail", false, |_| Err(HandlerError::Failed("nope".to_string())))
        .handler("boom", false, |_| panic!("handler exploded"))
        .launch(None);
    let Startup::Primary(_gateway) = outcome else {
        panic!("expected primary");
    };

    let mut payload = Map::new();
    payload.insert("n".to_string(), json!(1));
    let echoed = fixture.send(&Message::new("echo", payload));
    assert_eq!(echoed.result.unwrap(), json!({ "n": 1 }));

    assert_eq!(fixture.send(&message("fail")), Response::failure("nope"));
    assert_eq!(fixture.send(&message("boom")).error.as_deref(), Some("handler exploded"));
    assert!(fixture.send(&message("ping")).success);
}

#[test]
fn test_start_is_idempotent_and_record_follows_lifecycle() {
    let fixture = Fixture::new();
    let gateway = fixture.primary(RecordingSurface::new());
    let state_dir = fixture.config.state_dir();

    assert!(gateway.command().is_running());
    assert!(gateway.command().start_server());
    assert!(gateway.command().start_server());
    assert!(fixture.send(&message("ping")).success);

    let record = EndpointRecord::read(&state_dir).unwrap();
    assert_eq!(record.name, fixture.config.command_channel);
    assert_eq!(record.pid, std::process::id());

    gateway.shutdown();
    assert!(EndpointRecord::read(&state_dir).is_err());
}

#[test]
fn test_concurrent_clients_are_all_served() {
    let fixture = Arc::new(Fixture::new());
    let surface = RecordingSurface::new();
    let _gateway = fixture.primary(Arc::clone(&surface));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let fixture = Arc::clone(&fixture);
            thread::spawn(move || fixture.send(&Message::url("secrandom://window/main?action=show", None)))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().success);
    }
    assert_eq!(surface.count("window/Main/Show"), 8);
}

#[test]
fn test_request_without_newline_is_answered() {
    let fixture = Fixture::new();
    let surface = RecordingSurface::new();
    let _gateway = fixture.primary(Arc::clone(&surface));

    let mut stream = fixture.command_endpoint().connect().unwrap();
    stream
        .write_all(br#"{"type":"url","payload":{"url":"secrandom://tray/restart"}}"#)
        .unwrap();
    stream.flush().unwrap();

    let started = Instant::now();
    let mut reply = String::new();
    BufReader::new(&mut stream).read_line(&mut reply).unwrap();

    assert!(started.elapsed() < CONNECTION_READ_TIMEOUT);
    let response: Response = serde_json::from_str(reply.trim_end()).unwrap();
    assert!(response.success);
    assert_eq!(surface.calls(), vec!["tray/Restart".to_string()]);
}

#[test]
fn test_tray_exit_reply_arrives_before_shutdown_completes() {
    let fixture = Fixture::new();
    let signal = ShutdownSignal::new();
    let surface = Arc::new(LoggingSurface::new(signal.clone()));
    let Startup::Primary(gateway) = Gateway::builder(fixture.config.clone(), surface).launch(None)
    else {
        panic!("expected primary");
    };

    let host_signal = signal.clone();
    let host = thread::spawn(move || gateway.run_until(&host_signal));

    let response = fixture.send(&Message::url("secrandom://tray/exit", None));
    assert!(response.success);
    assert_eq!(response.result.unwrap()["action"], "exit");

    assert_eq!(host.join().unwrap(), ExitRequest::Exit);
    assert!(fixture.command_endpoint().connect().is_err());
}
