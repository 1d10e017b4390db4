//! Integration tests for the activation channel.
//!
//! ## Test Coverage
//! - A second launch with `--url` forwards it and the primary acts exactly once
//! - The primary dispatches its own `--url`
//! - Unrecognized and oversized payloads are ignored without stopping the channel
//! - Peers that connect and stall do not block later activations

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use secrandom_gateway::Startup;
use secrandom_gateway::core::constants::ipc::{MAX_CONCURRENT_CONNECTIONS, MAX_MESSAGE_BYTES};
use secrandom_gateway::platform::protocol::{ProtocolRegistrar, RegistrationBackend};

use crate::common::*;

#[derive(Clone, Default)]
struct SharedBackend {
    registered: Arc<AtomicBool>,
}

impl RegistrationBackend for SharedBackend {
    fn register(&self) -> io::Result<()> {
        self.registered.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn unregister(&self) -> io::Result<()> {
        self.registered.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_registered(&self) -> io::Result<bool> { Ok(self.registered.load(Ordering::SeqCst)) }
}

#[test]
fn test_second_launch_forwards_url_to_primary() {
    let mut fixture = Fixture::new();
    fixture.config.register_protocol = true;
    let backend = SharedBackend::default();
    let surface = RecordingSurface::new();

    let primary = match fixture
        .builder(Arc::clone(&surface))
        .registrar(ProtocolRegistrar::with_backend("secrandom", backend.clone()))
        .launch(None)
    {
        Startup::Primary(gateway) => gateway,
        Startup::Forwarded => panic!("first launch must be primary"),
    };
    assert!(primary.registrar().is_registered());
    assert!(primary.activation().endpoint().name().ends_with("-activation"));

    thread::sleep(Duration::from_millis(100));
    let secondary = fixture
        .builder(RecordingSurface::new())
        .launch(Some("secrandom://rollcall/start"));
    assert!(matches!(secondary, Startup::Forwarded));

    assert!(wait_for(|| surface.count("rollcall/start") == 1));
    thread::sleep(Duration::from_millis(200));
    assert_eq!(surface.calls(), vec!["rollcall/start".to_string()]);
}

#[test]
fn test_primary_dispatches_its_own_url() {
    let fixture = Fixture::new();
    let surface = RecordingSurface::new();

    let outcome = fixture
        .builder(Arc::clone(&surface))
        .launch(Some("secrandom://settings/basic"));

    assert!(matches!(outcome, Startup::Primary(_)));
    assert_eq!(surface.calls(), vec!["settings/basic".to_string()]);
}

#[test]
fn test_unrecognized_payload_is_ignored() {
    let fixture = Fixture::new();
    let surface = RecordingSurface::new();
    let primary = fixture.primary(Arc::clone(&surface));

    let mut stream = primary.activation().endpoint().connect().unwrap();
    stream.write_all(b"open sesame").unwrap();
    drop(stream);

    let mut stream = primary.activation().endpoint().connect().unwrap();
    stream.write_all(b"url:secrandom://window/float?action=show").unwrap();
    drop(stream);

    assert!(wait_for(|| surface.count("window/Float/Show") == 1));
    assert_eq!(surface.calls(), vec!["window/Float/Show".to_string()]);
}

#[test]
fn test_forwarded_url_with_wrong_scheme_is_ignored() {
    let fixture = Fixture::new();
    let surface = RecordingSurface::new();
    let _primary = fixture.primary(Arc::clone(&surface));

    let outcome = fixture.builder(RecordingSurface::new()).launch(Some("SecRandom://main"));
    assert!(matches!(outcome, Startup::Forwarded));

    let outcome = fixture.builder(RecordingSurface::new()).launch(Some("secrandom://main"));
    assert!(matches!(outcome, Startup::Forwarded));

    assert!(wait_for(|| surface.count("page/Main") == 1));
    assert_eq!(surface.calls(), vec!["page/Main".to_string()]);
}

#[test]
fn test_oversized_payload_is_dropped() {
    let fixture = Fixture::new();
    let surface = RecordingSurface::new();
    let primary = fixture.primary(Arc::clone(&surface));

    let oversized = format!("url:secrandom://main?note={}", "a".repeat(MAX_MESSAGE_BYTES));
    let mut stream = primary.activation().endpoint().connect().unwrap();
    stream.write_all(oversized.as_bytes()).unwrap();
    drop(stream);

    let mut stream = primary.activation().endpoint().connect().unwrap();
    stream.write_all(b"url:secrandom://lottery/start").unwrap();
    drop(stream);

    assert!(wait_for(|| surface.count("lottery/start") == 1));
    assert_eq!(surface.calls(), vec!["lottery/start".to_string()]);
}

#[test]
fn test_stalled_peers_do_not_block_later_activation() {
    let fixture = Fixture::new();
    let surface = RecordingSurface::new();
    let primary = fixture.primary(Arc::clone(&surface));

    let stalled: Vec<_> = (0..MAX_CONCURRENT_CONNECTIONS)
        .map(|_| primary.activation().endpoint().connect().unwrap())
        .collect();

    let outcome = fixture
        .builder(RecordingSurface::new())
        .launch(Some("secrandom://rollcall/start"));
    assert!(matches!(outcome, Startup::Forwarded));

    assert!(wait_for(|| surface.count("rollcall/start") == 1));
    drop(stalled);
}
