//! Integration tests for single-instance coordination.
//!
//! ## Test Coverage
//! - Concurrent launches elect exactly one primary
//! - Secondaries hand their activation to the primary
//! - The token is released when the primary shuts down

use std::sync::{Arc, Barrier};
use std::thread;

use secrandom_gateway::Startup;

use crate::common::*;

const LAUNCHES: usize = 6;

#[test]
fn test_concurrent_launches_elect_one_primary() {
    let fixture = Fixture::new();
    let surface = RecordingSurface::new();
    let barrier = Arc::new(Barrier::new(LAUNCHES));

    let handles: Vec<_> = (0..LAUNCHES)
        .map(|_| {
            let builder = fixture.builder(Arc::clone(&surface));
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                builder.launch(None)
            })
        })
        .collect();

    let outcomes: Vec<Startup> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
    let primaries: Vec<_> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            Startup::Primary(gateway) => Some(gateway),
            Startup::Forwarded => None,
        })
        .collect();

    assert_eq!(primaries.len(), 1, "exactly one launch must become primary");
    assert!(!primaries[0].is_degraded());
    assert!(wait_for(|| surface.count("activate") == LAUNCHES - 1));

    // Only activations reached the surface: no secondary ran its own application.
    assert!(surface.calls().iter().all(|call| call == "activate"));
}

#[test]
fn test_token_is_released_on_shutdown() {
    let fixture = Fixture::new();

    let first = fixture.primary(RecordingSurface::new());
    first.shutdown();

    let second = fixture.primary(RecordingSurface::new());
    assert!(!second.is_degraded());
}

#[test]
fn test_secondary_without_url_sends_activate() {
    let fixture = Fixture::new();
    let surface = RecordingSurface::new();
    let _primary = fixture.primary(Arc::clone(&surface));

    let outcome = fixture.builder(RecordingSurface::new()).launch(None);

    assert!(matches!(outcome, Startup::Forwarded));
    assert!(wait_for(|| surface.calls() == vec!["activate".to_string()]));
}
