//! Integration tests for Linux URL scheme registration.
//!
//! The backend runs against scratch directories with desktop tooling
//! disabled, so nothing touches the real user session.
//!
//! ## Test Coverage
//! - register / is_registered / unregister invariants
//! - Repeated registration does not duplicate state
//! - Foreign handlers are left alone on unregister

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use secrandom_gateway::platform::protocol::ProtocolRegistrar;
use secrandom_gateway::platform::protocol::linux::LinuxDesktopBackend;
use tempfile::TempDir;

struct Session {
    apps: TempDir,
    config: TempDir,
}

impl Session {
    fn new() -> Self {
        Self {
            apps: tempfile::tempdir().unwrap(),
            config: tempfile::tempdir().unwrap(),
        }
    }

    fn backend(&self) -> LinuxDesktopBackend {
        LinuxDesktopBackend::new(
            "secrandom",
            "/opt/SecRandom/secrandom",
            self.apps.path(),
            self.config.path(),
        )
        .without_desktop_tools()
    }

    fn registrar(&self) -> ProtocolRegistrar {
        ProtocolRegistrar::with_backend("secrandom", self.backend())
    }

    fn mimeapps(&self) -> String {
        fs::read_to_string(self.config.path().join("mimeapps.list")).unwrap_or_default()
    }
}

fn mode(path: &Path) -> u32 { fs::metadata(path).unwrap().permissions().mode() & 0o777 }

#[test]
fn test_register_then_query() {
    let session = Session::new();
    let registrar = session.registrar();

    assert!(!registrar.is_registered());
    assert!(registrar.register());
    assert!(registrar.is_registered());

    let desktop = session.backend().desktop_file_path();
    let entry = fs::read_to_string(&desktop).unwrap();
    assert!(entry.contains("Exec=\"/opt/SecRandom/secrandom\" --url %u"));
    assert!(entry.contains("MimeType=x-scheme-handler/secrandom;"));
    assert_eq!(mode(&desktop), 0o755);
    assert!(
        session
            .mimeapps()
            .contains("x-scheme-handler/secrandom=secrandom-url-handler.desktop;")
    );
}

#[test]
fn test_register_twice_then_unregister() {
    let session = Session::new();
    let registrar = session.registrar();

    assert!(registrar.register());
    let first = session.mimeapps();
    assert!(registrar.register());
    assert_eq!(session.mimeapps(), first);
    assert_eq!(first.matches("x-scheme-handler/secrandom=").count(), 1);

    assert!(registrar.unregister());
    assert!(!registrar.is_registered());
    assert!(!session.backend().desktop_file_path().exists());
    assert!(!session.mimeapps().contains("x-scheme-handler/secrandom"));
}

#[test]
fn test_unregister_when_absent_succeeds() {
    let session = Session::new();
    let registrar = session.registrar();

    assert!(registrar.unregister());
    assert!(!registrar.is_registered());
}

#[test]
fn test_foreign_default_is_not_reported_or_removed() {
    let session = Session::new();
    let registrar = session.registrar();
    assert!(registrar.register());

    let foreign = "[Default Applications]\nx-scheme-handler/secrandom=other-app.desktop;\n";
    fs::write(session.config.path().join("mimeapps.list"), foreign).unwrap();
    assert!(!registrar.is_registered());

    assert!(registrar.unregister());
    assert_eq!(session.mimeapps(), foreign);
}

#[test]
fn test_stale_desktop_entry_is_not_registered() {
    let session = Session::new();
    assert!(session.registrar().register());

    let moved = LinuxDesktopBackend::new(
        "secrandom",
        "/usr/local/bin/secrandom",
        session.apps.path(),
        session.config.path(),
    )
    .without_desktop_tools();
    let registrar = ProtocolRegistrar::with_backend("secrandom", moved);

    assert!(!registrar.is_registered());
    assert!(registrar.register());
    assert!(registrar.is_registered());
}
