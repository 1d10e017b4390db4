//! Common test utilities: isolated gateway fixtures and a recording surface.

#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use secrandom_gateway::config::GatewayConfig;
use secrandom_gateway::platform::ipc::{self, Deadlines, Endpoint, Message, Response};
use secrandom_gateway::routing::{
    DrawAction, DrawTarget, Page, Params, TrayAction, WindowAction, WindowTarget,
};
use secrandom_gateway::surface::{ActionSurface, SurfaceError};
use secrandom_gateway::{Gateway, GatewayBuilder, Startup};
use tempfile::TempDir;

/// How long tests wait for asynchronous effects before failing.
pub const EFFECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Action surface recording every call as a short string.
#[derive(Default)]
pub struct RecordingSurface {
    calls: Mutex<Vec<String>>,
}

impl RecordingSurface {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn calls(&self) -> Vec<String> { self.calls.lock().clone() }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|recorded| *recorded == call).count()
    }

    fn record(&self, call: String) -> Result<(), SurfaceError> {
        self.calls.lock().push(call);
        Ok(())
    }
}

impl ActionSurface for RecordingSurface {
    fn activate(&self) -> Result<(), SurfaceError> { self.record("activate".to_string()) }

    fn show_settings(&self, page: Option<&str>, _preview: bool) -> Result<(), SurfaceError> {
        self.record(format!("settings/{}", page.unwrap_or("")))
    }

    fn show_page(&self, page: Page) -> Result<(), SurfaceError> {
        self.record(format!("page/{page:?}"))
    }

    fn tray(&self, action: TrayAction) -> Result<(), SurfaceError> {
        self.record(format!("tray/{action:?}"))
    }

    fn draw(
        &self,
        target: DrawTarget,
        action: DrawAction,
        _params: &Params,
    ) -> Result<(), SurfaceError> {
        self.record(format!("{}/{}", target.as_str(), action.as_str()))
    }

    fn window(&self, target: WindowTarget, action: WindowAction) -> Result<(), SurfaceError> {
        self.record(format!("window/{target:?}/{action:?}"))
    }
}

/// Scratch directories and unique names for one gateway under test.
pub struct Fixture {
    pub config: GatewayConfig,
    _runtime: TempDir,
    _state: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let runtime = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        let id = uuid::Uuid::now_v7().simple().to_string();

        let config = GatewayConfig {
            instance_name: format!("it-{id}"),
            command_channel: format!("it-ipc-{id}"),
            runtime_dir: Some(runtime.path().to_path_buf()),
            state_dir: Some(state.path().to_path_buf()),
            ..GatewayConfig::default()
        };

        Self {
            config,
            _runtime: runtime,
            _state: state,
        }
    }

    pub fn with_credential(mut self, credential: &str) -> Self {
        self.config.security.credential = Some(credential.to_string());
        self
    }

    pub fn builder(&self, surface: Arc<RecordingSurface>) -> GatewayBuilder {
        Gateway::builder(self.config.clone(), surface)
    }

    /// Launches a gateway that must become primary.
    pub fn primary(&self, surface: Arc<RecordingSurface>) -> Gateway {
        match self.builder(surface).launch(None) {
            Startup::Primary(gateway) => gateway,
            Startup::Forwarded => panic!("expected to become primary"),
        }
    }

    pub fn command_endpoint(&self) -> Endpoint {
        Endpoint::new(&self.config.command_channel, self.config.runtime_dir())
    }

    pub fn send(&self, message: &Message) -> Response {
        ipc::request(&self.command_endpoint(), message, Deadlines::default()).unwrap()
    }

    pub fn send_frame(&self, frame: &str) -> Response {
        use std::io::{BufRead, BufReader, Write};

        let mut stream = self.command_endpoint().connect().unwrap();
        stream.write_all(frame.as_bytes()).unwrap();
        stream.write_all(b"\n").unwrap();
        stream.flush().unwrap();

        let mut reply = String::new();
        BufReader::new(stream).read_line(&mut reply).unwrap();
        serde_json::from_str(reply.trim_end()).unwrap()
    }
}

/// Polls `condition` until it holds or [`EFFECT_TIMEOUT`] passes.
pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + EFFECT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}
