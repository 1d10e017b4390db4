//! The gateway host: one owned service object per process.
//!
//! [`Gateway::builder`] resolves the instance role first. A secondary forwards
//! its activation and gets [`Startup::Forwarded`]; the primary starts both
//! channels, registers the scheme when configured, dispatches its own `--url`
//! and gets a [`Gateway`] to keep alive until shutdown.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::config::GatewayConfig;
use crate::platform::instance::{InstanceGuard, InstanceRole};
use crate::platform::ipc::types::{BRIDGE_STATE_TYPE, PING_TYPE};
use crate::platform::ipc::{
    ActivationChannel, ActivationMessage, CommandChannel, Deadlines, Endpoint, HandlerError,
    HandlerFn, HandlerRegistry,
};
use crate::platform::protocol::ProtocolRegistrar;
use crate::routing::Dispatcher;
use crate::security::SecurityGate;
use crate::services::{BackgroundService, ExitRequest, ShutdownSignal, bridge};
use crate::surface::ActionSurface;

/// Result of launching the gateway.
pub enum Startup {
    /// This process is primary and owns the running gateway.
    Primary(Gateway),
    /// Another instance is primary and received this process's activation.
    Forwarded,
}

struct ExtraHandler {
    kind: String,
    guarded: bool,
    handler: Arc<HandlerFn>,
}

/// Configures and launches a [`Gateway`].
pub struct GatewayBuilder {
    config: GatewayConfig,
    surface: Arc<dyn ActionSurface>,
    registrar: Option<ProtocolRegistrar>,
    deadlines: Deadlines,
    handlers: Vec<ExtraHandler>,
}

impl GatewayBuilder {
    /// Uses `registrar` instead of the platform default for this executable.
    #[must_use]
    pub fn registrar(mut self, registrar: ProtocolRegistrar) -> Self {
        self.registrar = Some(registrar);
        self
    }

    /// Overrides the deadlines used when handing off to an existing primary.
    #[must_use]
    pub const fn deadlines(mut self, deadlines: Deadlines) -> Self {
        self.deadlines = deadlines;
        self
    }

    /// Adds a command handler next to the built-in ones.
    #[must_use]
    pub fn handler<F>(mut self, kind: impl Into<String>, guarded: bool, handler: F) -> Self
    where F: Fn(&Map<String, Value>) -> Result<Value, HandlerError> + Send + Sync + 'static {
        self.handlers.push(ExtraHandler {
            kind: kind.into(),
            guarded,
            handler: Arc::new(handler),
        });
        self
    }

    /// Resolves the instance role and, as primary, starts the gateway.
    ///
    /// `url` is this process's `--url` value. Never fails: channel and
    /// registration problems are logged and the gateway keeps running without
    /// the affected piece.
    #[must_use]
    pub fn launch(self, url: Option<&str>) -> Startup {
        let Self {
            config,
            surface,
            registrar,
            deadlines,
            handlers,
        } = self;

        let runtime_dir = config.runtime_dir();
        let guard =
            InstanceGuard::new(&config.instance_name, &runtime_dir).with_deadlines(deadlines);
        let message = ActivationMessage::from_url(url);

        let role = guard.acquire(&message);
        if !role.runs_application() {
            return Startup::Forwarded;
        }

        let bridge = bridge::probe(&config.bridge, &runtime_dir);
        let dispatcher = Arc::new(Dispatcher::new(&config.scheme, surface, bridge));

        let mut registry = builtin_registry(&config, &dispatcher);
        for extra in handlers {
            let handler = extra.handler;
            registry.register(extra.kind, extra.guarded, move |payload| handler(payload));
        }

        let activation =
            ActivationChannel::new(guard.activation_endpoint().clone(), Arc::clone(&dispatcher));
        let command = CommandChannel::new(
            Endpoint::new(&config.command_channel, &runtime_dir),
            Arc::new(registry),
        )
        .with_endpoint_record(config.state_dir(), &config.scheme);

        activation.start();
        command.start();

        let registrar =
            registrar.unwrap_or_else(|| ProtocolRegistrar::for_current_exe(&config.scheme));
        if config.register_protocol && !registrar.is_registered() && !registrar.register() {
            tracing::warn!(scheme = %config.scheme, "continuing without URL scheme registration");
        }

        if let ActivationMessage::Url(url) = &message {
            if let Err(err) = dispatcher.dispatch_url(url) {
                tracing::warn!(error = %err, "ignoring launch url");
            }
        }

        Startup::Primary(Gateway {
            config,
            role,
            dispatcher,
            registrar,
            activation,
            command,
        })
    }
}

/// The running primary: channels, dispatcher, registrar and instance token.
///
/// Dropping it stops both channels and releases the token.
pub struct Gateway {
    config: GatewayConfig,
    role: InstanceRole,
    dispatcher: Arc<Dispatcher>,
    registrar: ProtocolRegistrar,
    activation: ActivationChannel,
    command: CommandChannel,
}

impl Gateway {
    /// Starts configuring a gateway driving `surface`.
    #[must_use]
    pub fn builder(config: GatewayConfig, surface: Arc<dyn ActionSurface>) -> GatewayBuilder {
        GatewayBuilder {
            config,
            surface,
            registrar: None,
            deadlines: Deadlines::default(),
            handlers: Vec::new(),
        }
    }

    /// Launches with default settings. See [`GatewayBuilder::launch`].
    #[must_use]
    pub fn launch(
        config: GatewayConfig,
        surface: Arc<dyn ActionSurface>,
        url: Option<&str>,
    ) -> Startup {
        Self::builder(config, surface).launch(url)
    }

    /// The configuration the gateway was started with.
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig { &self.config }

    /// Whether this process runs without holding the instance token.
    #[must_use]
    pub const fn is_degraded(&self) -> bool { matches!(self.role, InstanceRole::Degraded) }

    /// The URL dispatcher shared by both channels.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher { &self.dispatcher }

    /// The scheme registrar.
    #[must_use]
    pub const fn registrar(&self) -> &ProtocolRegistrar { &self.registrar }

    /// The activation channel.
    #[must_use]
    pub const fn activation(&self) -> &ActivationChannel { &self.activation }

    /// The command channel.
    #[must_use]
    pub const fn command(&self) -> &CommandChannel { &self.command }

    /// Blocks until `signal` fires, then shuts down.
    #[must_use]
    pub fn run_until(self, signal: &ShutdownSignal) -> ExitRequest {
        let request = signal.wait();
        tracing::info!(?request, "shutdown requested");
        self.shutdown();
        request
    }

    /// Stops both channels and releases the instance token.
    pub fn shutdown(self) {
        self.command.stop();
        self.activation.stop();
        tracing::info!(instance = %self.config.instance_name, "gateway stopped");
    }
}

fn builtin_registry(config: &GatewayConfig, dispatcher: &Arc<Dispatcher>) -> HandlerRegistry {
    let gate = SecurityGate::from_config(&config.security);
    if gate.is_enforced() {
        tracing::info!("command verification enabled");
    }

    let mut registry = HandlerRegistry::new(gate, Arc::clone(dispatcher));

    let scheme = config.scheme.clone();
    registry.register(PING_TYPE, false, move |_| {
        Ok(json!({ "pid": std::process::id(), "scheme": scheme }))
    });

    let bridge_dispatcher = Arc::clone(dispatcher);
    registry.register(BRIDGE_STATE_TYPE, false, move |_| {
        Ok(bridge_dispatcher.bridge().describe())
    });

    registry
}
