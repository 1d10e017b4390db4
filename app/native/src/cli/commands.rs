//! CLI command definitions using Clap.
//!
//! Without a subcommand the binary runs as the application host. Subcommands
//! talk to a running primary or manage the URL scheme registration directly.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use crate::config::{self, GatewayConfig};
use crate::core::constants::config::CONFIG_ENV;
use crate::core::prelude::*;
use crate::gateway::{Gateway, Startup};
use crate::platform::instance::InstanceGuard;
use crate::platform::ipc::types::VERIFICATION_FAILED_ERROR;
use crate::platform::ipc::{self, ActivationMessage, Deadlines, Endpoint, EndpointRecord, Message};
use crate::platform::protocol::ProtocolRegistrar;
use crate::routing;
use crate::services::{ExitRequest, ShutdownSignal};
use crate::surface::LoggingSurface;

/// SecRandom gateway - single-instance host and URL command router.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME)]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Scheme URL to act on, e.g. `secrandom://rollcall/start`.
    ///
    /// Forwarded to the running instance if there is one.
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Path to the configuration file.
    #[arg(long, global = true, env = CONFIG_ENV, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Manage the OS registration of the URL scheme.
    ///
    /// Works whether or not an instance is running. Exits with status 1 when
    /// the operation fails or, for `status`, when the scheme is not registered.
    #[command(subcommand)]
    Protocol(ProtocolCommands),

    /// Send a scheme URL to the running instance's command channel.
    ///
    /// Prints the JSON response.
    #[command(
        verbatim_doc_comment,
        after_long_help = r#"Examples:
  secrandom-gateway send secrandom://rollcall/start
  secrandom-gateway send 'secrandom://lottery/set_count?count=3' --credential s3cret
  secrandom-gateway send 'secrandom://window/float?action=show'"#
    )]
    Send {
        /// The scheme URL to dispatch.
        url: String,

        /// Verification value, required when the primary has a credential configured.
        #[arg(long, env = "SECRANDOM_GATEWAY_CREDENTIAL", hide_env_values = true)]
        credential: Option<String>,
    },

    /// Bring the running instance to the foreground.
    Activate,

    /// Output the configuration JSON Schema.
    ///
    /// Can be redirected to a file for use with editors that support JSON
    /// Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Usage:
    ///   eval "$(secrandom-gateway completions --shell zsh)"
    ///   secrandom-gateway completions --shell fish > ~/.config/fish/completions/secrandom-gateway.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

/// URL scheme registration subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolCommands {
    /// Register the scheme for the current user.
    Register,
    /// Remove the scheme registration.
    Unregister,
    /// Report whether the scheme is registered to this executable.
    Status,
}

impl Cli {
    /// Executes the parsed command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub fn execute(&self) -> Result<()> {
        let Some(command) = &self.command else {
            return self.run_host();
        };

        if self.url.is_some() {
            return Err(Error::invalid_args("--url cannot be combined with a subcommand"));
        }

        match command {
            Commands::Protocol(protocol_cmd) => self.execute_protocol(*protocol_cmd)?,
            Commands::Send { url, credential } => self.execute_send(url, credential.as_deref())?,
            Commands::Activate => {
                let config = self.load_config()?;
                let guard = InstanceGuard::new(&config.instance_name, config.runtime_dir());
                ipc::send_activation(
                    guard.activation_endpoint(),
                    &ActivationMessage::Activate,
                    Deadlines::default(),
                )?;
            }
            Commands::Schema => println!("{}", config::schema_json()),
            Commands::Completions { shell } => Self::print_completions(*shell),
        }

        Ok(())
    }

    fn load_config(&self) -> Result<GatewayConfig> { Ok(config::load_config(self.config.as_deref())?) }

    /// Runs as the application host until a tray exit or restart.
    fn run_host(&self) -> Result<()> {
        let config = self.load_config()?;
        let shutdown = ShutdownSignal::new();
        let surface = Arc::new(LoggingSurface::new(shutdown.clone()));

        let gateway = match Gateway::launch(config, surface, self.url.as_deref()) {
            Startup::Forwarded => return Ok(()),
            Startup::Primary(gateway) => gateway,
        };

        if gateway.is_degraded() {
            tracing::warn!("running without the instance token; another instance may be active");
        }

        match gateway.run_until(&shutdown) {
            ExitRequest::Exit => Ok(()),
            ExitRequest::Restart => relaunch(self.config.as_deref()),
        }
    }

    fn execute_protocol(&self, cmd: ProtocolCommands) -> Result<()> {
        let config = self.load_config()?;
        let registrar = ProtocolRegistrar::for_current_exe(&config.scheme);
        let scheme = registrar.scheme();

        match cmd {
            ProtocolCommands::Register => {
                if !registrar.register() {
                    return Err(Error::registration(format!("failed to register {scheme}://")));
                }
                println!("Registered {scheme}://");
            }
            ProtocolCommands::Unregister => {
                if !registrar.unregister() {
                    return Err(Error::registration(format!("failed to unregister {scheme}://")));
                }
                println!("Unregistered {scheme}://");
            }
            ProtocolCommands::Status => {
                if !registrar.is_registered() {
                    return Err(Error::registration(format!("{scheme}:// is not registered")));
                }
                println!("{scheme}:// is registered");
            }
        }

        Ok(())
    }

    fn execute_send(&self, url: &str, credential: Option<&str>) -> Result<()> {
        let config = self.load_config()?;
        routing::parse(&config.scheme, url).map_err(|err| Error::invalid_args(err.to_string()))?;

        let state_dir = config.state_dir();
        let name = EndpointRecord::read(&state_dir)
            .map(|record| record.name)
            .unwrap_or_else(|_| config.command_channel.clone());
        let endpoint = Endpoint::new(name, config.runtime_dir());

        let response = ipc::request(&endpoint, &Message::url(url, credential), Deadlines::default())?;
        println!("{}", serde_json::to_string_pretty(&response)?);

        match response.error {
            _ if response.success => Ok(()),
            Some(error) if error == VERIFICATION_FAILED_ERROR => Err(Error::security(error)),
            Some(error) => Err(Error::protocol(error)),
            None => Err(Error::protocol("command failed")),
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, BIN_NAME, &mut io::stdout());
    }
}

/// Starts a fresh copy of this executable after the gateway has stopped.
fn relaunch(config: Option<&Path>) -> Result<()> {
    let exe = std::env::current_exe()?;
    let mut command = std::process::Command::new(&exe);
    if let Some(config) = config {
        command.arg("--config").arg(config);
    }

    let child = command.spawn()?;
    tracing::info!(pid = child.id(), exe = %exe.display(), "relaunched");
    Ok(())
}
