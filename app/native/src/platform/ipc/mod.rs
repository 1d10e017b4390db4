//! Local IPC between gateway processes.
//!
//! Two independent channels run in the primary instance:
//!
//! - [`activation`] - Plain-text `activate` / `url:<value>` handoff, one message per connection
//! - [`command`] - JSON request/response envelopes routed through a handler registry
//!
//! Both share the local-socket [`transport`] and the cancellable accept loop in
//! [`server`]. The [`client`] functions are what secondary processes and the
//! CLI use to reach them.

pub mod activation;
pub mod client;
pub mod command;
pub mod handlers;
pub mod record;
pub mod server;
pub mod transport;
pub mod types;

pub use activation::{ActivationChannel, ActivationMessage};
pub use client::{Deadlines, probe, request, send_activation};
pub use command::CommandChannel;
pub use handlers::{HandlerError, HandlerFn, HandlerRegistry};
pub use record::EndpointRecord;
pub use server::ServerHandle;
pub use transport::{Connection, Endpoint};
pub use types::{Message, Response};
