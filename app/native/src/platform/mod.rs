//! Platform-specific plumbing: local IPC, the single-instance guard and URL
//! scheme registration.

pub mod instance;
pub mod ipc;
pub mod protocol;
