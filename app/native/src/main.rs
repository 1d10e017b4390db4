#![allow(clippy::multiple_crate_versions)]

//! SecRandom gateway binary.
//!
//! With no subcommand (optionally with `--url <URL>`) it runs as the
//! application host: the first instance becomes primary and later ones forward
//! their activation to it and exit. Subcommands manage the URL scheme
//! registration or talk to the running primary.

fn main() {
    if let Err(err) = secrandom_gateway::cli::run() {
        eprintln!("secrandom-gateway: {err}");
        std::process::exit(1);
    }
}
