//! Command handlers for the CLI
//!
//! - `secrets` -- the `kvault secret ...` family

pub mod secrets;

pub use secrets::handle_secret;
