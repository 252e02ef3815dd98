//! HTTP API module.
//!
//! Serves the task REST endpoints, the health check, and the embedded
//! single-page client.

mod server;
pub mod templates;

pub use server::{
    AppState, SERVICE_NAME, ServerHandle, build_router, shutdown_signal, start_server,
};
