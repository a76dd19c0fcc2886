// [apps/histserv/src/lib.rs]
//! Decoupled histogram telemetry server: a background
//! thread drains the push-style histogram wire protocol on a TCP listener
//! into a shared registry, while an HTTP front end exposes `/` (list of
//! registered histograms/canvases) and the allow-listed control paths
//! `/Reset_Hist`, `/Save_Hist`, `/Stop_Server`.

/// Command-line / environment configuration (`clap` derive, `CBMRECO_` env fallbacks).
pub mod cli;
/// Axum route handlers and router assembly.
pub mod routes;
/// Shared application state handed to every route handler.
pub mod state;
