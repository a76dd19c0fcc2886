// [apps/histserv/src/state.rs]
//! Shared application state: the histogram receiver's registry, the
//! cancellation flag the background ingest thread and `/Stop_Server`
//! coordinate through, and the parsed CLI configuration every handler
//! consults to decide whether a control path is enabled.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use reco_infra_histo::receiver::Receiver;

use crate::cli::Args;

/// State handed to every route handler via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// The receiver whose registry the background ingest thread writes to.
    pub receiver: Arc<Receiver>,
    /// Set by `/Stop_Server` (when enabled) and polled by the ingest thread's
    /// pull loop and the server's own shutdown future.
    pub shutdown: Arc<AtomicBool>,
    /// Parsed CLI configuration, consulted for control-path gating and the save directory.
    pub args: Arc<Args>,
}

impl AppState {
    /// Builds the shared state from a fresh receiver and the parsed arguments.
    #[must_use]
    pub fn new(receiver: Arc<Receiver>, args: Args) -> Self {
        Self { receiver, shutdown: Arc::new(AtomicBool::new(false)), args: Arc::new(args) }
    }
}
