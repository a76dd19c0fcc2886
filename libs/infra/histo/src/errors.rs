// [libs/infra/histo/src/errors.rs]
use thiserror::Error;

/// Fatal errors raised by histogram accumulation, the canvas DSL, or the
/// sender/receiver wire protocol. Decode failures encountered while
/// *draining* a telemetry stream are not fatal: the server logs the
/// failure, drops the offending message, and continues, counted in
/// `reco_domain_model::TelemetryMonitor` instead of surfacing here.
#[derive(Debug, Error)]
pub enum HistoError {
    /// A canvas DSL string did not parse (`name;title;nPadsX;nPadsY;pad..`).
    #[error("malformed canvas DSL: {0}")]
    InvalidCanvasDsl(String),

    /// A `name!metadata` suffix was present but not a valid hex flag word.
    #[error("malformed metadata flag word: {0}")]
    InvalidMetadata(String),

    /// Two histograms merged under the same name have incompatible shapes.
    #[error("cannot merge histogram '{name}': {reason}")]
    ShapeMismatch {
        /// Name under which both histograms are registered.
        name: String,
        /// Why the shapes are incompatible.
        reason: &'static str,
    },

    /// The underlying framed transport failed.
    #[error(transparent)]
    Transport(#[from] reco_infra_transport::TransportError),
}

/// Result alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, HistoError>;
