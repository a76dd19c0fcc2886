// [apps/reco-driver/src/errors.rs]
//! Fatal, run-stopping errors of the driver binary. Per-timeslice
//! diagnostics (dropped digis, bucket overflows, PRF fit failures) stay in
//! the `*Monitor` types from `reco_domain_model` and `reco_domain_detectors`
//! and never surface here.

use thiserror::Error;

/// Errors that abort the run before or during timeslice processing.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The calibration parameter block at the given path failed to parse.
    #[error("failed to parse calibration parameters at {path}: {source}")]
    ParamsParse {
        /// Path the parameter block was read from.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A detector setup failed its own construction invariant.
    #[error("invalid {detector} configuration: {source}")]
    DetectorSetup {
        /// Name of the detector whose setup failed to construct.
        detector: &'static str,
        /// Underlying error from the detector crate.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `--skip-ts` and `--num-ts` left nothing to process.
    #[error("--skip-ts {skip} skips past the entire input (num-ts {num_ts:?})")]
    NothingToProcess {
        /// Configured skip count.
        skip: u64,
        /// Configured processing limit, if any.
        num_ts: Option<u64>,
    },

    /// `--dump-archive` was requested but no output archive exists yet at the given path.
    #[error("cannot dump archive: {path} does not exist")]
    ArchiveMissing {
        /// Path that was expected to hold a results archive.
        path: String,
    },
}
