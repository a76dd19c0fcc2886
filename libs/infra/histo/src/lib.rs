#![deny(missing_docs)]
//! Histogram/profile accumulators, a small canvas layout DSL, and the
//! sender/receiver wire protocol used to publish online-reconstruction
//! telemetry off the critical path.
//!
//! The wire format reuses `reco-infra-transport`'s length-prefixed
//! `bincode` framing rather than reinventing it: a telemetry message is,
//! at the byte level, the same kind of frame sequence as a results
//! archive entry. What is specific to this crate is the *shape* of those
//! frames (a header, histogram/canvas configuration records sent once,
//! then a stream of histogram containers) and the accumulator semantics
//! (bin contents, total sums, profile statistics, cross-timeslice
//! merging by name).

/// Canvas layout DSL: `name;title;nPadsX;nPadsY;pad1;..;padN` parsing/encoding.
pub mod canvas;
/// Wire container types: `HistoContainer`, `HistoConfig`, `CanvasConfig`.
pub mod container;
/// Fatal error type for this crate (`HistoError`).
pub mod errors;
/// Histogram/profile value types and their bin + total-sum accumulators.
pub mod histogram;
/// The `name!metadata` flag-word convention used for out-of-band histogram flags.
pub mod metadata;
/// Background registry that merges incoming containers by name.
pub mod receiver;
/// Writes histogram/canvas configs once, then a stream of containers.
pub mod sender;

pub use errors::{HistoError, Result};
pub use histogram::{H1D, H2D, Prof1D, Prof2D};
pub use metadata::HistoFlags;

/// Re-exports for call sites that only need the common names.
pub mod prelude {
    pub use crate::canvas::{Canvas, CanvasPad};
    pub use crate::container::{CanvasConfig, HistoConfig, HistoContainer};
    pub use crate::errors::{HistoError, Result};
    pub use crate::histogram::{H1D, H2D, Prof1D, Prof2D};
    pub use crate::metadata::HistoFlags;
    pub use crate::receiver::{PullOutcome, Receiver, Registry};
    pub use crate::sender::Sender;
}
