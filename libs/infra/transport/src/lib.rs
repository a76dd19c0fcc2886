#![deny(missing_docs)]
//! Length-prefixed `bincode` framing shared by the results archive
//! (`apps/reco-driver`) and the histogram telemetry wire protocol
//! (`libs/infra/histo`). Both are, at the byte level, a sequence of
//! length-prefixed frames with optional per-frame zstd compression; this
//! crate is the single source of truth for that format so the two call
//! sites never drift apart.

/// Fatal, construction/I-O-time error type for this crate.
pub mod errors;
/// Frame-level read/write primitives and the `FramedWriter`/`FramedReader` pair.
pub mod framing;

pub use errors::{Result, TransportError};
pub use framing::{read_frame, write_frame, FramedReader, FramedWriter, DEFAULT_MAX_FRAME_BYTES};

/// Re-exports for call sites that only need the common names.
pub mod prelude {
    pub use crate::{FramedReader, FramedWriter, Result, TransportError};
}
