// [libs/infra/transport/src/framing.rs]
/*!
 * Shared length-prefixed `bincode` framer.
 *
 * Both the results archive and the histogram telemetry wire protocol are,
 * at the byte level, "a sequence of length-prefixed bincode frames,
 * optionally zstd-compressed". This module is the single place that
 * format is implemented, so the archive writer/reader and the histogram
 * sender/receiver never diverge on wire details.
 *
 * Frame layout: `[flags: u8][payload_len: u64 LE][payload bytes]`.
 * `flags` bit 0 set means the payload is zstd-compressed before framing.
 */

use crate::errors::{Result, TransportError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

const FLAG_COMPRESSED: u8 = 0b0000_0001;

/// Default ceiling on a single frame's declared payload length.
///
/// Prevents a corrupted or adversarial length header from driving an
/// unbounded allocation; reconstruction frames (timeslice records,
/// histogram containers) are well under this in practice.
pub const DEFAULT_MAX_FRAME_BYTES: u64 = 512 * 1024 * 1024;

/// Encodes `value` with `bincode`, optionally zstd-compressing the result,
/// and writes it to `writer` as one length-prefixed frame.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, value: &T, compress: bool) -> Result<()> {
    let encoded = bincode::serialize(value)?;
    let (flags, payload) = if compress {
        let compressed = zstd::stream::encode_all(encoded.as_slice(), 0).map_err(TransportError::Compression)?;
        (FLAG_COMPRESSED, compressed)
    } else {
        (0u8, encoded)
    };

    writer.write_u8(flags)?;
    writer.write_u64::<LittleEndian>(payload.len() as u64)?;
    writer.write_all(&payload)?;
    Ok(())
}

/// Reads one length-prefixed frame from `reader` and decodes it as `T`.
///
/// Returns `Ok(None)` on a clean EOF before any byte of a new frame has
/// been read (the normal end of an archive or stream); any other I/O
/// failure, including a truncated frame, is propagated.
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R, max_frame_bytes: u64) -> Result<Option<T>> {
    let flags = match reader.read_u8() {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let declared_len = reader.read_u64::<LittleEndian>()?;
    if declared_len > max_frame_bytes {
        return Err(TransportError::FrameTooLarge { declared: declared_len, limit: max_frame_bytes });
    }

    let mut payload = vec![0u8; declared_len as usize];
    reader.read_exact(&mut payload)?;

    let decoded_bytes = if flags & FLAG_COMPRESSED != 0 {
        zstd::stream::decode_all(payload.as_slice()).map_err(TransportError::Compression)?
    } else {
        payload
    };

    let value = bincode::deserialize(&decoded_bytes)?;
    Ok(Some(value))
}

/// A framed writer bound to a sink, remembering the compression policy for
/// every subsequent record.
pub struct FramedWriter<W> {
    inner: W,
    compress: bool,
}

impl<W: Write> FramedWriter<W> {
    /// Wraps `inner`, compressing every written frame with zstd when `compress` is set.
    pub fn new(inner: W, compress: bool) -> Self {
        Self { inner, compress }
    }

    /// Serialises and writes one record as a single frame.
    pub fn write_record<T: Serialize>(&mut self, value: &T) -> Result<()> {
        write_frame(&mut self.inner, value, self.compress)
    }

    /// Flushes the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Returns the wrapped sink, consuming the writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// A framed reader bound to a source, yielding one decoded record per call.
pub struct FramedReader<R> {
    inner: R,
    max_frame_bytes: u64,
}

impl<R: Read> FramedReader<R> {
    /// Wraps `inner` with the default frame-size ceiling.
    pub fn new(inner: R) -> Self {
        Self { inner, max_frame_bytes: DEFAULT_MAX_FRAME_BYTES }
    }

    /// Wraps `inner` with an explicit frame-size ceiling.
    pub fn with_max_frame_bytes(inner: R, max_frame_bytes: u64) -> Self {
        Self { inner, max_frame_bytes }
    }

    /// Reads and decodes the next record, or `None` at a clean end of stream.
    pub fn read_record<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        read_frame(&mut self.inner, self.max_frame_bytes)
    }

    /// Returns the wrapped source, consuming the reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        id: u32,
        payload: Vec<f64>,
    }

    #[test]
    fn round_trips_uncompressed() {
        let mut buf = Vec::new();
        let sample = Sample { id: 7, payload: vec![1.0, 2.0, 3.0] };
        write_frame(&mut buf, &sample, false).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let decoded: Sample = read_frame(&mut cursor, DEFAULT_MAX_FRAME_BYTES).unwrap().unwrap();
        assert_eq!(decoded, sample);
    }

    #[test]
    fn round_trips_compressed() {
        let mut buf = Vec::new();
        let sample = Sample { id: 99, payload: vec![0.1; 256] };
        write_frame(&mut buf, &sample, true).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let decoded: Sample = read_frame(&mut cursor, DEFAULT_MAX_FRAME_BYTES).unwrap().unwrap();
        assert_eq!(decoded, sample);
    }

    #[test]
    fn multiple_frames_stream_sequentially() {
        let mut buf = Vec::new();
        let mut writer = FramedWriter::new(&mut buf, false);
        writer.write_record(&Sample { id: 1, payload: vec![] }).unwrap();
        writer.write_record(&Sample { id: 2, payload: vec![4.0] }).unwrap();

        let mut reader = FramedReader::new(std::io::Cursor::new(buf));
        let first: Sample = reader.read_record().unwrap().unwrap();
        let second: Sample = reader.read_record().unwrap().unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        let eof: Option<Sample> = reader.read_record().unwrap();
        assert!(eof.is_none());
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &Sample { id: 1, payload: vec![0.0; 1024] }, false).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let result: Result<Option<Sample>> = read_frame(&mut cursor, 4);
        assert!(matches!(result, Err(TransportError::FrameTooLarge { .. })));
    }
}
