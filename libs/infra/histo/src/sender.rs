// [libs/infra/histo/src/sender.rs]
//! Publishes histogram telemetry over a `reco-infra-transport` framed
//! sink: `[header][histo-configs][canvas-configs][data]` on
//! the first send, then `[empty header][data]` on every send after, so
//! the receiver never re-registers configuration it already has.

use crate::container::{CanvasConfig, Header, HistoConfig, HistoContainer};
use crate::errors::Result;
use reco_infra_transport::FramedWriter;
use std::io::Write;

/// Writes histogram/canvas configuration once, then a stream of
/// [`HistoContainer`]s, to a framed sink.
pub struct Sender<W> {
    writer: FramedWriter<W>,
    configs_sent: bool,
}

impl<W: Write> Sender<W> {
    /// Wraps `inner`, compressing every written frame with zstd when `compress` is set.
    #[must_use]
    pub fn new(inner: W, compress: bool) -> Self {
        Self { writer: FramedWriter::new(inner, compress), configs_sent: false }
    }

    /// Sends one timeslice's container, along with `histo_configs` and
    /// `canvas_configs` the first time this is called. Every subsequent
    /// call writes an empty configuration header, leaving the receiver's
    /// registered configs untouched.
    ///
    /// # Errors
    /// Propagates any framing/I-O failure.
    pub fn send(&mut self, histo_configs: &[HistoConfig], canvas_configs: &[CanvasConfig], container: &HistoContainer) -> Result<()> {
        if self.configs_sent {
            self.writer.write_record(&Header { n_histo_configs: 0, n_canvas_configs: 0 })?;
        } else {
            self.writer.write_record(&Header { n_histo_configs: histo_configs.len() as u32, n_canvas_configs: canvas_configs.len() as u32 })?;
            for cfg in histo_configs {
                self.writer.write_record(cfg)?;
            }
            for cfg in canvas_configs {
                self.writer.write_record(cfg)?;
            }
            self.configs_sent = true;
        }

        self.writer.write_record(&container.clone().to_wire())?;
        self.writer.flush()?;
        Ok(())
    }

    /// Returns the wrapped sink, consuming the sender.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::H1D;
    use reco_infra_transport::FramedReader;

    #[test]
    fn first_send_carries_configs_later_sends_do_not() {
        let mut buf = Vec::new();
        let mut sender = Sender::new(&mut buf, false);
        let histo_configs = vec![HistoConfig { name: "h".to_string(), folder: "sts".to_string() }];
        let container = HistoContainer { timeslice_id: 1, h1d: vec![H1D::new("h", 2, 0.0, 2.0)], ..Default::default() };

        sender.send(&histo_configs, &[], &container).unwrap();
        sender.send(&histo_configs, &[], &container).unwrap();

        let mut reader = FramedReader::new(std::io::Cursor::new(buf));
        let first_header: Header = reader.read_record().unwrap().unwrap();
        assert_eq!(first_header.n_histo_configs, 1);
        let _cfg: HistoConfig = reader.read_record().unwrap().unwrap();
        let _first_container: HistoContainer = reader.read_record().unwrap().unwrap();

        let second_header: Header = reader.read_record().unwrap().unwrap();
        assert_eq!(second_header.n_histo_configs, 0);
        assert_eq!(second_header.n_canvas_configs, 0);
        let _second_container: HistoContainer = reader.read_record().unwrap().unwrap();
    }
}
