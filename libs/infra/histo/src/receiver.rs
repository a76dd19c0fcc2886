// [libs/infra/histo/src/receiver.rs]
//! Background registry that merges incoming histogram telemetry by name.
//! A [`Receiver`] drains a framed source with a pull-with-timeout loop;
//! each decoded container is merged into a [`Registry`] keyed by object
//! name — new names are registered, existing ones have their bin
//! contents, squared weights, and total sums summed in. A decode failure
//! drops the offending message and continues, counted in
//! `reco_domain_model::TelemetryMonitor` rather than surfacing as an
//! error.

use crate::container::{CanvasConfig, Header, HistoConfig, HistoContainer};
use crate::histogram::{H1D, H2D, Prof1D, Prof2D};
use crate::metadata::HistoFlags;
use reco_domain_model::TelemetryMonitor;
use reco_infra_transport::{FramedReader, TransportError};
use std::collections::HashMap;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One registered histogram/profile, tagged by its concrete kind.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum HistoEntry {
    /// A 1D histogram.
    H1D(H1D),
    /// A 2D histogram.
    H2D(H2D),
    /// A 1D profile.
    Prof1D(Prof1D),
    /// A 2D profile.
    Prof2D(Prof2D),
}

/// Per-timeslice rows of a `StoreVsTsId` extension: the 1D content of a
/// histogram, written into the row keyed by the timeslice id it was
/// filled from, rather than merged away into a single bin.
#[derive(Debug, Clone, Default)]
struct TsIdExtension {
    n_bins: usize,
    rows: HashMap<u64, (Vec<f64>, Vec<f64>)>,
}

impl TsIdExtension {
    fn accumulate(&mut self, ts_id: u64, incoming: &H1D) {
        if self.rows.is_empty() && self.n_bins == 0 {
            self.n_bins = incoming.n_bins();
        }
        let row = self.rows.entry(ts_id).or_insert_with(|| (vec![0.0; self.n_bins], vec![0.0; self.n_bins]));
        for i in 0..self.n_bins {
            row.0[i] += incoming.bin_content(i);
            row.1[i] += incoming.bin_sum_w2(i);
        }
    }

    /// Row of `(bin_contents, bin_sum_w2)` for `ts_id`, if any data has been written to it.
    fn row(&self, ts_id: u64) -> Option<&(Vec<f64>, Vec<f64>)> {
        self.rows.get(&ts_id)
    }
}

/// The merge-by-name registry a [`Receiver`] feeds.
#[derive(Debug, Default)]
pub struct Registry {
    histograms: HashMap<String, HistoEntry>,
    ts_extensions: HashMap<String, TsIdExtension>,
    folders: HashMap<String, String>,
    canvases: HashMap<String, String>,
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a registered histogram/profile by its bare name.
    #[must_use]
    pub fn histogram(&self, name: &str) -> Option<&HistoEntry> {
        self.histograms.get(name)
    }

    /// The `StoreVsTsId` extension row for `name` at timeslice `ts_id`, if any.
    #[must_use]
    pub fn ts_id_row(&self, name: &str, ts_id: u64) -> Option<&(Vec<f64>, Vec<f64>)> {
        self.ts_extensions.get(name).and_then(|ext| ext.row(ts_id))
    }

    /// The DSL string of a registered canvas, if its `CanvasConfig` has arrived.
    #[must_use]
    pub fn canvas_dsl(&self, name: &str) -> Option<&str> {
        self.canvases.get(name).map(String::as_str)
    }

    /// Display folder a registered name was configured under.
    #[must_use]
    pub fn folder_of(&self, name: &str) -> Option<&str> {
        self.folders.get(name).map(String::as_str)
    }

    /// Names of every registered histogram/profile.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.histograms.keys()
    }

    /// Every registered `(name, entry)` pair, for a full export/dump.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &HistoEntry)> {
        self.histograms.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Names of every registered canvas.
    pub fn canvas_names(&self) -> impl Iterator<Item = &String> {
        self.canvases.keys()
    }

    /// Drops every registered histogram, profile, `StoreVsTsId` row, and
    /// canvas/folder assignment, returning the registry to its initial
    /// empty state. Used by the `/Reset_Hist` control endpoint.
    pub fn clear(&mut self) {
        self.histograms.clear();
        self.ts_extensions.clear();
        self.folders.clear();
        self.canvases.clear();
    }

    fn register_configs(&mut self, histo_configs: Vec<HistoConfig>, canvas_configs: Vec<CanvasConfig>) {
        for cfg in histo_configs {
            self.folders.insert(cfg.name, cfg.folder);
        }
        for cfg in canvas_configs {
            self.canvases.insert(cfg.name, cfg.dsl);
        }
    }

    /// Merges every object of `container` into the registry by name.
    pub fn merge(&mut self, container: HistoContainer) {
        let container = container.from_wire();
        let ts_id = container.timeslice_id;

        for h in container.h1d {
            if h.flags.contains(HistoFlags::STORE_VS_TS_ID) {
                self.ts_extensions.entry(h.name.clone()).or_default().accumulate(ts_id, &h);
            }
            match self.histograms.get_mut(&h.name) {
                Some(HistoEntry::H1D(existing)) => {
                    let _ = existing.merge(&h);
                }
                Some(_) => tracing::warn!(name = %h.name, "histogram kind mismatch on merge, dropping update"),
                None => {
                    self.histograms.insert(h.name.clone(), HistoEntry::H1D(h));
                }
            }
        }
        for h in container.h2d {
            match self.histograms.get_mut(&h.name) {
                Some(HistoEntry::H2D(existing)) => {
                    let _ = existing.merge(&h);
                }
                Some(_) => tracing::warn!(name = %h.name, "histogram kind mismatch on merge, dropping update"),
                None => {
                    self.histograms.insert(h.name.clone(), HistoEntry::H2D(h));
                }
            }
        }
        for p in container.prof1d {
            match self.histograms.get_mut(&p.name) {
                Some(HistoEntry::Prof1D(existing)) => {
                    let _ = existing.merge(&p);
                }
                Some(_) => tracing::warn!(name = %p.name, "histogram kind mismatch on merge, dropping update"),
                None => {
                    self.histograms.insert(p.name.clone(), HistoEntry::Prof1D(p));
                }
            }
        }
        for p in container.prof2d {
            match self.histograms.get_mut(&p.name) {
                Some(HistoEntry::Prof2D(existing)) => {
                    let _ = existing.merge(&p);
                }
                Some(_) => tracing::warn!(name = %p.name, "histogram kind mismatch on merge, dropping update"),
                None => {
                    self.histograms.insert(p.name.clone(), HistoEntry::Prof2D(p));
                }
            }
        }
    }
}

/// What happened on one iteration of the receive loop.
#[derive(Debug, PartialEq, Eq)]
pub enum PullOutcome {
    /// A container was read and merged successfully.
    Applied,
    /// A frame could not be decoded; the message was dropped.
    DecodeError,
    /// The read timed out; the caller should check its cancellation flag and retry.
    Timeout,
    /// The source reached a clean end of stream.
    Eof,
}

/// Drains a framed telemetry source into a shared [`Registry`].
pub struct Receiver {
    registry: Arc<Mutex<Registry>>,
    monitor: Arc<Mutex<TelemetryMonitor>>,
}

impl Default for Receiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Receiver {
    /// Creates a receiver over a fresh, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { registry: Arc::new(Mutex::new(Registry::new())), monitor: Arc::new(Mutex::new(TelemetryMonitor::default())) }
    }

    /// A handle to the shared registry, for read access from an HTTP handler
    /// or similar while the background pull loop keeps writing to it.
    #[must_use]
    pub fn registry(&self) -> Arc<Mutex<Registry>> {
        Arc::clone(&self.registry)
    }

    /// A snapshot of the decode-error/messages-applied counters.
    #[must_use]
    pub fn monitor_snapshot(&self) -> TelemetryMonitor {
        *self.monitor.lock().expect("telemetry monitor mutex poisoned")
    }

    /// Reads and merges exactly one message from `framed`. A read timeout
    /// (the source should be a reader with a configured read timeout, e.g.
    /// a `TcpStream`) is reported as [`PullOutcome::Timeout`] rather than a
    /// decode error, so the caller can check its cancellation flag and
    /// retry without inflating `decode_errors`.
    pub fn pull_once<R: Read>(&self, framed: &mut FramedReader<R>) -> PullOutcome {
        let header: Header = match framed.read_record() {
            Ok(Some(header)) => header,
            Ok(None) => return PullOutcome::Eof,
            Err(TransportError::Io(e)) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => return PullOutcome::Timeout,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode telemetry header, dropping message");
                self.monitor.lock().expect("telemetry monitor mutex poisoned").decode_errors += 1;
                return PullOutcome::DecodeError;
            }
        };

        match self.read_and_merge(framed, header) {
            Ok(()) => {
                self.monitor.lock().expect("telemetry monitor mutex poisoned").messages_applied += 1;
                PullOutcome::Applied
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode telemetry payload, dropping message");
                self.monitor.lock().expect("telemetry monitor mutex poisoned").decode_errors += 1;
                PullOutcome::DecodeError
            }
        }
    }

    fn read_and_merge<R: Read>(&self, framed: &mut FramedReader<R>, header: Header) -> crate::Result<()> {
        let mut histo_configs = Vec::with_capacity(header.n_histo_configs as usize);
        for _ in 0..header.n_histo_configs {
            histo_configs.push(framed.read_record::<HistoConfig>()?.ok_or_else(|| TransportError::Io(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated histo config")))?);
        }
        let mut canvas_configs = Vec::with_capacity(header.n_canvas_configs as usize);
        for _ in 0..header.n_canvas_configs {
            canvas_configs.push(framed.read_record::<CanvasConfig>()?.ok_or_else(|| TransportError::Io(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated canvas config")))?);
        }
        let container: HistoContainer = framed.read_record()?.ok_or_else(|| TransportError::Io(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated histo container")))?;

        let mut registry = self.registry.lock().expect("registry mutex poisoned");
        if !histo_configs.is_empty() || !canvas_configs.is_empty() {
            registry.register_configs(histo_configs, canvas_configs);
        }
        registry.merge(container);
        Ok(())
    }

    /// Pulls messages from `reader` until a clean EOF or `cancel` is set.
    /// Timeouts are silently retried; decode errors are logged and skipped.
    pub fn run_until_cancelled<R: Read>(&self, reader: &mut R, cancel: &AtomicBool) {
        let mut framed = FramedReader::new(reader);
        while !cancel.load(Ordering::Relaxed) {
            match self.pull_once(&mut framed) {
                PullOutcome::Eof => break,
                PullOutcome::Applied | PullOutcome::DecodeError | PullOutcome::Timeout => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::Sender;

    #[test]
    fn merging_a_new_name_registers_it() {
        let mut registry = Registry::new();
        let container = HistoContainer { timeslice_id: 0, h1d: vec![H1D::new("h", 2, 0.0, 2.0)], ..Default::default() };
        registry.merge(container);
        assert!(matches!(registry.histogram("h"), Some(HistoEntry::H1D(_))));
    }

    #[test]
    fn merging_an_existing_name_sums_bin_contents() {
        let mut registry = Registry::new();
        let mut h = H1D::new("h", 2, 0.0, 2.0);
        h.fill(0.5, 3.0);
        registry.merge(HistoContainer { h1d: vec![h.clone()], ..Default::default() });
        registry.merge(HistoContainer { h1d: vec![h], ..Default::default() });

        match registry.histogram("h") {
            Some(HistoEntry::H1D(h)) => assert_eq!(h.bin_content(0), 6.0),
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn store_vs_ts_id_keeps_one_row_per_timeslice_instead_of_merging_them_away() {
        let mut registry = Registry::new();
        let mut h = H1D::new("h", 1, 0.0, 1.0);
        h.flags.set(HistoFlags::STORE_VS_TS_ID);
        h.fill(0.5, 10.0);
        registry.merge(HistoContainer { timeslice_id: 1, h1d: vec![h.clone()], ..Default::default() });

        h.fill(0.5, 5.0);
        registry.merge(HistoContainer { timeslice_id: 2, h1d: vec![h], ..Default::default() });

        let row1 = registry.ts_id_row("h", 1).unwrap();
        let row2 = registry.ts_id_row("h", 2).unwrap();
        assert_eq!(row1.0[0], 10.0);
        assert_eq!(row2.0[0], 15.0);
    }

    #[test]
    fn end_to_end_send_then_pull_merges_into_the_registry() {
        let mut buf = Vec::new();
        {
            let mut sender = Sender::new(&mut buf, false);
            let configs = vec![HistoConfig { name: "h".to_string(), folder: "sts".to_string() }];
            let container = HistoContainer { h1d: vec![H1D::new("h", 2, 0.0, 2.0)], ..Default::default() };
            sender.send(&configs, &[], &container).unwrap();
        }

        let receiver = Receiver::new();
        let mut framed = FramedReader::new(std::io::Cursor::new(buf));
        let outcome = receiver.pull_once(&mut framed);
        assert_eq!(outcome, PullOutcome::Applied);

        let registry = receiver.registry();
        let registry = registry.lock().unwrap();
        assert!(registry.histogram("h").is_some());
        assert_eq!(registry.folder_of("h"), Some("sts"));
        assert_eq!(receiver.monitor_snapshot().messages_applied, 1);
    }

    #[test]
    fn a_clean_eof_is_reported_without_touching_the_monitor() {
        let receiver = Receiver::new();
        let mut framed = FramedReader::new(std::io::Cursor::new(Vec::<u8>::new()));
        assert_eq!(receiver.pull_once(&mut framed), PullOutcome::Eof);
        assert_eq!(receiver.monitor_snapshot().decode_errors, 0);
    }

    #[test]
    fn a_truncated_message_is_reported_as_a_decode_error() {
        let receiver = Receiver::new();
        let mut buf = Vec::new();
        reco_infra_transport::write_frame(&mut buf, &Header { n_histo_configs: 1, n_canvas_configs: 0 }, false).unwrap();

        let mut framed = FramedReader::new(std::io::Cursor::new(buf));
        assert_eq!(receiver.pull_once(&mut framed), PullOutcome::DecodeError);
        assert_eq!(receiver.monitor_snapshot().decode_errors, 1);
    }
}
