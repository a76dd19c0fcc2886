// [apps/reco-driver/src/archive.rs]
//! The results archive: one framed, optionally zstd-compressed file holding
//! one [`reco_domain_model::RecoResults`] record per processed timeslice,
//! and the `--dump-archive` read-back that prints a short summary of each.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use reco_domain_model::RecoResults;
use reco_infra_transport::{FramedReader, FramedWriter};

/// Appends [`RecoResults`] records to the archive file, one frame per timeslice.
pub struct ArchiveWriter {
    inner: FramedWriter<BufWriter<File>>,
}

impl ArchiveWriter {
    /// Creates (or truncates) the archive file at `path`.
    pub fn create(path: &Path, compress: bool) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("creating results archive {}", path.display()))?;
        Ok(Self { inner: FramedWriter::new(BufWriter::new(file), compress) })
    }

    /// Appends one timeslice's results.
    pub fn write(&mut self, results: &RecoResults) -> Result<()> {
        self.inner.write_record(results).context("writing a results frame")
    }

    /// Flushes any buffered frames to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().context("flushing results archive")
    }
}

/// Reads back an archive written by [`ArchiveWriter`] and prints a short
/// per-timeslice summary to stdout: digi/cluster/hit/track counts per
/// subsystem.
pub fn dump_archive(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("archive path {} does not exist", path.display());
    }
    let file = File::open(path).with_context(|| format!("opening results archive {}", path.display()))?;
    let mut reader = FramedReader::new(BufReader::new(file));

    let mut n_timeslices = 0u64;
    while let Some(results) = reader.read_record::<RecoResults>().context("reading a results frame")? {
        n_timeslices += 1;
        println!(
            "ts={:>8} start_time={:>12} events={:>6} sts_hits={:>6} trd_hits={:>6} tof_hits={:>6} bmon_hits={:>6} tracks={:>6}",
            results.timeslice_id,
            results.start_time,
            results.digi_events.len(),
            results.sts.hits.n_elements(),
            results.trd.hits.n_elements(),
            results.tof.hits.n_elements(),
            results.bmon.hits.n_elements(),
            results.tracks.len(),
        );
    }
    println!("{n_timeslices} timeslices in {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_core_buckets::Partitioned;
    use reco_domain_model::{BMonSubsystemResults, StsSubsystemResults, TofSubsystemResults, TrdSubsystemResults};

    fn empty_results(timeslice_id: u64) -> RecoResults {
        RecoResults {
            timeslice_id,
            start_time: 0,
            digi_events: Vec::new(),
            sts: StsSubsystemResults { digis: Vec::new(), clusters: Partitioned::new(Vec::new(), &[], Vec::new()).unwrap(), hits: Partitioned::new(Vec::new(), &[], Vec::new()).unwrap() },
            trd: TrdSubsystemResults { digis: Vec::new(), clusters: Partitioned::new(Vec::new(), &[], Vec::new()).unwrap(), hits: Partitioned::new(Vec::new(), &[], Vec::new()).unwrap() },
            tof: TofSubsystemResults { digis: Vec::new(), hits: Partitioned::new(Vec::new(), &[], Vec::new()).unwrap() },
            bmon: BMonSubsystemResults { digis: Vec::new(), hits: Partitioned::new(Vec::new(), &[], Vec::new()).unwrap() },
            tracks: Vec::new(),
        }
    }

    #[test]
    fn a_written_archive_round_trips_through_dump() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.bin");

        let mut writer = ArchiveWriter::create(&path, false).unwrap();
        writer.write(&empty_results(1)).unwrap();
        writer.write(&empty_results(2)).unwrap();
        writer.flush().unwrap();

        assert!(dump_archive(&path).is_ok());
    }

    #[test]
    fn dumping_a_missing_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(dump_archive(&dir.path().join("missing.bin")).is_err());
    }
}
