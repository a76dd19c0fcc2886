// [apps/reco-driver/src/timeslice.rs]
//! Input timeslice source: a directory of framed records (one
//! [`crate::model::RawTimeslice`] per frame, oldest-file-first then
//! in-file order), read through the same length-prefixed, optionally
//! zstd-compressed framing the results archive writes with.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reco_infra_transport::FramedReader;

use crate::model::RawTimeslice;

/// Pulls timeslices, in order, from every regular file directly under a
/// directory (or from a single file, treated as a one-entry directory).
pub struct TimesliceSource {
    files: Vec<PathBuf>,
    next_file: usize,
    current: Option<FramedReader<BufReader<File>>>,
}

impl TimesliceSource {
    /// Opens a source rooted at `path`. If `path` is a directory, its
    /// regular files are visited in lexicographic order; if it is a file,
    /// that single file is the whole source.
    pub fn open(path: &Path) -> Result<Self> {
        let mut files = if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("reading input directory {}", path.display()))?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.is_file())
                .collect();
            entries.sort();
            entries
        } else {
            vec![path.to_path_buf()]
        };
        files.reverse();
        Ok(Self { files, next_file: 0, current: None })
    }

    /// Returns the next timeslice, or `Ok(None)` once every input file is
    /// exhausted.
    pub fn next_timeslice(&mut self) -> Result<Option<RawTimeslice>> {
        loop {
            if self.current.is_none() {
                let Some(path) = self.files.pop() else {
                    return Ok(None);
                };
                self.next_file += 1;
                let file = File::open(&path).with_context(|| format!("opening input file {}", path.display()))?;
                self.current = Some(FramedReader::new(BufReader::new(file)));
            }

            let reader = self.current.as_mut().expect("just ensured Some");
            match reader.read_record::<RawTimeslice>().context("reading a timeslice frame")? {
                Some(ts) => return Ok(Some(ts)),
                None => self.current = None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_infra_transport::FramedWriter;
    use std::io::BufWriter;

    #[test]
    fn reads_every_timeslice_across_multiple_files_in_order() {
        let dir = tempfile::tempdir().unwrap();

        for (file_index, ts_ids) in [(0u64, [1u64, 2u64]), (1, [3, 4])] {
            let path = dir.path().join(format!("{file_index:04}.bin"));
            let file = File::create(&path).unwrap();
            let mut writer = FramedWriter::new(BufWriter::new(file), false);
            for ts_id in ts_ids {
                writer.write_record(&RawTimeslice { timeslice_id: ts_id, ..Default::default() }).unwrap();
            }
            writer.flush().unwrap();
        }

        let mut source = TimesliceSource::open(dir.path()).unwrap();
        let mut ids = Vec::new();
        while let Some(ts) = source.next_timeslice().unwrap() {
            ids.push(ts.timeslice_id);
        }
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn an_empty_directory_yields_no_timeslices() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = TimesliceSource::open(dir.path()).unwrap();
        assert!(source.next_timeslice().unwrap().is_none());
    }
}
