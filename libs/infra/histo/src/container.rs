// [libs/infra/histo/src/container.rs]
//! Wire types for one telemetry message: a batch of
//! histograms/profiles for a single timeslice, plus the one-time
//! histogram/canvas configuration records that precede the first batch.

use crate::histogram::{H1D, H2D, Prof1D, Prof2D};
use crate::metadata::{join_name_metadata, split_name_metadata};
use serde::{Deserialize, Serialize};

/// Describes one published histogram/profile's place in the display
/// hierarchy; sent once, ahead of any `HistoContainer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoConfig {
    /// Name under which this object is registered (matches `H1D::name` etc., sans metadata suffix).
    pub name: String,
    /// Display folder/group this object belongs to.
    pub folder: String,
}

/// Describes one canvas layout; sent once, ahead of any `HistoContainer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Canvas name, matching a [`crate::canvas::Canvas::name`].
    pub name: String,
    /// The canvas' DSL string.
    pub dsl: String,
}

/// Header preceding every message: how many configuration records follow
/// before the `HistoContainer` (zero on every message after the first, per
/// the "configs sent once then replaced by an empty frame" convention).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Header {
    /// Number of [`HistoConfig`] records following this header.
    pub n_histo_configs: u32,
    /// Number of [`CanvasConfig`] records following the histogram configs.
    pub n_canvas_configs: u32,
}

/// One timeslice's worth of histogram/profile content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoContainer {
    /// Timeslice index this batch was filled from, used by `StoreVsTsId` extensions.
    pub timeslice_id: u64,
    /// 1D histograms in this batch.
    pub h1d: Vec<H1D>,
    /// 2D histograms in this batch.
    pub h2d: Vec<H2D>,
    /// 1D profiles in this batch.
    pub prof1d: Vec<Prof1D>,
    /// 2D profiles in this batch.
    pub prof2d: Vec<Prof2D>,
}

impl HistoContainer {
    /// Splices each object's flags into its name (`name!hex`) for
    /// transmission, so the wire bytes carry the metadata convention
    /// described in [`crate::metadata`].
    #[must_use]
    pub fn to_wire(mut self) -> Self {
        for h in &mut self.h1d {
            h.name = join_name_metadata(&h.name, h.flags);
        }
        for h in &mut self.h2d {
            h.name = join_name_metadata(&h.name, h.flags);
        }
        for p in &mut self.prof1d {
            p.name = join_name_metadata(&p.name, p.flags);
        }
        for p in &mut self.prof2d {
            p.name = join_name_metadata(&p.name, p.flags);
        }
        self
    }

    /// Reverses [`Self::to_wire`]: splits each object's `name!hex` back
    /// into its bare name and flags.
    #[must_use]
    pub fn from_wire(mut self) -> Self {
        for h in &mut self.h1d {
            let (name, flags) = split_name_metadata(&h.name);
            h.name = name;
            if let Some(flags) = flags {
                h.flags = flags;
            }
        }
        for h in &mut self.h2d {
            let (name, flags) = split_name_metadata(&h.name);
            h.name = name;
            if let Some(flags) = flags {
                h.flags = flags;
            }
        }
        for p in &mut self.prof1d {
            let (name, flags) = split_name_metadata(&p.name);
            p.name = name;
            if let Some(flags) = flags {
                p.flags = flags;
            }
        }
        for p in &mut self.prof2d {
            let (name, flags) = split_name_metadata(&p.name);
            p.name = name;
            if let Some(flags) = flags {
                p.flags = flags;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::HistoFlags;

    #[test]
    fn to_wire_then_from_wire_restores_name_and_flags() {
        let mut h = H1D::new("sts_cluster_size", 4, 0.0, 4.0);
        h.flags.set(HistoFlags::STORE_VS_TS_ID);
        let container = HistoContainer { timeslice_id: 7, h1d: vec![h.clone()], ..Default::default() };

        let wired = container.clone().to_wire();
        assert_eq!(wired.h1d[0].name, "sts_cluster_size!1");

        let restored = wired.from_wire();
        assert_eq!(restored.h1d[0].name, "sts_cluster_size");
        assert!(restored.h1d[0].flags.contains(HistoFlags::STORE_VS_TS_ID));
    }

    #[test]
    fn unflagged_objects_keep_a_bare_name_on_the_wire() {
        let container = HistoContainer { h1d: vec![H1D::new("bmon_tot", 1, 0.0, 1.0)], ..Default::default() };
        let wired = container.to_wire();
        assert_eq!(wired.h1d[0].name, "bmon_tot");
    }
}
