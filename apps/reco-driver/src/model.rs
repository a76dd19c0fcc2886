// [apps/reco-driver/src/model.rs]
//! The wire shape of one input timeslice: a timestamped batch of raw digis
//! from every subsystem's front-end, grouped ahead of calibration/cluster
//! finding. This is the unit a [`crate::timeslice::TimesliceSource`] yields
//! and the unit [`crate::pipeline::Pipeline::process_timeslice`] consumes.

use reco_domain_model::Digi;
use serde::{Deserialize, Serialize};

/// One timeslice's raw digis, already split by subsystem but not yet
/// grouped by module/RPC/diamond — that grouping happens per-subsystem
/// inside [`crate::pipeline`], mirroring how each detector's own setup type
/// (`StsPipeline`, `RpcSetup`, `BMonSetup`) owns that routing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTimeslice {
    /// Identifier of this timeslice, carried through to [`reco_domain_model::RecoResults`].
    pub timeslice_id: u64,
    /// Start time of this timeslice, in the native time unit.
    pub start_time: u64,
    /// Raw STS digis of this timeslice, any module/side.
    pub sts_digis: Vec<Digi>,
    /// Raw TRD digis of this timeslice, any module/row.
    pub trd_digis: Vec<Digi>,
    /// Raw TOF digis of this timeslice, any RPC.
    pub tof_digis: Vec<Digi>,
    /// Raw BMon digis of this timeslice, any diamond.
    pub bmon_digis: Vec<Digi>,
}
