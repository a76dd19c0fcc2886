// [apps/reco-driver/src/pipeline.rs]
//! The per-timeslice driver: owns every detector's persistent setup and
//! reconstructor state, dispatches one timeslice's raw digis through
//! calibration/cluster/hit finding via [`HitFinderOrchestrator`], and
//! assembles the result into one [`RecoResults`].
//!
//! STS, TOF and BMon are stateless across timeslices — every module/RPC/
//! diamond is reprocessed from its own raw digis each call — so their jobs
//! are dispatched through [`HitFinderOrchestrator::dispatch`] with owned,
//! `'static` closures: each job clones its setup handle out of an `Arc`.
//! The TRD reconstructors are not stateless: a module's pad rows carry
//! cluster fragments across timeslice boundaries, so they are held here as
//! persistent `&mut` state and driven through
//! [`HitFinderOrchestrator::install`] instead, inside a `rayon` parallel
//! iterator over the reconstructor slice.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use reco_core_buckets::Partitioned;
use reco_domain_detectors::bmon::BMonSetup;
use reco_domain_detectors::sts::StsPipeline;
use reco_domain_detectors::tof::RpcSetup;
use reco_domain_detectors::trd1d::Trd1DReconstructor;
use reco_domain_detectors::trd2d::Trd2DReconstructor;
use reco_domain_detectors::{HitFinderOrchestrator, PartitionJob, StageTimings};
use reco_domain_model::{
    BMonHit, BMonSubsystemResults, CalibrationMonitor, DetectorAddress, Digi, DigiEvent, RecoResults, StsCluster, StsHit, StsMonitor,
    StsSubsystemResults, Subsystem, TofHit, TofSubsystemResults, Track, TrdCluster, TrdHit, TrdMonitor, TrdSubsystemResults,
};

use crate::config::RunParameters;
use crate::errors::DriverError;
use crate::model::RawTimeslice;

/// Half-width of the time window the digi-event assembler (stage 7) groups
/// STS digis into around a trigger time. Not named by any per-run parameter
/// block; chosen as a round multiple of the STS connector window
/// (`time_cut_digi_abs`, typically single digits) so that digis belonging
/// to the same physical interaction fall in the same event without
/// requiring a dedicated trigger detector.
const DIGI_EVENT_TIME_WINDOW: u32 = 100;

/// Diagnostics accumulated while processing one timeslice, aggregated
/// across every module/RPC/diamond dispatched during that call.
#[derive(Debug, Clone, Default)]
pub struct PipelineMonitors {
    /// STS pipeline monitor, summed across every module.
    pub sts: StsMonitor,
    /// TRD reconstructor monitor, summed across every TRD-2D and TRD-1D module.
    pub trd: TrdMonitor,
    /// TOF calibration monitor, summed across every RPC.
    pub tof_calibration: CalibrationMonitor,
    /// BMon calibration monitor, summed across every diamond.
    pub bmon_calibration: CalibrationMonitor,
    /// Per-stage wall time, populated when `--collect-kernel-times` is set.
    pub stage_timings: StageTimings,
}

fn merge_calibration(into: &mut CalibrationMonitor, other: CalibrationMonitor) {
    into.processed += other.processed;
    into.dropped_unknown_rpc += other.dropped_unknown_rpc;
    into.dropped_deadtime += other.dropped_deadtime;
    into.wall_time += other.wall_time;
    into.bytes += other.bytes;
}

fn merge_sts(into: &mut StsMonitor, other: StsMonitor) {
    into.cluster_bucket_overflow += other.cluster_bucket_overflow;
    into.hit_bucket_overflow += other.hit_bucket_overflow;
    into.monster_event_guard_triggered += other.monster_event_guard_triggered;
    into.wall_time += other.wall_time;
}

fn merge_trd(into: &mut TrdMonitor, other: &TrdMonitor) {
    into.unclassified_clusters += other.unclassified_clusters;
    into.prf_fit_failures += other.prf_fit_failures;
    into.cross_row_merges += other.cross_row_merges;
    into.wall_time += other.wall_time;
}

/// Groups `digis` into `n_buckets` vectors keyed by `DetectorAddress::module()`.
/// A digi whose module index falls outside `0..n_buckets` is dropped: it
/// belongs to a module this run's parameter block never configured.
fn bucket_by_module(digis: &[Digi], n_buckets: usize) -> Vec<Vec<Digi>> {
    let mut buckets = vec![Vec::new(); n_buckets];
    for digi in digis {
        if let Some(bucket) = buckets.get_mut(digi.address.module() as usize) {
            bucket.push(*digi);
        }
    }
    buckets
}

/// One persistent TRD module: its reconstructor plus the identity it
/// contributes to the stitched `Partitioned` container.
struct TrdModule<R> {
    module_index: u16,
    address: u64,
    reconstructor: R,
}

/// Groups `digis` into one bucket per configured TRD module, keyed by the
/// module's own `module_index`. A digi belonging to no configured module is dropped.
fn bucket_by_trd_module<R>(digis: &[Digi], modules: &[TrdModule<R>]) -> Vec<Vec<Digi>> {
    let index_of: HashMap<u16, usize> = modules.iter().enumerate().map(|(i, m)| (m.module_index, i)).collect();
    let mut buckets = vec![Vec::new(); modules.len()];
    for digi in digis {
        if let Some(&i) = index_of.get(&digi.address.module()) {
            buckets[i].push(*digi);
        }
    }
    buckets
}

type TrdModuleOutput = (u64, Vec<Digi>, Vec<TrdCluster>, Vec<TrdHit>, TrdMonitor);

/// Drives one TRD-2D module's add-digi/find-clusters/make-hit/post-process
/// sequence over its bucket of raw digis, draining every cluster the
/// reconstructor finishes this call.
fn run_trd2d_module(module: &mut TrdModule<Trd2DReconstructor>, digis: Vec<Digi>) -> TrdModuleOutput {
    let mut monitor = TrdMonitor::default();
    for (digi_index, digi) in digis.iter().enumerate() {
        let row = digi.address.sensor() as u8;
        let channel = digi.address.channel() as u16;
        module.reconstructor.add_digi(digi_index as u32, row, channel, &digis);
    }
    let current_time = digis.iter().map(|d| d.time).max().unwrap_or(0);
    module.reconstructor.find_clusters(current_time);
    module.reconstructor.flush_all();
    let clusters = module.reconstructor.take_finished();

    let hits: Vec<TrdHit> =
        clusters.iter().enumerate().filter_map(|(i, cluster)| module.reconstructor.make_hit(cluster, i as u32, &digis, &mut monitor)).collect();
    let hits = module.reconstructor.merge_cross_row(hits, &mut monitor);
    (module.address, digis, clusters, hits, monitor)
}

/// Drives one TRD-1D module's add-digi/row-merge/find-clusters/make-hit
/// sequence over its bucket of raw digis, draining every cluster the
/// reconstructor finishes this call.
fn run_trd1d_module(module: &mut TrdModule<Trd1DReconstructor>, digis: Vec<Digi>) -> TrdModuleOutput {
    let mut monitor = TrdMonitor::default();
    for (digi_index, digi) in digis.iter().enumerate() {
        let row = digi.address.sensor() as u8;
        let channel = digi.address.channel() as u16;
        module.reconstructor.add_digi(digi_index as u32, row, channel, &digis);
    }
    module.reconstructor.merge_rows_two_sweep(&mut monitor);
    module.reconstructor.merge_module_wide(&mut monitor);
    let current_time = digis.iter().map(|d| d.time).max().unwrap_or(0);
    module.reconstructor.find_clusters(current_time);
    module.reconstructor.flush_all();
    let clusters = module.reconstructor.take_finished();

    let hits: Vec<TrdHit> =
        clusters.iter().enumerate().filter_map(|(i, cluster)| module.reconstructor.make_hit(cluster, i as u32, &digis, &mut monitor)).collect();
    (module.address, digis, clusters, hits, monitor)
}

/// Owns every detector's setup and reconstructor state for the lifetime of
/// a run, and turns one [`RawTimeslice`] into one [`RecoResults`].
pub struct Pipeline {
    sts: Arc<StsPipeline>,
    tof: Arc<RpcSetup>,
    tof_addresses: Vec<(u16, u16)>,
    bmon: Arc<BMonSetup>,
    trd2d: Vec<TrdModule<Trd2DReconstructor>>,
    trd1d: Vec<TrdModule<Trd1DReconstructor>>,
    orchestrator: HitFinderOrchestrator,
}

impl Pipeline {
    /// Builds the pipeline from a run's calibration parameters and an
    /// already-constructed orchestrator.
    ///
    /// # Errors
    /// Returns [`DriverError::DetectorSetup`] if the TOF or BMon setup
    /// tables fail their own construction invariant.
    pub fn new(params: RunParameters, orchestrator: HitFinderOrchestrator) -> Result<Self, DriverError> {
        let sts = Arc::new(StsPipeline::new(params.sts.modules, params.sts.n_channels_per_side));

        let tof_addresses = params.tof.addresses.clone();
        let tof = Arc::new(
            RpcSetup::new(params.tof.modules, params.tof.addresses)
                .map_err(|source| DriverError::DetectorSetup { detector: "tof", source: Box::new(source) })?,
        );

        let bmon = Arc::new(
            BMonSetup::new(params.bmon.diamonds, params.bmon.selection_mask)
                .map_err(|source| DriverError::DetectorSetup { detector: "bmon", source: Box::new(source) })?,
        );

        let trd2d = params
            .trd2d
            .into_iter()
            .map(|m| TrdModule {
                module_index: m.module_index,
                address: DetectorAddress::pack(Subsystem::Trd, m.module_index, 0, 0).as_u64(),
                reconstructor: Trd2DReconstructor::new(m.n_rows, m.geometry, m.transform, m.keep_window, m.sys_correction),
            })
            .collect();

        let trd1d = params
            .trd1d
            .into_iter()
            .map(|m| TrdModule {
                module_index: m.module_index,
                address: DetectorAddress::pack(Subsystem::Trd, m.module_index, 1, 0).as_u64(),
                reconstructor: Trd1DReconstructor::new(m.n_rows, m.geometry, m.transform, m.keep_window),
            })
            .collect();

        Ok(Self { sts, tof, tof_addresses, bmon, trd2d, trd1d, orchestrator })
    }

    /// Runs every detector's calibration/cluster/hit finding over one
    /// timeslice's raw digis and assembles the aggregated [`RecoResults`].
    pub fn process_timeslice(&mut self, raw: RawTimeslice) -> (RecoResults, PipelineMonitors) {
        let mut monitors = PipelineMonitors::default();

        let (sts_digis, sts_clusters, sts_hits) = self.process_sts(&raw.sts_digis, &mut monitors);
        let (tof_digis, tof_hits) = self.process_tof(&raw.tof_digis, &mut monitors);
        let (bmon_digis, bmon_hits) = self.process_bmon(&raw.bmon_digis, &mut monitors);
        let (trd_digis, trd_clusters, trd_hits) = self.process_trd(&raw.trd_digis, &mut monitors);

        let digi_events = assemble_digi_events(&sts_digis);

        let results = RecoResults {
            timeslice_id: raw.timeslice_id,
            start_time: raw.start_time,
            digi_events,
            sts: StsSubsystemResults { digis: sts_digis, clusters: sts_clusters, hits: sts_hits },
            trd: TrdSubsystemResults { digis: trd_digis, clusters: trd_clusters, hits: trd_hits },
            tof: TofSubsystemResults { digis: tof_digis, hits: tof_hits },
            bmon: BMonSubsystemResults { digis: bmon_digis, hits: bmon_hits },
            tracks: Vec::<Track>::new(),
        };
        (results, monitors)
    }

    fn process_sts(&self, raw_digis: &[Digi], monitors: &mut PipelineMonitors) -> (Vec<Digi>, Partitioned<StsCluster>, Partitioned<StsHit>) {
        let n_modules = self.sts.n_modules();
        let buckets = bucket_by_module(raw_digis, n_modules);
        let flat_digis: Vec<Digi> = buckets.iter().flatten().copied().collect();

        let jobs = buckets
            .into_iter()
            .enumerate()
            .map(|(module_index, digis)| {
                let sts = Arc::clone(&self.sts);
                let address = DetectorAddress::pack(Subsystem::Sts, module_index as u16, 0, 0).as_u64();
                PartitionJob::new(address, move || sts.process_module(module_index, &digis))
            })
            .collect();

        let (results, elapsed) = self.orchestrator.dispatch(jobs);
        monitors.stage_timings.sts = elapsed;

        let mut cluster_fragments = Vec::with_capacity(results.len());
        let mut hit_fragments = Vec::with_capacity(results.len());
        for (address, (output, module_monitor)) in results {
            merge_sts(&mut monitors.sts, module_monitor);
            cluster_fragments.push((address, output.clusters));
            hit_fragments.push((address, output.hits));
        }

        let clusters = HitFinderOrchestrator::stitch_results(cluster_fragments).expect("STS module addresses are unique by construction");
        let hits = HitFinderOrchestrator::stitch_results(hit_fragments).expect("STS module addresses are unique by construction");
        (flat_digis, clusters, hits)
    }

    fn process_tof(&self, raw_digis: &[Digi], monitors: &mut PipelineMonitors) -> (Vec<Digi>, Partitioned<TofHit>) {
        let n_rpcs = self.tof.n_rpcs();
        let raw_digis_owned: Vec<Digi> = raw_digis.to_vec();

        let jobs = (0..n_rpcs)
            .map(|rpc_index| {
                let tof = Arc::clone(&self.tof);
                let digis = raw_digis_owned.clone();
                let (super_module, rpc) = self.tof_addresses[rpc_index];
                let address = tof.rpc_address(rpc_index, super_module, rpc);
                PartitionJob::new(address, move || {
                    let (calibrated, cal_monitor) = tof.calibrate_rpc(rpc_index, &digis);
                    let hits = tof.find_hits(rpc_index, &calibrated);
                    (calibrated, hits, cal_monitor)
                })
            })
            .collect();

        let (results, elapsed) = self.orchestrator.dispatch(jobs);
        monitors.stage_timings.tof = elapsed;

        let mut flat_digis = Vec::new();
        let mut hit_fragments = Vec::with_capacity(results.len());
        for (address, (calibrated, hits, cal_monitor)) in results {
            merge_calibration(&mut monitors.tof_calibration, cal_monitor);
            flat_digis.extend(calibrated);
            hit_fragments.push((address, hits));
        }

        let hits = HitFinderOrchestrator::stitch_results(hit_fragments).expect("TOF RPC addresses are unique by construction");
        (flat_digis, hits)
    }

    fn process_bmon(&self, raw_digis: &[Digi], monitors: &mut PipelineMonitors) -> (Vec<Digi>, Partitioned<BMonHit>) {
        let n_diamonds = self.bmon.n_diamonds();
        let raw_digis_owned: Vec<Digi> = raw_digis.to_vec();

        let jobs = (0..n_diamonds)
            .map(|diamond_position| {
                let bmon = Arc::clone(&self.bmon);
                let digis = raw_digis_owned.clone();
                let address = bmon.diamond_address(diamond_position);
                PartitionJob::new(address, move || {
                    let (calibrated, cal_monitor) = bmon.calibrate_diamond(diamond_position, &digis);
                    let hits = bmon.find_hits(diamond_position, &calibrated);
                    (calibrated, hits, cal_monitor)
                })
            })
            .collect();

        let (results, elapsed) = self.orchestrator.dispatch(jobs);
        monitors.stage_timings.bmon = elapsed;

        let mut flat_digis = Vec::new();
        let mut hit_fragments = Vec::with_capacity(results.len());
        for (address, (calibrated, hits, cal_monitor)) in results {
            merge_calibration(&mut monitors.bmon_calibration, cal_monitor);
            flat_digis.extend(calibrated);
            hit_fragments.push((address, hits));
        }

        let hits = HitFinderOrchestrator::stitch_results(hit_fragments).expect("BMon diamond addresses are unique by construction");
        (flat_digis, hits)
    }

    fn process_trd(&mut self, raw_digis: &[Digi], monitors: &mut PipelineMonitors) -> (Vec<Digi>, Partitioned<TrdCluster>, Partitioned<TrdHit>) {
        let buckets2d = bucket_by_trd_module(raw_digis, &self.trd2d);
        let buckets1d = bucket_by_trd_module(raw_digis, &self.trd1d);
        let collect_times = self.orchestrator.collects_kernel_times();

        let trd2d = &mut self.trd2d;
        let start = collect_times.then(Instant::now);
        let trd2d_out: Vec<TrdModuleOutput> =
            self.orchestrator.install(|| trd2d.par_iter_mut().zip(buckets2d.into_par_iter()).map(|(m, d)| run_trd2d_module(m, d)).collect());
        if let Some(start) = start {
            monitors.stage_timings.trd2d = Some(start.elapsed());
        }

        let trd1d = &mut self.trd1d;
        let start = collect_times.then(Instant::now);
        let trd1d_out: Vec<TrdModuleOutput> =
            self.orchestrator.install(|| trd1d.par_iter_mut().zip(buckets1d.into_par_iter()).map(|(m, d)| run_trd1d_module(m, d)).collect());
        if let Some(start) = start {
            monitors.stage_timings.trd1d = Some(start.elapsed());
        }

        let mut flat_digis = Vec::new();
        let mut cluster_fragments = Vec::new();
        let mut hit_fragments = Vec::new();
        for (address, digis, clusters, hits, module_monitor) in trd2d_out.into_iter().chain(trd1d_out) {
            merge_trd(&mut monitors.trd, &module_monitor);
            flat_digis.extend(digis);
            cluster_fragments.push((address, clusters));
            hit_fragments.push((address, hits));
        }

        let clusters = HitFinderOrchestrator::stitch_results(cluster_fragments).expect("TRD module addresses are unique by construction");
        let hits = HitFinderOrchestrator::stitch_results(hit_fragments).expect("TRD module addresses are unique by construction");
        (flat_digis, clusters, hits)
    }
}

/// Stage 7, digi-event assembly: groups STS digis into contiguous events by
/// a time window around each event's first (earliest) digi, taken as its
/// trigger time. STS is the richest trigger-time source of the four
/// subsystems and the only one this assembler draws from — `DigiEvent`
/// carries one flat `digi_indices` list, which cannot unambiguously address
/// more than one subsystem's separate `digis` array without a wire-format
/// change this workspace does not make.
fn assemble_digi_events(sts_digis: &[Digi]) -> Vec<DigiEvent> {
    if sts_digis.is_empty() {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..sts_digis.len()).collect();
    order.sort_unstable_by_key(|&i| sts_digis[i].time);

    let mut events = Vec::new();
    let mut trigger_time = sts_digis[order[0]].time;
    let mut current = vec![order[0] as u32];

    for &i in &order[1..] {
        let time = sts_digis[i].time;
        if time.abs_diff(trigger_time) <= DIGI_EVENT_TIME_WINDOW {
            current.push(i as u32);
        } else {
            events.push(DigiEvent { trigger_time, digi_indices: std::mem::take(&mut current) });
            trigger_time = time;
            current.push(i as u32);
        }
    }
    events.push(DigiEvent { trigger_time, digi_indices: current });
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_domain_model::TriggerKind;

    fn digi(time: u32) -> Digi {
        Digi { address: DetectorAddress::pack(Subsystem::Sts, 0, 0, 0), time, charge_or_tot: 1.0, trigger: TriggerKind::SelfTriggered }
    }

    #[test]
    fn empty_input_yields_no_events() {
        assert!(assemble_digi_events(&[]).is_empty());
    }

    #[test]
    fn digis_within_the_window_share_one_event() {
        let digis = vec![digi(10), digi(50), digi(90)];
        let events = assemble_digi_events(&digis);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].digi_indices.len(), 3);
    }

    #[test]
    fn digis_far_apart_split_into_separate_events() {
        let digis = vec![digi(0), digi(10_000)];
        let events = assemble_digi_events(&digis);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].digi_indices, vec![0]);
        assert_eq!(events[1].digi_indices, vec![1]);
    }

    #[test]
    fn events_are_emitted_in_time_order_regardless_of_input_order() {
        let digis = vec![digi(10_000), digi(0)];
        let events = assemble_digi_events(&digis);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].trigger_time, 0);
        assert_eq!(events[1].trigger_time, 10_000);
    }
}
