// [libs/domain/detectors/src/trd2d.rs]
//! Reconstructor TRD-2D (pad-plane triangular/rectangular): acumulador de
//! cúmulos por fila, fusión de fragmentos adyacentes, clasificación de
//! topología y ajuste gaussiano de PRF, y fusión entre filas vecinas en
//! post-procesamiento.
//!
//! Grounded on `reco/detectors/trd/CbmTrdModuleRec2D.cxx`'s
//! `AddDigi`/`FindClusters`/`MakeHit`/`PostProcess` sequence. Un módulo se
//! procesa con un único hilo; el paralelismo de este reconstructor vive a
//! nivel de módulo, orquestado por `crate::orchestrator`.

use reco_core_math::{fit_gaussian_prf, integrate_prf, GlobalTransform, PadTriplet, SysCorrectionTable};
use reco_domain_model::{Digi, HitCommon, TrdCluster, TrdClusterFlags, TrdHit, TrdMonitor};

/// Ventana de tiempo dentro de la cual un digi puede extender un cúmulo en
/// construcción en su misma fila.
const ADD_DIGI_TIME_WINDOW: u32 = 5;

/// Ventana temporal de fusión entre filas vecinas en post-procesamiento.
const CROSS_ROW_TIME_MIN: u32 = 4_000;
const CROSS_ROW_TIME_MAX: u32 = 10_000;

/// Bit de [`TrdClusterFlags::fasp_type`] para el canal T del par FASP.
const FASP_T_BIT: u8 = 0b01;
/// Bit de [`TrdClusterFlags::fasp_type`] para el canal R del par FASP.
const FASP_R_BIT: u8 = 0b10;

/// Decodifica el canal crudo de un digi en su par FASP `(chT, chR)`: el pad
/// (columna) al que pertenece y cuál de los dos canales del par disparó.
/// Por convención el canal par es `chT` y el impar `chR` (un pad triangular
/// = un par de canales consecutivos).
fn fasp_pad_and_bit(channel: u16) -> (u16, u8) {
    (channel / 2, if channel % 2 == 0 { FASP_T_BIT } else { FASP_R_BIT })
}

/// Clasificación topológica de un cúmulo TRD-2D por su patrón de canales
/// FASP (§4.5): cada columna del cúmulo es un pad triangular cuyo canal T,
/// R, o ambos, depositó carga.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClusterTopology {
    /// Una sola columna: disparó su canal T o su canal R (T/R).
    Size1,
    /// Dos columnas adyacentes, en orden T-R o R-T (TR/RT).
    Size2,
    /// Tres columnas T-R-T o R-T-R; `symmetric` distingue si las cargas de
    /// las columnas externas son aproximadamente iguales.
    Size3 { symmetric: bool },
    /// Cuatro columnas o más: ruta genérica (ventana de 3 pads + ajuste PRF).
    Generic,
}

/// Tolerancia relativa para considerar simétrico un cúmulo de tamaño 3: las
/// cargas de las columnas externas deben diferir en menos de este fraction
/// de la mayor de las dos.
const SIZE3_SYMMETRY_TOLERANCE: f32 = 0.1;

fn classify_topology(n_cols: usize, charge_by_col: &[f32]) -> ClusterTopology {
    match n_cols {
        0 | 1 => ClusterTopology::Size1,
        2 => ClusterTopology::Size2,
        3 => {
            let outer_left = charge_by_col[0];
            let outer_right = charge_by_col[2];
            let largest = outer_left.max(outer_right);
            let symmetric = largest <= 0.0 || (outer_left - outer_right).abs() <= SIZE3_SYMMETRY_TOLERANCE * largest;
            ClusterTopology::Size3 { symmetric }
        }
        _ => ClusterTopology::Generic,
    }
}

/// Geometría de pad plano TRD: ancho/alto de pad y la transformación del
/// módulo al sistema de coordenadas global.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct TrdPadGeometry {
    /// Ancho de un pad, en unidades físicas.
    pub pad_width: f32,
    /// Alto de un pad (separación entre filas), en unidades físicas.
    pub pad_height: f32,
}

/// Reconstructor TRD-2D de un único módulo: mantiene cúmulos en
/// construcción por fila y los cúmulos ya finalizados.
pub struct Trd2DReconstructor {
    geometry: TrdPadGeometry,
    transform: GlobalTransform,
    keep_window: u32,
    sys_correction: SysCorrectionTable,
    rows: Vec<Vec<TrdCluster>>,
    finished: Vec<TrdCluster>,
}

impl Trd2DReconstructor {
    /// Crea un reconstructor vacío para `n_rows` filas de pad-plane, con
    /// tabla de corrección SYS propia (ver `SysCorrectionTable::identity`
    /// para módulos sin calibración SYS).
    #[must_use]
    pub fn new(n_rows: usize, geometry: TrdPadGeometry, transform: GlobalTransform, keep_window: u32, sys_correction: SysCorrectionTable) -> Self {
        Self { geometry, transform, keep_window, sys_correction, rows: vec![Vec::new(); n_rows], finished: Vec::new() }
    }

    /// **Add-digi**: extiende un cúmulo existente en la fila del digi si
    /// está dentro de la ventana temporal y el pad del par FASP
    /// `(chT, chR)` del digi está dentro de su huella, o crea uno nuevo en
    /// caso contrario. `start_channel`/`n_cols` indexan pads (un pad = un
    /// par de canales), no canales crudos.
    pub fn add_digi(&mut self, digi_index: u32, row: u8, channel: u16, digis: &[Digi]) {
        let digi = &digis[digi_index as usize];
        let (pad, bit) = fasp_pad_and_bit(channel);
        let row_clusters = &mut self.rows[row as usize];

        for cluster in row_clusters.iter_mut() {
            let footprint_end = cluster.start_channel + cluster.n_cols;
            let in_range = pad >= cluster.start_channel && pad <= footprint_end;
            if in_range && digi.time.abs_diff(cluster.start_time) < ADD_DIGI_TIME_WINDOW {
                if pad == footprint_end {
                    cluster.n_cols += 1;
                }
                cluster.start_time = cluster.start_time.min(digi.time);
                cluster.digi_indices.push(digi_index);
                cluster.flags.fasp_type |= bit;
                return;
            }
        }

        row_clusters.push(TrdCluster {
            row,
            flags: TrdClusterFlags { fasp_type: bit, has_start: true, has_stop: true },
            n_cols: 1,
            start_channel: pad,
            start_time: digi.time,
            digi_indices: vec![digi_index],
        });
    }

    /// **Find-clusters**: fusiona fragmentos adyacentes de la misma fila
    /// (`TrdCluster::is_mergeable_with`) y mueve a `finished` los que ya
    /// superaron la ventana de retención.
    pub fn find_clusters(&mut self, current_time: u32) {
        for row_clusters in &mut self.rows {
            let mut merged_any = true;
            while merged_any {
                merged_any = false;
                'outer: for i in 0..row_clusters.len() {
                    for j in (i + 1)..row_clusters.len() {
                        if row_clusters[i].is_mergeable_with(&row_clusters[j]) {
                            let other = row_clusters.remove(j);
                            let target = &mut row_clusters[i];
                            target.n_cols = (target.start_channel + target.n_cols).max(other.start_channel + other.n_cols)
                                - target.start_channel.min(other.start_channel);
                            target.start_channel = target.start_channel.min(other.start_channel);
                            target.start_time = target.start_time.min(other.start_time);
                            target.flags.fasp_type |= other.flags.fasp_type;
                            target.digi_indices.extend(other.digi_indices);
                            merged_any = true;
                            break 'outer;
                        }
                    }
                }
            }

            let keep_window = self.keep_window;
            let mut retained = Vec::new();
            for cluster in row_clusters.drain(..) {
                if current_time.saturating_sub(cluster.start_time) > keep_window {
                    self.finished.push(cluster);
                } else {
                    retained.push(cluster);
                }
            }
            *row_clusters = retained;
        }
    }

    /// Drena todos los cúmulos en construcción hacia `finished`,
    /// incondicionalmente (se llama al final del timeslice).
    pub fn flush_all(&mut self) {
        for row_clusters in &mut self.rows {
            self.finished.append(row_clusters);
        }
    }

    /// Los cúmulos finalizados hasta ahora.
    #[must_use]
    pub fn clusters(&self) -> &[TrdCluster] {
        &self.finished
    }

    /// Drena los cúmulos finalizados acumulados hasta ahora, dejando el
    /// reconstructor listo para el próximo timeslice sin perder el estado
    /// de las filas en construcción (`rows` persiste entre llamadas).
    pub fn take_finished(&mut self) -> Vec<TrdCluster> {
        std::mem::take(&mut self.finished)
    }

    /// **Make-hit**: clasifica la topología del cúmulo por su patrón de
    /// canales FASP T/R (tamaño 1/2/3 simétrico-asimétrico/genérico),
    /// ajusta una PRF gaussiana para los casos que lo requieren, corrige el
    /// sesgo de posición vía la tabla SYS indexada por `|dx|`, y produce un
    /// hit con posición, energía y tiempo.
    #[must_use]
    pub fn make_hit(&self, cluster: &TrdCluster, cluster_index: u32, digis: &[Digi], monitor: &mut TrdMonitor) -> Option<TrdHit> {
        let n_cols = cluster.n_cols as usize;
        let mut charge_by_col = vec![0.0f32; n_cols.max(1)];
        let mut time_sum = 0.0f64;
        for &digi_index in &cluster.digi_indices {
            let digi = &digis[digi_index as usize];
            let (pad, _bit) = fasp_pad_and_bit(digi.address.channel() as u16);
            let col = pad.saturating_sub(cluster.start_channel) as usize;
            if col < charge_by_col.len() {
                charge_by_col[col] += digi.charge_or_tot;
            }
            time_sum += digi.time as f64;
        }
        let n_digis = cluster.digi_indices.len().max(1) as f64;
        let time = (time_sum / n_digis).round() as u32;

        let total_charge: f32 = charge_by_col.iter().sum();
        if total_charge <= 0.0 {
            monitor.unclassified_clusters += 1;
            return None;
        }

        let topology = classify_topology(n_cols, &charge_by_col);

        let centroid = |charge_by_col: &[f32]| -> f32 {
            charge_by_col.iter().enumerate().map(|(i, q)| i as f32 * q).sum::<f32>() / total_charge
        };

        let (raw_dx, energy) = match topology {
            // El cúmulo simétrico T-R-T/R-T-R está centrado en el pad medio
            // por construcción; el centroide ya da esa posición sin
            // necesidad de triangular con un ajuste de PRF.
            ClusterTopology::Size3 { symmetric: true } => (centroid(&charge_by_col), total_charge),
            ClusterTopology::Size1 | ClusterTopology::Size2 => (centroid(&charge_by_col), total_charge),
            ClusterTopology::Size3 { symmetric: false } | ClusterTopology::Generic => {
                let peak_col = charge_by_col
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(i, _)| i)
                    .unwrap_or(0)
                    .clamp(1, charge_by_col.len().saturating_sub(2));

                let triplet = PadTriplet { left: charge_by_col[peak_col - 1], center: charge_by_col[peak_col], right: charge_by_col[peak_col + 1] };
                match fit_gaussian_prf(triplet) {
                    Some(fit) => {
                        let energy = integrate_prf(&fit, -5.0, 5.0);
                        (peak_col as f32 + fit.offset, energy)
                    }
                    None => {
                        monitor.prf_fit_failures += 1;
                        (centroid(&charge_by_col), total_charge)
                    }
                }
            }
        };

        // La tabla SYS corrige el sesgo de posición dentro de un pad, no a
        // través de pads: se aplica a la parte fraccionaria de `raw_dx`
        // relativa al pad más cercano, y se recompone con ese pad entero.
        let pad_center = raw_dx.round();
        let dx = pad_center + self.sys_correction.correct(raw_dx - pad_center);

        let local_x = (cluster.start_channel as f32 + dx) * self.geometry.pad_width;
        let local_y = cluster.row as f32 * self.geometry.pad_height;
        let global = self.transform.to_global(local_x, local_y, 0.0);

        Some(TrdHit {
            common: HitCommon {
                x: global[0],
                y: global[1],
                z: global[2],
                time,
                sigma_x: self.geometry.pad_width / 12.0f32.sqrt(),
                sigma_y: self.geometry.pad_height / 12.0f32.sqrt(),
                sigma_z: 0.0,
                sigma_t: 5.0,
            },
            energy,
            cluster_index,
        })
    }

    /// **Post-process**: fusiona hits de filas vecinas cuando su
    /// separación espacial y temporal cae dentro de las ventanas
    /// configuradas. El hit absorbente es el
    /// primero de cada par; el segundo se descarta del vector resultante.
    #[must_use]
    pub fn merge_cross_row(&self, mut hits: Vec<TrdHit>, monitor: &mut TrdMonitor) -> Vec<TrdHit> {
        let mut absorbed = vec![false; hits.len()];
        for i in 0..hits.len() {
            if absorbed[i] {
                continue;
            }
            for j in (i + 1)..hits.len() {
                if absorbed[j] {
                    continue;
                }
                let dy = (hits[i].common.y - hits[j].common.y).abs();
                let dx = (hits[i].common.x - hits[j].common.x).abs();
                let dt = hits[i].common.time.abs_diff(hits[j].common.time);
                if dy < 2.0 * self.geometry.pad_height
                    && dx < 2.0 * self.geometry.pad_width
                    && dt > CROSS_ROW_TIME_MIN
                    && dt < CROSS_ROW_TIME_MAX
                {
                    hits[i].energy += hits[j].energy;
                    absorbed[j] = true;
                    monitor.cross_row_merges += 1;
                }
            }
        }

        hits.into_iter().zip(absorbed).filter(|(_, absorbed)| !absorbed).map(|(hit, _)| hit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_domain_model::{DetectorAddress, Subsystem, TriggerKind};

    fn geometry() -> TrdPadGeometry {
        TrdPadGeometry { pad_width: 1.0, pad_height: 1.0 }
    }

    fn identity_transform() -> GlobalTransform {
        GlobalTransform { translation: [0.0; 3], rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0] }
    }

    fn digi(channel: u32, time: u32, charge: f32) -> Digi {
        Digi { address: DetectorAddress::pack(Subsystem::Trd, 0, 0, channel), time, charge_or_tot: charge, trigger: TriggerKind::SelfTriggered }
    }

    #[test]
    fn scenario_5_adjacent_row_fragments_merge_within_window() {
        let mut reco = Trd2DReconstructor::new(8, geometry(), identity_transform(), 1000, SysCorrectionTable::identity());
        // Channel 12 decodes to pad 6 (FASP pairing halves the raw channel),
        // so the fragment's single-pad footprint ends at 7, adjacent to the
        // second fragment's start pad below.
        let digis = vec![digi(12, 100, 10.0), digi(16, 103, 10.0)];
        reco.add_digi(0, 4, 12, &digis);
        // Force a second, separate fragment by using a pad far enough that Add-digi
        // does not consider it contiguous with the first (simulating two FASP reads).
        reco.rows[4].push(TrdCluster {
            row: 4,
            flags: TrdClusterFlags { fasp_type: 0, has_start: true, has_stop: true },
            n_cols: 2,
            start_channel: 7,
            start_time: 103,
            digi_indices: vec![1],
        });
        reco.find_clusters(10_000);
        reco.flush_all();
        assert_eq!(reco.clusters().len(), 1);
        let merged = &reco.clusters()[0];
        assert_eq!(merged.start_channel, 6);
        assert_eq!(merged.n_cols, 3);
    }

    #[test]
    fn make_hit_rejects_a_cluster_with_no_charge() {
        let reco = Trd2DReconstructor::new(8, geometry(), identity_transform(), 1000, SysCorrectionTable::identity());
        let digis = vec![digi(0, 100, 0.0)];
        let cluster = TrdCluster {
            row: 0,
            flags: TrdClusterFlags { fasp_type: 0, has_start: true, has_stop: true },
            n_cols: 1,
            start_channel: 0,
            start_time: 100,
            digi_indices: vec![0],
        };
        let mut monitor = TrdMonitor::default();
        assert!(reco.make_hit(&cluster, 0, &digis, &mut monitor).is_none());
        assert_eq!(monitor.unclassified_clusters, 1);
    }

    #[test]
    fn add_digi_keys_on_the_fasp_pad_not_the_raw_channel() {
        let mut reco = Trd2DReconstructor::new(1, geometry(), identity_transform(), 1000, SysCorrectionTable::identity());
        // Channels 10 (T) and 11 (R) are the same FASP pair -> same pad (5).
        let digis = vec![digi(10, 100, 5.0), digi(11, 101, 5.0)];
        reco.add_digi(0, 0, 10, &digis);
        reco.add_digi(1, 0, 11, &digis);
        assert_eq!(reco.rows[0].len(), 1);
        let cluster = &reco.rows[0][0];
        assert_eq!(cluster.start_channel, 5);
        assert_eq!(cluster.n_cols, 1);
        assert_eq!(cluster.flags.fasp_type, FASP_T_BIT | FASP_R_BIT);
    }

    #[test]
    fn size1_topology_is_t_or_r_with_dx_at_the_pad_center() {
        let reco = Trd2DReconstructor::new(1, geometry(), identity_transform(), 1000, SysCorrectionTable::identity());
        let digis = vec![digi(10, 100, 40.0)];
        let cluster = TrdCluster {
            row: 0,
            flags: TrdClusterFlags { fasp_type: FASP_T_BIT, has_start: true, has_stop: true },
            n_cols: 1,
            start_channel: 5,
            start_time: 100,
            digi_indices: vec![0],
        };
        let mut monitor = TrdMonitor::default();
        let hit = reco.make_hit(&cluster, 0, &digis, &mut monitor).unwrap();
        assert_eq!(hit.common.x, 5.0);
        assert_eq!(monitor.unclassified_clusters, 0);
    }

    #[test]
    fn size3_symmetric_cluster_centers_on_the_middle_pad_without_a_prf_fit() {
        let reco = Trd2DReconstructor::new(1, geometry(), identity_transform(), 1000, SysCorrectionTable::identity());
        // Pads 4, 5, 6 with equal outer charges -> T-R-T/R-T-R symmetric.
        let digis = vec![digi(8, 100, 10.0), digi(10, 100, 40.0), digi(12, 100, 10.0)];
        let cluster = TrdCluster {
            row: 0,
            flags: TrdClusterFlags { fasp_type: FASP_T_BIT, has_start: true, has_stop: true },
            n_cols: 3,
            start_channel: 4,
            start_time: 100,
            digi_indices: vec![0, 1, 2],
        };
        let mut monitor = TrdMonitor::default();
        let hit = reco.make_hit(&cluster, 0, &digis, &mut monitor).unwrap();
        assert_eq!(hit.common.x, 5.0);
        assert_eq!(hit.energy, 60.0);
        assert_eq!(monitor.prf_fit_failures, 0);
    }

    #[test]
    fn size3_asymmetric_cluster_falls_back_to_a_prf_fit() {
        let reco = Trd2DReconstructor::new(1, geometry(), identity_transform(), 1000, SysCorrectionTable::identity());
        let digis = vec![digi(8, 100, 30.0), digi(10, 100, 40.0), digi(12, 100, 10.0)];
        let cluster = TrdCluster {
            row: 0,
            flags: TrdClusterFlags { fasp_type: FASP_T_BIT, has_start: true, has_stop: true },
            n_cols: 3,
            start_channel: 4,
            start_time: 100,
            digi_indices: vec![0, 1, 2],
        };
        let mut monitor = TrdMonitor::default();
        let hit = reco.make_hit(&cluster, 0, &digis, &mut monitor).unwrap();
        // Heavier left neighbour pulls the fitted peak left of the middle pad.
        assert!(hit.common.x < 5.0);
    }

    #[test]
    fn a_nonzero_sys_table_shifts_the_hit_position() {
        // Charges 91/9 on pads 5/6 give a centroid of 0.09 pad-widths past
        // pad 5 (bin 9 of the SYS table).
        let mut bins = vec![0.0; reco_core_math::SYS_TABLE_BINS];
        bins[9] = 0.05;
        let reco = Trd2DReconstructor::new(1, geometry(), identity_transform(), 1000, SysCorrectionTable::new(bins));
        let digis = vec![digi(10, 100, 91.0), digi(12, 100, 9.0)];
        let cluster = TrdCluster {
            row: 0,
            flags: TrdClusterFlags { fasp_type: FASP_T_BIT, has_start: true, has_stop: true },
            n_cols: 2,
            start_channel: 5,
            start_time: 100,
            digi_indices: vec![0, 1],
        };
        let mut monitor = TrdMonitor::default();
        let uncorrected = Trd2DReconstructor::new(1, geometry(), identity_transform(), 1000, SysCorrectionTable::identity())
            .make_hit(&cluster, 0, &digis, &mut monitor)
            .unwrap();
        let corrected = reco.make_hit(&cluster, 0, &digis, &mut monitor).unwrap();
        assert_ne!(uncorrected.common.x, corrected.common.x);
    }
}
