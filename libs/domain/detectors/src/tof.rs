// [libs/domain/detectors/src/tof.rs]
//! Calibración y búsqueda de hits TOF: RPCs de doble lectura, ventana de
//! tiempo muerto, corrección de walk, intercambio de lados de canal y
//! emparejamiento de los dos extremos de una tira para localizar la
//! posición a lo largo de ella.
//!
//! Grounded on `algo/detectors/tof/Calibrate.cxx` (calibración) and
//! `algo/detectors/tof/Hitfind.cxx` (forma de orquestación, ver
//! `crate::prefix_sum`). El emparejamiento extremo-a-extremo de tira no
//! está detallado en la especificación más allá de "TofHit: generated by
//! the intersection of the readout end of an RPC"; la fórmula de posición
//! por diferencia de tiempo entre extremos es la técnica estándar de un
//! RPC de tira con doble lectura y se documenta como decisión de diseño en
//! `DESIGN.md`.

use crate::calibration::{calibrate_channel, insertion_sort_by_time, ChannelDeadTimes};
use crate::errors::{DetectorError, Result};
use reco_domain_model::{CalibrationMonitor, Digi, DetectorAddress, HitCommon, ModuleParams, Subsystem, TofHit};
use std::collections::HashMap;

/// Velocidad de propagación de señal a lo largo de una tira RPC, en
/// unidades de longitud por unidad de tiempo nativa; usada para convertir
/// la diferencia de tiempo entre extremos en una posición a lo largo de la
/// tira. Valor de diseño (no provisto por el bloque de parámetros).
const STRIP_PROPAGATION_VELOCITY: f32 = 0.5;

/// Ventana máxima de tiempo entre los dos extremos de la misma tira para
/// considerarlos un único hit emparejado.
const STRIP_MATCH_WINDOW: u32 = 20;

/// Resolución temporal intrínseca asumida de un extremo de lectura RPC,
/// usada para `sigma_t` cuando no hay emparejamiento de extremos.
const SINGLE_ENDED_TIME_RESOLUTION: f32 = 80.0;

/// Configuración de un conjunto de RPCs TOF: bloques de parámetros
/// indexados y su mapeo `(super-module, rpc)` a índice lineal.
pub struct RpcSetup {
    params: Vec<ModuleParams>,
    index_of: HashMap<(u16, u16), usize>,
}

impl RpcSetup {
    /// Construye un `RpcSetup` a partir de bloques de parámetros y sus
    /// direcciones `(super_module, rpc)`.
    ///
    /// # Errors
    /// Devuelve `DetectorError::EmptyModuleSet` si `params` está vacío, o
    /// `DetectorError` si `addresses.len() != params.len()`.
    pub fn new(params: Vec<ModuleParams>, addresses: Vec<(u16, u16)>) -> Result<Self> {
        if params.is_empty() {
            return Err(DetectorError::EmptyModuleSet);
        }
        if addresses.len() != params.len() {
            return Err(DetectorError::MissingModuleParams { module_index: addresses.len() });
        }
        let index_of = addresses.into_iter().enumerate().map(|(i, addr)| (addr, i)).collect();
        Ok(Self { params, index_of })
    }

    /// Número de RPCs configurados.
    #[must_use]
    pub fn n_rpcs(&self) -> usize {
        self.params.len()
    }

    fn rpc_index_for(&self, address: &DetectorAddress) -> Option<usize> {
        if address.subsystem() != Subsystem::Tof {
            return None;
        }
        self.index_of.get(&(address.module(), address.sensor())).copied()
    }

    /// Calibra un lote de digis crudos de un único RPC, identificado por el
    /// índice `rpc_index` dentro de este `RpcSetup`.
    ///
    /// Aplica tiempo muerto, desplazamiento/ganancia de ToT, corrección de
    /// walk, la excepción de intercambio de lados de canal, y finalmente la
    /// reordenación por inserción.
    #[must_use]
    pub fn calibrate_rpc(&self, rpc_index: usize, raw_digis: &[Digi]) -> (Vec<Digi>, CalibrationMonitor) {
        let mut monitor = CalibrationMonitor::default();
        let params = &self.params[rpc_index];
        let mut dead_times = ChannelDeadTimes::new(params.channels.len());
        let half_strip = params.channels.len() / 2;

        let mut calibrated = Vec::with_capacity(raw_digis.len());
        for raw in raw_digis {
            if self.rpc_index_for(&raw.address) != Some(rpc_index) {
                monitor.dropped_unknown_rpc += 1;
                continue;
            }
            let channel_index = raw.address.channel() as usize;
            let Some(calib) = params.channels.get(channel_index) else {
                monitor.dropped_unknown_rpc += 1;
                continue;
            };

            let Some(mut digi) = calibrate_channel(raw, channel_index, calib, &mut dead_times, &mut monitor) else {
                continue;
            };

            if params.should_swap_channel_sides() && half_strip > 0 {
                let swapped_channel = if channel_index < half_strip { channel_index + half_strip } else { channel_index - half_strip };
                digi.address = digi.address.with_channel(swapped_channel as u32);
            }

            calibrated.push(digi);
        }

        insertion_sort_by_time(&mut calibrated);
        (calibrated, monitor)
    }

    /// Busca hits de un RPC a partir de sus digis ya calibrados: empareja
    /// los dos extremos de cada tira dentro de `STRIP_MATCH_WINDOW`, o
    /// emite un hit de extremo único si no hay pareja en ventana.
    #[must_use]
    pub fn find_hits(&self, rpc_index: usize, calibrated_digis: &[Digi]) -> Vec<TofHit> {
        let params = &self.params[rpc_index];
        let half_strip = params.channels.len() / 2;
        if half_strip == 0 {
            return Vec::new();
        }

        let mut used = vec![false; calibrated_digis.len()];
        let mut hits = Vec::new();

        for i in 0..calibrated_digis.len() {
            if used[i] {
                continue;
            }
            let a = &calibrated_digis[i];
            let a_channel = a.address.channel() as usize;
            let a_strip = a_channel % half_strip;

            let mut best: Option<(usize, u32)> = None;
            for (j, b) in calibrated_digis.iter().enumerate().skip(i + 1) {
                if used[j] {
                    continue;
                }
                let b_channel = b.address.channel() as usize;
                if b_channel % half_strip != a_strip || b_channel == a_channel {
                    continue;
                }
                let dt = a.time.abs_diff(b.time);
                if dt > STRIP_MATCH_WINDOW {
                    continue;
                }
                if best.map(|(_, best_dt)| dt < best_dt).unwrap_or(true) {
                    best = Some((j, dt));
                }
            }

            let hit = if let Some((j, _)) = best {
                used[i] = true;
                used[j] = true;
                let b = &calibrated_digis[j];
                let dt = b.time as f32 - a.time as f32;
                let position = dt * STRIP_PROPAGATION_VELOCITY;
                let time = (a.time + b.time) / 2;
                let global = params.transform.to_global(position, 0.0, 0.0);
                TofHit {
                    common: HitCommon {
                        x: global[0],
                        y: global[1],
                        z: global[2],
                        time,
                        sigma_x: SINGLE_ENDED_TIME_RESOLUTION * STRIP_PROPAGATION_VELOCITY * std::f32::consts::FRAC_1_SQRT_2,
                        sigma_y: 0.0,
                        sigma_z: 0.0,
                        sigma_t: SINGLE_ENDED_TIME_RESOLUTION * std::f32::consts::FRAC_1_SQRT_2,
                    },
                    digi_index: i as u32,
                }
            } else {
                used[i] = true;
                let global = params.transform.to_global(0.0, 0.0, 0.0);
                TofHit {
                    common: HitCommon {
                        x: global[0],
                        y: global[1],
                        z: global[2],
                        time: a.time,
                        sigma_x: f32::MAX,
                        sigma_y: 0.0,
                        sigma_z: 0.0,
                        sigma_t: SINGLE_ENDED_TIME_RESOLUTION,
                    },
                    digi_index: i as u32,
                }
            };
            hits.push(hit);
        }

        hits
    }

    /// Dirección de partición representativa de un RPC (canal 0).
    #[must_use]
    pub fn rpc_address(&self, rpc_index: usize, super_module: u16, rpc: u16) -> u64 {
        let _ = rpc_index;
        DetectorAddress::pack(Subsystem::Tof, super_module, rpc, 0).as_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_core_math::{GlobalTransform, WalkTable};
    use reco_domain_model::TriggerKind;

    fn params_for(n_channels: usize) -> ModuleParams {
        ModuleParams {
            asic: None,
            geometry: None,
            transform: GlobalTransform { translation: [0.0; 3], rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0] },
            channels: (0..n_channels)
                .map(|_| reco_domain_model::ChannelCalibration {
                    time_offset: 0.0,
                    tot_offset: 0.0,
                    tot_gain: 1.0,
                    walk: WalkTable::new(0.0, 100.0, vec![0.0; 10]),
                    dead_time: 10.0,
                })
                .collect(),
            swap_channel_sides: false,
            super_module_type: 1,
        }
    }

    fn digi(channel: u32, time: u32) -> Digi {
        Digi {
            address: DetectorAddress::pack(Subsystem::Tof, 0, 0, channel),
            time,
            charge_or_tot: 10.0,
            trigger: TriggerKind::SelfTriggered,
        }
    }

    #[test]
    fn calibrates_only_digis_belonging_to_the_configured_rpc() {
        let setup = RpcSetup::new(vec![params_for(4)], vec![(0, 0)]).unwrap();
        let raw = vec![digi(0, 100), digi(5, 100)];
        let (calibrated, monitor) = setup.calibrate_rpc(0, &raw);
        assert_eq!(calibrated.len(), 1);
        assert_eq!(monitor.dropped_unknown_rpc, 1);
    }

    #[test]
    fn paired_strip_ends_within_window_produce_one_hit() {
        let setup = RpcSetup::new(vec![params_for(4)], vec![(0, 0)]).unwrap();
        let raw = vec![digi(0, 100), digi(2, 105)];
        let (calibrated, _) = setup.calibrate_rpc(0, &raw);
        let hits = setup.find_hits(0, &calibrated);
        assert_eq!(hits.len(), 1);
    }
}
