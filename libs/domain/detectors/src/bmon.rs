// [libs/domain/detectors/src/bmon.rs]
//! Calibración y búsqueda de hits del monitor de haz (BMon): de 1 a N
//! diamantes seleccionados por una máscara de bits sobre la dirección, con
//! la misma calibración de tiempo muerto/walk que TOF pero sin el
//! intercambio de lados de canal.
//!
//! Grounded on `algo/detectors/bmon/Calibrate.cxx` (reutiliza la misma
//! lógica de calibración que TOF) y `algo/detectors/bmon/Hitfind.cxx`
//! (distribución de digis a cubos por-hilo-por-diamante, clusterizador,
//! reensamblado particionado).

use crate::calibration::{calibrate_channel, insertion_sort_by_time, ChannelDeadTimes};
use reco_domain_model::{BMonHit, CalibrationMonitor, Digi, DetectorAddress, HitCommon, ModelError, ModuleParams, Subsystem};
use std::collections::HashMap;

/// Resolución temporal intrínseca asumida de un canal de diamante.
const DIAMOND_TIME_RESOLUTION: f32 = 50.0;

/// Bloque de parámetros de un diamante individual más su índice extraído de
/// la dirección. Los diamantes se ordenan por este índice extraído.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DiamondParams {
    /// Índice del diamante, extraído vía la máscara de selección configurada.
    pub index: u64,
    /// Parámetros de calibración y geometría del diamante.
    pub module_params: ModuleParams,
}

/// Configuración de un conjunto de diamantes BMon.
pub struct BMonSetup {
    diamonds: Vec<DiamondParams>,
    index_of: HashMap<u64, usize>,
    selection_mask: u64,
}

impl BMonSetup {
    /// Construye un `BMonSetup`, ordenando los diamantes por índice
    /// extraído y validando el invariante de la máscara de selección:
    /// exactamente una de {máscara de selección es cero, hay un solo
    /// diamante} debe cumplirse.
    ///
    /// # Errors
    /// Devuelve `ModelError::InvalidSelectionMask` si el invariante no se
    /// cumple.
    pub fn new(mut diamonds: Vec<DiamondParams>, selection_mask: u64) -> Result<Self, ModelError> {
        let mask_is_zero = selection_mask == 0;
        if mask_is_zero != (diamonds.len() == 1) {
            return Err(ModelError::InvalidSelectionMask { mask_is_zero, n_diamonds: diamonds.len() });
        }

        diamonds.sort_by_key(|d| d.index);
        let index_of = diamonds.iter().enumerate().map(|(i, d)| (d.index, i)).collect();
        Ok(Self { diamonds, index_of, selection_mask })
    }

    /// Número de diamantes configurados.
    #[must_use]
    pub fn n_diamonds(&self) -> usize {
        self.diamonds.len()
    }

    fn diamond_index_of(&self, address: &DetectorAddress) -> u64 {
        if self.selection_mask == 0 {
            0
        } else {
            address.as_u64() & self.selection_mask
        }
    }

    fn diamond_position(&self, address: &DetectorAddress) -> Option<usize> {
        if address.subsystem() != Subsystem::BMon {
            return None;
        }
        self.index_of.get(&self.diamond_index_of(address)).copied()
    }

    /// Calibra los digis crudos pertenecientes al diamante en la posición
    /// `diamond_position` de este `BMonSetup`.
    #[must_use]
    pub fn calibrate_diamond(&self, diamond_position: usize, raw_digis: &[Digi]) -> (Vec<Digi>, CalibrationMonitor) {
        let mut monitor = CalibrationMonitor::default();
        let params = &self.diamonds[diamond_position].module_params;
        let mut dead_times = ChannelDeadTimes::new(params.channels.len());

        let mut calibrated = Vec::with_capacity(raw_digis.len());
        for raw in raw_digis {
            if self.diamond_position(&raw.address) != Some(diamond_position) {
                monitor.dropped_unknown_rpc += 1;
                continue;
            }
            let channel_index = raw.address.channel() as usize;
            let Some(calib) = params.channels.get(channel_index) else {
                monitor.dropped_unknown_rpc += 1;
                continue;
            };
            if let Some(digi) = calibrate_channel(raw, channel_index, calib, &mut dead_times, &mut monitor) {
                calibrated.push(digi);
            }
        }

        insertion_sort_by_time(&mut calibrated);
        (calibrated, monitor)
    }

    /// Produce un hit por cada digi calibrado aceptado del diamante: un
    /// único canal de diamante con disparo aceptado ya constituye un hit.
    #[must_use]
    pub fn find_hits(&self, diamond_position: usize, calibrated_digis: &[Digi]) -> Vec<BMonHit> {
        let params = &self.diamonds[diamond_position].module_params;
        calibrated_digis
            .iter()
            .enumerate()
            .map(|(i, digi)| {
                let global = params.transform.to_global(0.0, 0.0, 0.0);
                BMonHit {
                    common: HitCommon {
                        x: global[0],
                        y: global[1],
                        z: global[2],
                        time: digi.time,
                        sigma_x: 0.0,
                        sigma_y: 0.0,
                        sigma_z: 0.0,
                        sigma_t: DIAMOND_TIME_RESOLUTION,
                    },
                    digi_index: i as u32,
                }
            })
            .collect()
    }

    /// Dirección de partición representativa del diamante en la posición dada.
    #[must_use]
    pub fn diamond_address(&self, diamond_position: usize) -> u64 {
        self.diamonds[diamond_position].index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_core_math::{GlobalTransform, WalkTable};
    use reco_domain_model::{ChannelCalibration, TriggerKind};

    fn params() -> ModuleParams {
        ModuleParams {
            asic: None,
            geometry: None,
            transform: GlobalTransform { translation: [0.0; 3], rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0] },
            channels: vec![ChannelCalibration {
                time_offset: 0.0,
                tot_offset: 0.0,
                tot_gain: 1.0,
                walk: WalkTable::new(0.0, 100.0, vec![0.0; 10]),
                dead_time: 10.0,
            }],
            swap_channel_sides: false,
            super_module_type: 0,
        }
    }

    #[test]
    fn single_diamond_requires_zero_selection_mask() {
        let diamonds = vec![DiamondParams { index: 0, module_params: params() }];
        assert!(BMonSetup::new(diamonds, 0).is_ok());

        let diamonds = vec![DiamondParams { index: 0, module_params: params() }];
        assert!(BMonSetup::new(diamonds, 0xFF).is_err());
    }

    #[test]
    fn every_accepted_digi_becomes_one_hit() {
        let diamonds = vec![DiamondParams { index: 0, module_params: params() }];
        let setup = BMonSetup::new(diamonds, 0).unwrap();
        let raw = vec![Digi {
            address: DetectorAddress::pack(Subsystem::BMon, 0, 0, 0),
            time: 10,
            charge_or_tot: 5.0,
            trigger: TriggerKind::SelfTriggered,
        }];
        let (calibrated, _) = setup.calibrate_diamond(0, &raw);
        let hits = setup.find_hits(0, &calibrated);
        assert_eq!(hits.len(), 1);
    }
}
