// [libs/domain/reco-model/src/params.rs]
//! Bloque de parámetros de calibración por módulo/RPC: constantes
//! inmutables durante la corrida, apuntadas por cada calibrador/buscador de
//! cúmulos.
//!
//! Grounded on `tof::CalibrateSetup::Rpc`/`Channel` and STS's
//! `HitfinderCache` (front-end ASIC constants + geometry transform).

use reco_core_math::{AsicParams, GlobalTransform, ModuleGeometry, WalkTable};

/// Constantes de calibración por canal: desplazamientos de tiempo y ganancia
/// de ToT/carga, más la tabla de corrección de walk de ese canal.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChannelCalibration {
    /// Desplazamiento de tiempo a restar (`vCPTOff`).
    pub time_offset: f64,
    /// Desplazamiento de ToT a restar antes de la ganancia (`vCPTotOff`).
    pub tot_offset: f64,
    /// Ganancia multiplicativa de ToT/carga (`vCPTotGain`).
    pub tot_gain: f64,
    /// Tabla de corrección de walk de este canal.
    pub walk: WalkTable,
    /// Tiempo de bloqueo del canal tras un pulso aceptado o rechazado.
    pub dead_time: f64,
}

/// Bloque de parámetros de un módulo/RPC/sensor: geometría, parámetros de
/// ASIC y el arreglo de calibraciones por canal.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModuleParams {
    /// Parámetros físicos del ASIC de lectura (solo STS).
    pub asic: Option<AsicParams>,
    /// Geometría de intersección de tiras estéreo (solo STS).
    pub geometry: Option<ModuleGeometry>,
    /// Transformación a coordenadas globales.
    pub transform: GlobalTransform,
    /// Calibraciones por canal, indexadas por canal lógico.
    pub channels: Vec<ChannelCalibration>,
    /// `true` si este módulo requiere el intercambio de lados de canal TOF
    /// (sujeto a la excepción de SmType 5/8).
    pub swap_channel_sides: bool,
    /// Tipo de super-módulo (TOF), usado únicamente para la excepción de
    /// intercambio de lado.
    pub super_module_type: u32,
}

impl ModuleParams {
    /// `true` si, dado el estado `swap_channel_sides` y el tipo de
    /// super-módulo de este bloque, un digi calibrado de este módulo debe
    /// tener sus lados de canal intercambiados.
    ///
    /// Preserva exactamente la excepción del original: SmType 5 y 8 nunca
    /// se intercambian, sin importar el valor de `swap_channel_sides`. No
    /// hay justificación documentada para la excepción; se conserva tal
    /// cual.
    #[must_use]
    pub fn should_swap_channel_sides(&self) -> bool {
        self.swap_channel_sides && self.super_module_type != 5 && self.super_module_type != 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_core_math::WalkTable;

    fn params(swap: bool, sm_type: u32) -> ModuleParams {
        ModuleParams {
            asic: None,
            geometry: None,
            transform: GlobalTransform { translation: [0.0; 3], rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0] },
            channels: vec![ChannelCalibration {
                time_offset: 0.0,
                tot_offset: 0.0,
                tot_gain: 1.0,
                walk: WalkTable::new(0.0, 10.0, vec![0.0; 5]),
                dead_time: 100.0,
            }],
            swap_channel_sides: swap,
            super_module_type: sm_type,
        }
    }

    #[test]
    fn sm_type_5_and_8_never_swap_regardless_of_flag() {
        assert!(!params(true, 5).should_swap_channel_sides());
        assert!(!params(true, 8).should_swap_channel_sides());
    }

    #[test]
    fn other_sm_types_swap_when_flag_set() {
        assert!(params(true, 2).should_swap_channel_sides());
        assert!(!params(false, 2).should_swap_channel_sides());
    }
}
