// [libs/domain/reco-model/src/address.rs]
//! Dirección de detector: un bitfield empaquetado que codifica
//! jerárquicamente subsistema/módulo/sensor/canal.
//!
//! Grounded on `CbmStsDigi`/`CbmTofDigi`'s `GetAddress()`/`SetAddress()`
//! accessors (`fles::Subsystem` + packed Sm/Rpc/Chan/Side fields for TOF,
//! module/sensor/channel for STS). This crate does not need bit-for-bit
//! fidelity with the original's exact bit widths — only the hierarchical
//! decode/encode contract the calibrators and cluster finders depend on.

use serde::{Deserialize, Serialize};

/// Subsistema que originó un digi, espejando `fles::Subsystem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subsystem {
    /// Silicon Tracking System.
    Sts,
    /// Time-of-Flight.
    Tof,
    /// Transition Radiation Detector.
    Trd,
    /// Beam monitor (diamond detectors).
    BMon,
}

/// Dirección empaquetada de un canal de detector: subsistema en los bits
/// altos, seguido de módulo, sensor/RPC y canal en los bits bajos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DetectorAddress(u64);

const SUBSYSTEM_SHIFT: u32 = 56;
const MODULE_SHIFT: u32 = 40;
const SENSOR_SHIFT: u32 = 24;
const CHANNEL_MASK: u64 = 0x00FF_FFFF;

impl DetectorAddress {
    /// Empaqueta una dirección a partir de sus componentes jerárquicos.
    #[must_use]
    pub fn pack(subsystem: Subsystem, module: u16, sensor: u16, channel: u32) -> Self {
        let subsystem_bits = match subsystem {
            Subsystem::Sts => 0u64,
            Subsystem::Tof => 1u64,
            Subsystem::Trd => 2u64,
            Subsystem::BMon => 3u64,
        };
        Self(
            (subsystem_bits << SUBSYSTEM_SHIFT)
                | ((module as u64) << MODULE_SHIFT)
                | ((sensor as u64) << SENSOR_SHIFT)
                | (channel as u64 & CHANNEL_MASK),
        )
    }

    /// El subsistema codificado en esta dirección.
    #[must_use]
    pub fn subsystem(&self) -> Subsystem {
        match self.0 >> SUBSYSTEM_SHIFT {
            0 => Subsystem::Sts,
            1 => Subsystem::Tof,
            2 => Subsystem::Trd,
            _ => Subsystem::BMon,
        }
    }

    /// El índice de módulo codificado en esta dirección.
    #[must_use]
    pub fn module(&self) -> u16 {
        ((self.0 >> MODULE_SHIFT) & 0xFFFF) as u16
    }

    /// El índice de sensor/RPC codificado en esta dirección.
    #[must_use]
    pub fn sensor(&self) -> u16 {
        ((self.0 >> SENSOR_SHIFT) & 0xFFFF) as u16
    }

    /// El índice de canal codificado en esta dirección.
    #[must_use]
    pub fn channel(&self) -> u32 {
        (self.0 & CHANNEL_MASK) as u32
    }

    /// La dirección codificada como un único entero de 64 bits (para uso en
    /// `Partitioned<T>`, que indexa particiones por `u64`).
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Dirección con el lado (front/back) invertido; usado por la
    /// excepción de intercambio de lado TOF.
    #[must_use]
    pub fn with_channel(&self, channel: u32) -> Self {
        Self((self.0 & !CHANNEL_MASK) | (channel as u64 & CHANNEL_MASK))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_and_unpack_roundtrips_every_component() {
        let address = DetectorAddress::pack(Subsystem::Tof, 3, 7, 42);
        assert_eq!(address.subsystem(), Subsystem::Tof);
        assert_eq!(address.module(), 3);
        assert_eq!(address.sensor(), 7);
        assert_eq!(address.channel(), 42);
    }

    #[test]
    fn with_channel_preserves_other_components() {
        let address = DetectorAddress::pack(Subsystem::Sts, 1, 2, 10);
        let swapped = address.with_channel(11);
        assert_eq!(swapped.module(), 1);
        assert_eq!(swapped.sensor(), 2);
        assert_eq!(swapped.channel(), 11);
    }
}
