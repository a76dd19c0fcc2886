// [libs/domain/reco-model/src/digi.rs]
//! Digi crudo: el registro inmutable producido por el front-end de
//! lectura, antes de cualquier calibración.
//!
//! Grounded on `CbmStsDigi`/`CbmTofDigi`/`CbmBmonDigi` — cada uno un par
//! `(address, time, charge-or-tot)` más, para TOF/BMon, un indicador de
//! disparo propio/vecino usado por el clusterizador TRD-1D.

use crate::address::DetectorAddress;
use serde::{Deserialize, Serialize};

/// Indica si un digi TRD se auto-disparó o fue levantado por un vecino
/// auto-disparado ("main-trigger" vs "neighbour-trigger").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerKind {
    /// El canal cruzó su propio umbral.
    SelfTriggered,
    /// El canal fue levantado por la lectura de un vecino auto-disparado.
    NeighbourTriggered,
}

/// Un digi crudo, inmutable, tal como llega del front-end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Digi {
    /// Dirección jerárquica del canal que produjo este digi.
    pub address: DetectorAddress,
    /// Tiempo del digi, en las unidades nativas del subsistema.
    pub time: u32,
    /// Carga (STS) o ToT (TOF/BMon) del digi, antes de calibrar.
    pub charge_or_tot: f32,
    /// Naturaleza del disparo (solo relevante para TRD).
    pub trigger: TriggerKind,
}

impl Digi {
    /// Construye un digi auto-disparado con la carga/ToT dada.
    #[must_use]
    pub fn new(address: DetectorAddress, time: u32, charge_or_tot: f32) -> Self {
        Self { address, time, charge_or_tot, trigger: TriggerKind::SelfTriggered }
    }
}
