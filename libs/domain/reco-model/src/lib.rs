// [libs/domain/reco-model/src/lib.rs]
#![deny(missing_docs)]

//! # APARATO: MODELO DE DOMINIO DE RECONSTRUCCIÓN
//! CLASIFICACIÓN: DOMAIN LAYER (ESTRATO L2)
//! RESPONSABILIDAD: TIPOS COMPARTIDOS ENTRE CALIBRADORES, BUSCADORES DE
//! CÚMULOS/HITS Y LA TUBERÍA DE RECONSTRUCCIÓN
//!
//! Ninguno de los tipos de este crate retiene lógica de negocio: son los
//! sustantivos del dominio sobre los que operan `reco-core-math`,
//! `reco-core-buckets` y `reco-domain-detectors`.

/// Dirección de detector empaquetada (`DetectorAddress`, `Subsystem`).
pub mod address;
/// Cúmulos STS y TRD (`StsCluster`, `ClusterIdx`, `TrdCluster`, `TrdClusterFlags`).
pub mod cluster;
/// Digi crudo e inmutable (`Digi`, `TriggerKind`).
pub mod digi;
/// Errores fatales de construcción del dominio (`ModelError`).
pub mod errors;
/// Variantes de hit por subsistema (`HitCommon`, `StsHit`, `TrdHit`, `TofHit`, `BMonHit`).
pub mod hit;
/// Monitores por-etapa (`CalibrationMonitor`, `StsMonitor`, `TrdMonitor`, `TelemetryMonitor`).
pub mod monitor;
/// Bloques de parámetros de calibración (`ChannelCalibration`, `ModuleParams`).
pub mod params;
/// Agregado de resultados de reconstrucción (`RecoResults` y sus partes).
pub mod reco_results;

pub use address::{DetectorAddress, Subsystem};
pub use cluster::{ClusterIdx, StsCluster, TrdCluster, TrdClusterFlags};
pub use digi::{Digi, TriggerKind};
pub use errors::ModelError;
pub use hit::{BMonHit, HitCommon, StsHit, TofHit, TrdHit};
pub use monitor::{CalibrationMonitor, StsMonitor, TelemetryMonitor, TrdMonitor};
pub use params::{ChannelCalibration, ModuleParams};
pub use reco_results::{
    BMonSubsystemResults, DigiEvent, RecoResults, StsSubsystemResults, Track, TofSubsystemResults, TrdSubsystemResults,
};

/// Reexportaciones de uso frecuente para los crates del estrato superior.
pub mod prelude {
    pub use crate::address::{DetectorAddress, Subsystem};
    pub use crate::cluster::{ClusterIdx, StsCluster, TrdCluster, TrdClusterFlags};
    pub use crate::digi::{Digi, TriggerKind};
    pub use crate::errors::ModelError;
    pub use crate::hit::{BMonHit, HitCommon, StsHit, TofHit, TrdHit};
    pub use crate::monitor::{CalibrationMonitor, StsMonitor, TelemetryMonitor, TrdMonitor};
    pub use crate::params::{ChannelCalibration, ModuleParams};
    pub use crate::reco_results::{
        BMonSubsystemResults, DigiEvent, RecoResults, StsSubsystemResults, Track, TofSubsystemResults, TrdSubsystemResults,
    };
}
