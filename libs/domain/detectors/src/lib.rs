// [libs/domain/detectors/src/lib.rs]
#![deny(missing_docs)]

//! # APARATO: BUSCADORES DE CÚMULOS Y HITS POR DETECTOR
//! CLASIFICACIÓN: DOMAIN LAYER (ESTRATO L2)
//! RESPONSABILIDAD: CALIBRACIÓN Y RECONSTRUCCIÓN POR SUBSISTEMA (STS, TRD,
//! TOF, BMON) Y LA ORQUESTACIÓN PARALELA QUE LOS UNIFORMA
//!
//! Este crate contiene el contenido "difícil" de la tubería de
//! reconstrucción en línea: el pipeline heterogéneo de siete
//! etapas de la STS, los reconstructores TRD-2D/TRD-1D, la calibración y
//! búsqueda de hits de TOF/BMon, y el orquestador que les da a todos una
//! forma de ejecución paralela uniforme vía el patrón de
//! prefix-sum de `prefix_sum`.

/// Calibración de digis por canal, compartida entre TOF y BMon.
pub mod calibration;
/// Errores fatales de construcción (`DetectorError`).
pub mod errors;
/// Orquestador de búsqueda de hits: scratch por-hilo, fan-out paralelo, stitching.
pub mod orchestrator;
/// Ensamblado de fragmentos de resultado por-hilo (`stitch`, `ThreadFragment`).
pub mod prefix_sum;

/// Pipeline heterogéneo de siete etapas de la STS.
pub mod sts;
/// Reconstructor TRD-1D: clusterización main/neighbour-trigger y fusión de filas.
pub mod trd1d;
/// Reconstructor TRD-2D: acumulador por fila, clasificador de topología, fusión entre filas.
pub mod trd2d;

/// Calibración y búsqueda de hits BMon.
pub mod bmon;
/// Calibración y búsqueda de hits TOF.
pub mod tof;

pub use errors::{DetectorError, Result};
pub use prefix_sum::{stitch, ThreadFragment};

/// Reexportaciones de uso frecuente para `apps/reco-driver`.
pub mod prelude {
    pub use crate::bmon::{BMonSetup, DiamondParams};
    pub use crate::errors::{DetectorError, Result};
    pub use crate::orchestrator::{HitFinderOrchestrator, OrchestratorConfig, PartitionJob, StageTimings};
    pub use crate::prefix_sum::{stitch, ThreadFragment};
    pub use crate::sts::StsPipeline;
    pub use crate::tof::RpcSetup;
    pub use crate::trd1d::{Trd1DPadGeometry, Trd1DReconstructor};
    pub use crate::trd2d::{Trd2DReconstructor, TrdPadGeometry};
}
