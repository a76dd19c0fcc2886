// [libs/domain/reco-model/src/monitor.rs]
//! Monitores por-etapa: la única fuente de verdad para condiciones no
//! fatales: el monitor devuelto junto a cada tramo de salida es la
//! única fuente de verdad para los diagnósticos de ese timeslice.
//!
//! Ninguno de estos campos es jamás envuelto en un `Result`; todos son
//! contadores que un consumidor de telemetría agrega o vuelca al final de
//! cada timeslice.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Monitor de la etapa de calibración TOF/BMon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationMonitor {
    /// Digis procesados (aceptados o rechazados).
    pub processed: u64,
    /// Digis descartados por pertenecer a un RPC/canal fuera del conjunto
    /// configurado.
    pub dropped_unknown_rpc: u64,
    /// Digis descartados por estar dentro de la ventana de tiempo muerto.
    pub dropped_deadtime: u64,
    /// Tiempo de pared consumido por esta invocación.
    pub wall_time: Duration,
    /// Bytes de entrada procesados.
    pub bytes: u64,
}

/// Monitor del pipeline heterogéneo STS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StsMonitor {
    /// Cúmulos descartados por desbordamiento del cubo de cúmulos de algún módulo.
    pub cluster_bucket_overflow: u64,
    /// Hits descartados por desbordamiento del cubo de hits de algún módulo.
    pub hit_bucket_overflow: u64,
    /// Número de módulos en los que se activó la guarda de evento monstruo
    /// (`nHitsWritten > 2*maxHitsPerModule`).
    pub monster_event_guard_triggered: u64,
    /// Tiempo de pared de la invocación completa del pipeline.
    pub wall_time: Duration,
}

/// Monitor del reconstructor TRD (2D o 1D).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrdMonitor {
    /// Cúmulos que no pudieron clasificarse en ninguna topología conocida.
    pub unclassified_clusters: u64,
    /// Hits descartados por falla del ajuste de PRF (carga no positiva).
    pub prf_fit_failures: u64,
    /// Hits fusionados entre filas vecinas en el post-procesamiento.
    pub cross_row_merges: u64,
    /// Tiempo de pared de la invocación completa del reconstructor.
    pub wall_time: Duration,
}

/// Monitor de decodificación de telemetría: un error de decodificación
/// se registra y el mensaje se descarta, sin detener el servidor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMonitor {
    /// Mensajes recibidos y aplicados exitosamente al registro.
    pub messages_applied: u64,
    /// Mensajes descartados por fallar la decodificación.
    pub decode_errors: u64,
}
