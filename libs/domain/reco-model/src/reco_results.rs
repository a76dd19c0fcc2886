// [libs/domain/reco-model/src/reco_results.rs]
//! Agregado de resultados de reconstrucción: el objeto entregado al
//! escritor de archivo al final de cada timeslice.

use crate::cluster::{StsCluster, TrdCluster};
use crate::digi::Digi;
use crate::hit::{BMonHit, StsHit, TofHit, TrdHit};
use reco_core_buckets::Partitioned;
use serde::{Deserialize, Serialize};

/// Una vista de evento de digis: el rango de tiempo y los índices de digi
/// agrupados en él por el ensamblador de eventos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigiEvent {
    /// Tiempo de disparo alrededor del cual se agrupó este evento.
    pub trigger_time: u32,
    /// Índices de los digis de cada subsistema pertenecientes a este evento.
    pub digi_indices: Vec<u32>,
}

/// Cúmulos y hits de un subsistema, cada uno particionado por módulo
/// (cúmulos y hits particionados por-módulo).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StsSubsystemResults {
    /// Copia de los digis calibrados de este subsistema.
    pub digis: Vec<Digi>,
    /// Cúmulos, particionados por dirección de módulo.
    pub clusters: Partitioned<StsCluster>,
    /// Hits, particionados por dirección de módulo.
    pub hits: Partitioned<StsHit>,
}

/// Cúmulos y hits TRD, particionados por módulo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrdSubsystemResults {
    /// Copia de los digis calibrados de este subsistema.
    pub digis: Vec<Digi>,
    /// Cúmulos, particionados por dirección de módulo.
    pub clusters: Partitioned<TrdCluster>,
    /// Hits, particionados por dirección de módulo.
    pub hits: Partitioned<TrdHit>,
}

/// Hits TOF, particionados por RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TofSubsystemResults {
    /// Copia de los digis calibrados de este subsistema.
    pub digis: Vec<Digi>,
    /// Hits, particionados por dirección de RPC.
    pub hits: Partitioned<TofHit>,
}

/// Hits BMon, particionados por diamante.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BMonSubsystemResults {
    /// Copia de los digis calibrados de este subsistema.
    pub digis: Vec<Digi>,
    /// Hits, particionados por dirección de diamante.
    pub hits: Partitioned<BMonHit>,
}

/// Una pista reconstruida: una lista de índices de hit por subsistema, en
/// el orden en que fue acumulada por el buscador de pistas aguas abajo.
/// Este crate no implementa el buscador de pistas; solo transporta su
/// salida si está presente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Índices de hit que componen esta pista, en el orden de acumulación.
    pub hit_indices: Vec<u32>,
}

/// El agregado completo de resultados de reconstrucción de un timeslice.
///
/// Propiedad de la tubería; la propiedad se transfiere al escritor de
/// archivo, que puede liberarla tras una escritura durable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoResults {
    /// Identificador del timeslice que produjo este agregado.
    pub timeslice_id: u64,
    /// Tiempo de inicio del timeslice.
    pub start_time: u64,
    /// Vistas de evento de digis producidas por el ensamblador de eventos.
    pub digi_events: Vec<DigiEvent>,
    /// Resultados STS.
    pub sts: StsSubsystemResults,
    /// Resultados TRD.
    pub trd: TrdSubsystemResults,
    /// Resultados TOF.
    pub tof: TofSubsystemResults,
    /// Resultados BMon.
    pub bmon: BMonSubsystemResults,
    /// Pistas reconstruidas, si el buscador de pistas aguas abajo se ejecutó.
    pub tracks: Vec<Track>,
}
