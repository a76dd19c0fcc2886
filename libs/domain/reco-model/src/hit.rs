// [libs/domain/reco-model/src/hit.rs]
//! Hit: atributos comunes globales más referencias de cúmulo específicas
//! del subsistema.

use serde::{Deserialize, Serialize};

/// Atributos comunes a todo hit, independientemente del subsistema que lo
/// produjo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitCommon {
    /// Coordenada global x.
    pub x: f32,
    /// Coordenada global y.
    pub y: f32,
    /// Coordenada global z.
    pub z: f32,
    /// Tiempo del hit.
    pub time: u32,
    /// Desviación estándar en x.
    pub sigma_x: f32,
    /// Desviación estándar en y.
    pub sigma_y: f32,
    /// Desviación estándar en z.
    pub sigma_z: f32,
    /// Desviación estándar del tiempo.
    pub sigma_t: f32,
}

/// Hit STS: generado por la intersección de un cúmulo frontal y uno
/// trasero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StsHit {
    /// Atributos globales comunes.
    pub common: HitCommon,
    /// Covarianza cruzada x-y (distinta de cero por el ángulo estéreo).
    pub sigma_xy: f32,
    /// Proyección del error de posición frontal a lo largo de la tira.
    pub du: f32,
    /// Proyección del error de posición trasero a lo largo de la tira.
    pub dv: f32,
    /// Índice del cúmulo frontal que originó este hit.
    pub front_cluster_index: u32,
    /// Índice del cúmulo trasero que originó este hit.
    pub back_cluster_index: u32,
}

/// Hit TRD: generado por una única cámara, con la energía
/// depositada estimada vía ajuste de PRF.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrdHit {
    /// Atributos globales comunes.
    pub common: HitCommon,
    /// Energía depositada estimada (integral de la PRF ajustada).
    pub energy: f32,
    /// Índice del cúmulo que originó este hit.
    pub cluster_index: u32,
}

/// Hit TOF: generado por la intersección del extremo de lectura de un RPC
/// de un lado con el del lado opuesto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TofHit {
    /// Atributos globales comunes.
    pub common: HitCommon,
    /// Índice del digi calibrado que originó este hit.
    pub digi_index: u32,
}

/// Hit BMon: un único canal de diamante con disparo aceptado.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BMonHit {
    /// Atributos globales comunes.
    pub common: HitCommon,
    /// Índice del digi calibrado que originó este hit.
    pub digi_index: u32,
}
