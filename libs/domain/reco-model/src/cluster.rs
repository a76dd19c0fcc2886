// [libs/domain/reco-model/src/cluster.rs]
//! Tipos de cúmulo: la variante STS (posición continua, ponderada por
//! carga) y la variante TRD (fila + bits de bandera co-empaquetados, lista
//! de índices de digi).

use serde::{Deserialize, Serialize};

/// Un cúmulo STS: carga total, tamaño, posición fraccionaria (canal) y su
/// error, tiempo promedio y su error.
///
/// Grounded on `sts::Cluster` (`Hitfinder.h`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StsCluster {
    /// Carga total del cúmulo.
    pub charge: f32,
    /// Número de digis que forman el cúmulo.
    pub size: u32,
    /// Posición ponderada por carga, en unidades de canal (puede exceder
    /// `nChannels` del lado frontal cuando el cúmulo pertenece al lado
    /// trasero, por construcción — ver invariante de rangos disjuntos).
    pub position: f32,
    /// Desviación estándar de `position`.
    pub position_error: f32,
    /// Tiempo promedio del cúmulo.
    pub time: u32,
    /// Desviación estándar de `time`.
    pub time_error: f32,
}

/// Índice ordenable de un cúmulo: separa la clave de ordenamiento (tiempo)
/// del payload, para que el ancho de banda del sort sea proporcional a
/// 8 bytes/elemento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterIdx {
    /// Tiempo del cúmulo referenciado, usado como clave de ordenamiento.
    pub time: u32,
    /// Índice del cúmulo dentro del arreglo de payloads del módulo.
    pub data_index: u32,
}

/// Bits de bandera de un cúmulo TRD, co-empaquetados con la fila en un solo
/// byte en el original; aquí expresados como campos separados por claridad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrdClusterFlags {
    /// Canales FASP vistos por el cúmulo. En TRD-2D es una máscara de bits
    /// (bit 0: algún canal T del par `(chT, chR)` disparó; bit 1: algún
    /// canal R disparó), acumulada en Add-digi y fusionada en Find-clusters.
    /// TRD-1D, que no tiene pares FASP, deja este campo en 0.
    pub fasp_type: u8,
    /// `true` si el cúmulo tiene un digi de inicio confirmado (no truncado
    /// por el borde de la ventana de procesamiento).
    pub has_start: bool,
    /// `true` si el cúmulo tiene un digi de fin confirmado.
    pub has_stop: bool,
}

/// Un cúmulo TRD en construcción o finalizado, indexado por fila.
///
/// Grounded on `CbmTrdModuleRec2D`'s per-row cluster fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrdCluster {
    /// Fila del pad-plane a la que pertenece el cúmulo (5 bits en el original).
    pub row: u8,
    /// Bits de bandera del cúmulo.
    pub flags: TrdClusterFlags,
    /// Número de columnas (pads) que abarca el cúmulo.
    pub n_cols: u16,
    /// Canal de inicio del cúmulo.
    pub start_channel: u16,
    /// Tiempo de inicio del cúmulo.
    pub start_time: u32,
    /// Índices de los digis que forman el cúmulo, en orden de llegada.
    pub digi_indices: Vec<u32>,
}

impl TrdCluster {
    /// `true` si `other` es adyacente a `self` en canal y su tiempo de
    /// inicio está dentro de la ventana de fusión apropiada para su tamaño
    /// (`<=20`, o `<=50` para fragmentos de tamaño 1).
    #[must_use]
    pub fn is_mergeable_with(&self, other: &TrdCluster) -> bool {
        let channel_adjacent =
            other.start_channel == self.start_channel + self.n_cols || self.start_channel == other.start_channel + other.n_cols;
        if !channel_adjacent {
            return false;
        }
        let time_window = if self.n_cols == 1 || other.n_cols == 1 { 50 } else { 20 };
        self.start_time.abs_diff(other.start_time) <= time_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(start_channel: u16, n_cols: u16, start_time: u32) -> TrdCluster {
        TrdCluster {
            row: 0,
            flags: TrdClusterFlags { fasp_type: 0, has_start: true, has_stop: true },
            n_cols,
            start_channel,
            start_time,
            digi_indices: vec![],
        }
    }

    #[test]
    fn adjacent_fragments_within_window_merge() {
        let a = fragment(0, 3, 100);
        let b = fragment(3, 2, 115);
        assert!(a.is_mergeable_with(&b));
    }

    #[test]
    fn non_adjacent_fragments_never_merge() {
        let a = fragment(0, 3, 100);
        let b = fragment(10, 2, 105);
        assert!(!a.is_mergeable_with(&b));
    }

    #[test]
    fn size_one_fragments_get_the_wider_time_window() {
        let a = fragment(0, 1, 100);
        let b = fragment(1, 2, 145);
        assert!(a.is_mergeable_with(&b));
        let c = fragment(0, 2, 100);
        let d = fragment(2, 2, 145);
        assert!(!c.is_mergeable_with(&d));
    }
}
