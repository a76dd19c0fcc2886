// [libs/core/reco-math/src/lib.rs]
#![deny(missing_docs)]

//! # APARATO: NÚCLEO MATEMÁTICO
//! CLASIFICACIÓN: CORE INFRASTRUCTURE (ESTRATO L1)
//! RESPONSABILIDAD: FÓRMULAS DE GEOMETRÍA Y CALIBRACIÓN SIN ESTADO
//!
//! Funciones puras de bajo nivel reutilizadas por los calibradores y
//! reconstructores por detector: ancho de Landau tabulado (STS), geometría
//! y error de posición de cúmulos (STS), intersección de tiras estéreo y
//! transformación a coordenadas globales (STS), corrección de walk por LUT
//! de bins de ToT (TOF/BMon), y ajuste gaussiano de la función de respuesta
//! de pad (TRD-2D). Ninguna de estas funciones retiene estado entre
//! llamadas; los detectores que las consumen poseen sus propias tablas y
//! parámetros.

/// Ancho de Landau tabulado con interpolación lineal (`LandauTable`).
pub mod landau;

/// Geometría y error de posición de cúmulos STS de tamaño 1, 2 y N.
pub mod sts_cluster;

/// Intersección de tiras estéreo front/back y transformación global.
pub mod sts_hit;

/// Ajuste gaussiano de la función de respuesta de pad TRD.
pub mod trd_prf;

/// Corrección de sesgo de posición (SYS) TRD-2D vía LUT de bins de `|dx|`.
pub mod sys_correction;

/// Corrección de walk TOF/BMon vía LUT de bins de ToT.
pub mod walk_correction;

pub use landau::LandauTable;
pub use sts_cluster::{cluster_geometry_size1, cluster_geometry_size2, cluster_geometry_size_n, AsicParams, ClusterGeometry, ClusterStrip};
pub use sts_hit::{cluster_position_to_local, intersect_stereo_lines, GlobalTransform, Intersection, ModuleGeometry};
pub use sys_correction::{SysCorrectionTable, SYS_TABLE_BINS, SYS_TABLE_BIN_WIDTH};
pub use trd_prf::{fit_gaussian_prf, integrate_prf, PadTriplet, PrfFit};
pub use walk_correction::WalkTable;

/// Reexportaciones de uso frecuente para los crates del estrato superior.
pub mod prelude {
    pub use crate::landau::LandauTable;
    pub use crate::sts_cluster::{cluster_geometry_size1, cluster_geometry_size2, cluster_geometry_size_n, AsicParams, ClusterGeometry, ClusterStrip};
    pub use crate::sts_hit::{cluster_position_to_local, intersect_stereo_lines, GlobalTransform, Intersection, ModuleGeometry};
    pub use crate::sys_correction::{SysCorrectionTable, SYS_TABLE_BINS, SYS_TABLE_BIN_WIDTH};
    pub use crate::trd_prf::{fit_gaussian_prf, integrate_prf, PadTriplet, PrfFit};
    pub use crate::walk_correction::WalkTable;
}
