// [libs/domain/reco-model/src/errors.rs]
//! Errores fatales de construcción del dominio de reconstrucción: un
//! error de configuración es el único fatal a este nivel; todo lo demás
//! se cuenta en un `Monitor`, nunca en un `Result`.

use thiserror::Error;

/// Errores fatales en la construcción de un bloque de parámetros o de una
/// topología de detector. Nunca se usa para condiciones transitorias de
/// procesamiento por-digi: esas se cuentan en el `Monitor` correspondiente.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// La máscara de selección de BMon es cero y hay más de un diamante
    /// configurado, o es distinta de cero y hay exactamente un diamante
    /// (exactamente uno de {máscara cero, n-diamantes uno}).
    #[error("invalid BMon selection mask: mask_is_zero={mask_is_zero}, n_diamonds={n_diamonds}")]
    InvalidSelectionMask {
        /// Si la máscara de selección configurada es cero.
        mask_is_zero: bool,
        /// Número de diamantes configurados.
        n_diamonds: usize,
    },

    /// El conjunto de detectores configurado está vacío.
    #[error("empty detector set")]
    EmptyDetectorSet,

    /// Una tabla de calibración (walk, Landau) tiene menos de las muestras
    /// mínimas requeridas para interpolar.
    #[error("calibration table {table} has {len} samples, needs at least {minimum}")]
    UndersizedCalibrationTable {
        /// Nombre de la tabla (para diagnóstico).
        table: &'static str,
        /// Tamaño real de la tabla.
        len: usize,
        /// Tamaño mínimo requerido.
        minimum: usize,
    },
}
