// [libs/domain/detectors/src/errors.rs]
//! Errores fatales de construcción de los buscadores de cúmulos/hits por
//! detector: violaciones de configuración son fatales en el momento de
//! construcción.
//!
//! Ninguna condición transitoria de procesamiento por-digi aparece aquí;
//! esas se cuentan en el `Monitor` correspondiente de `reco-domain-model`.

use thiserror::Error;

/// Errores fatales en la construcción de un buscador de cúmulos/hits o de
/// su configuración de entrada.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectorError {
    /// El bloque de parámetros de un módulo/RPC/diamante no existe en el
    /// arreglo de parámetros provisto.
    #[error("no parameter block for module index {module_index}")]
    MissingModuleParams {
        /// Índice de módulo/RPC/diamante solicitado.
        module_index: usize,
    },

    /// Se pidió un pipeline con cero módulos configurados.
    #[error("empty module set")]
    EmptyModuleSet,

    /// Las capacidades de cúmulos u hits configuradas no son positivas.
    #[error("non-positive bucket capacity: {capacity} for {what}")]
    NonPositiveCapacity {
        /// Qué capacidad era inválida (para diagnóstico).
        what: &'static str,
        /// Valor recibido.
        capacity: i64,
    },

    /// Falló la construcción del pool de hilos del orquestador de búsqueda
    /// de hits, dueño del ciclo de vida de ese pool.
    #[error("failed to build the hit-finder worker pool: {0}")]
    WorkerPoolInit(String),
}

/// Alias de resultado para las operaciones falibles de este crate.
pub type Result<T> = std::result::Result<T, DetectorError>;
