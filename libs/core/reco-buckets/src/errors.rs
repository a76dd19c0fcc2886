// [libs/core/reco-buckets/src/errors.rs]
//! Catálogo de errores de construcción para las estructuras particionadas.
//!
//! Nótese que el desbordamiento de un `BucketArray` nunca aparece aquí:
//! por diseño un desbordamiento es un contador de monitor, no un
//! `Result::Err`. Solo las violaciones de invariante detectadas en tiempo
//! de construcción son fatales.

use thiserror::Error;

/// Errores posibles al construir un `Partitioned<T>` o un `BucketArray<T>`.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BucketError {
    /// La suma de los tamaños de partición no coincide con la longitud del vector de datos.
    #[error("partition sizes sum to {sizes_sum} but data has {data_len} elements")]
    SizeMismatch {
        /// Suma de los tamaños declarados.
        sizes_sum: usize,
        /// Longitud real del vector de datos planos.
        data_len: usize,
    },

    /// Las direcciones de partición contienen un valor duplicado.
    #[error("partition addresses are not unique: duplicate address {address}")]
    DuplicateAddress {
        /// La dirección repetida.
        address: u64,
    },

    /// El número de direcciones no coincide con el número de tamaños.
    #[error("expected {expected} partition addresses, got {actual}")]
    AddressCountMismatch {
        /// Cantidad de tamaños de partición.
        expected: usize,
        /// Cantidad de direcciones provistas.
        actual: usize,
    },
}
