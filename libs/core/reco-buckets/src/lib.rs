// [libs/core/reco-buckets/src/lib.rs]
#![deny(missing_docs)]

//! # APARATO: BUCKET & PARTITION STRATUM
//! CLASIFICACIÓN: CORE INFRASTRUCTURE (ESTRATO L1)
//! RESPONSABILIDAD: ESTRUCTURAS DE DATOS SIN BLOQUEOS DEL NÚCLEO DE RECONSTRUCCIÓN
//!
//! Contiene los tres tipos de datos "de hoja" sobre los que se construye
//! todo el pipeline de reconstrucción: el contenedor particionado, el
//! valor acolchado a línea de caché, el arreglo de cubos con contador de
//! llenado atómico, y la celda conectora de la lista enlazada sin
//! bloqueos usada por la STS.

/// Definiciones de errores de construcción.
pub mod errors;

/// Valor acolchado a línea de caché (`PaddedToCacheLine<T>`).
pub mod padded;

/// Contenedor particionado (`Partitioned<T>`).
pub mod partitioned;

/// Arreglo de cubos de capacidad fija con contador atómico (`BucketArray<T>`).
pub mod bucket;

/// Celda conectora de 32 bits para listas enlazadas sin bloqueos (`DigiConnector`).
pub mod connector;

pub use crate::bucket::{atomic_max_f32, BucketArray};
pub use crate::connector::{walk_chain, DigiConnector};
pub use crate::errors::BucketError;
pub use crate::padded::{PaddedToCacheLine, SIZE_OF_CACHE_LINE};
pub use crate::partitioned::Partitioned;

/// Reexportaciones de uso frecuente para los crates del estrato superior.
pub mod prelude {
    pub use crate::bucket::{atomic_max_f32, BucketArray};
    pub use crate::connector::{walk_chain, DigiConnector};
    pub use crate::errors::BucketError;
    pub use crate::padded::PaddedToCacheLine;
    pub use crate::partitioned::Partitioned;
}
