// [libs/core/reco-buckets/src/bucket.rs]
//! Arreglo de cubos de capacidad fija con contador de llenado atómico y
//! monitor de desbordamiento.
//!
//! Grounded on `algo/detectors/sts/Hitfinder.h`'s `AddCluster()` (an
//! `atomic_add` on a fill-count, with writes past `maxClustersPerModule`
//! silently dropped and counted) and `SaveMaxError()` (a CAS loop
//! implementing atomic-max for `f32`, since floats have no native atomic
//! max primitive). The sharded fill-count/overflow idiom itself mirrors
//! `libs/core/probabilistic/src/sharded.rs`'s `aggregated_identity_count`
//! (an `AtomicUsize` updated via `fetch_add` alongside a `RwLock`-guarded
//! payload) — here the payload slots are themselves the atomically-claimed
//! cells, so no lock is needed at all.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Un cubo de capacidad fija: los escritores reclaman un índice con
/// `fetch_add` y escriben ahí sin más sincronización; los que exceden la
/// capacidad se cuentan en `overflow` en vez de redimensionar el cubo.
///
/// `T` se almacena detrás de un `Mutex<Option<T>>` por celda para permitir
/// cualquier tipo (no solo los que implementan `Copy`); el costo de la
/// celda sigue siendo de grano fino (un lock por elemento, nunca uno global)
/// y cada celda se toca exactamente una vez por timeslice, así que no hay
/// contención real entre escritores de distintos índices.
pub struct BucketArray<T> {
    capacity: usize,
    fill_count: AtomicUsize,
    overflow_count: AtomicUsize,
    slots: Vec<Mutex<Option<T>>>,
}

impl<T> BucketArray<T> {
    /// Crea un cubo vacío de capacidad `capacity`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || Mutex::new(None));
        Self {
            capacity,
            fill_count: AtomicUsize::new(0),
            overflow_count: AtomicUsize::new(0),
            slots,
        }
    }

    /// La capacidad fija del cubo.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserta `value`, reclamando atómicamente el siguiente índice libre.
    ///
    /// Si el cubo ya está lleno, el valor se descarta y `overflow_count` se
    /// incrementa; esto nunca entra en pánico ni redimensiona el cubo.
    /// Overflow is always a counter, never an exception.
    ///
    /// Devuelve el índice de inserción si tuvo éxito.
    pub fn push(&self, value: T) -> Option<usize> {
        let claimed_index = self.fill_count.fetch_add(1, Ordering::Relaxed);
        if claimed_index >= self.capacity {
            self.overflow_count.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        *self.slots[claimed_index].lock().expect("bucket slot lock poisoned") = Some(value);
        Some(claimed_index)
    }

    /// Cantidad de elementos aceptados hasta ahora (nunca excede `capacity`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.fill_count.load(Ordering::Relaxed).min(self.capacity)
    }

    /// Cantidad de inserciones intentadas hasta ahora, sin acotar por
    /// `capacity` (a diferencia de [`Self::len`]). El `fetch_add` de
    /// [`Self::push`] sigue avanzando más allá de la capacidad incluso
    /// cuando la escritura se descarta por desbordamiento; este contador
    /// expone ese valor crudo, que es lo que un llamador que implementa
    /// una guarda de evento monstruo (`nHitsWritten > 2*maxHitsPerModule`)
    /// necesita comparar, no el conteo ya acotado de `len()`.
    #[must_use]
    pub fn attempted_count(&self) -> usize {
        self.fill_count.load(Ordering::Relaxed)
    }

    /// `true` si no se ha insertado ningún elemento.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cantidad de inserciones rechazadas por desbordamiento.
    #[must_use]
    pub fn overflow_count(&self) -> usize {
        self.overflow_count.load(Ordering::Relaxed)
    }

    /// Drena el cubo en un `Vec<T>` ordinario, en orden de índice.
    ///
    /// Se usa al final de una etapa para pasar los elementos aceptados al
    /// siguiente paso (p. ej. de Stage 4 a Stage 5 en el hit finder STS).
    pub fn into_vec(self) -> Vec<T> {
        let accepted = self.len();
        self.slots
            .into_iter()
            .take(accepted)
            .map(|slot| slot.into_inner().expect("bucket slot lock poisoned").expect("slot within fill_count must be occupied"))
            .collect()
    }
}

/// Actualiza `target` a `max(target, candidate)` mediante un bucle CAS.
///
/// `f32` no tiene una primitiva atómica de máximo nativa; este es el patrón
/// canónico (bit-reinterpretar como `u32`, comparar como flotante, CAS).
/// Grounded on `Hitfinder.h`'s `SaveMaxError()`.
pub fn atomic_max_f32(target: &AtomicU32, candidate: f32) {
    let mut current_bits = target.load(Ordering::Relaxed);
    loop {
        let current = f32::from_bits(current_bits);
        if candidate <= current {
            return;
        }
        match target.compare_exchange_weak(
            current_bits,
            candidate.to_bits(),
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(observed_bits) => current_bits = observed_bits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn accepts_up_to_capacity_and_counts_overflow() {
        let bucket = BucketArray::with_capacity(3);
        assert_eq!(bucket.push(1), Some(0));
        assert_eq!(bucket.push(2), Some(1));
        assert_eq!(bucket.push(3), Some(2));
        assert_eq!(bucket.push(4), None);
        assert_eq!(bucket.len(), 3);
        assert_eq!(bucket.overflow_count(), 1);
        assert_eq!(bucket.attempted_count(), 4);
    }

    #[test]
    fn concurrent_push_never_exceeds_capacity() {
        let bucket = BucketArray::with_capacity(100);
        (0..1000).into_par_iter().for_each(|i| {
            bucket.push(i);
        });
        assert_eq!(bucket.len(), 100);
        assert_eq!(bucket.overflow_count(), 900);
    }

    #[test]
    fn atomic_max_f32_keeps_the_larger_value() {
        let target = AtomicU32::new(0.0f32.to_bits());
        atomic_max_f32(&target, 1.5);
        atomic_max_f32(&target, 0.5);
        atomic_max_f32(&target, 3.0);
        assert_eq!(f32::from_bits(target.load(Ordering::Relaxed)), 3.0);
    }

    #[test]
    fn atomic_max_f32_under_contention_finds_the_true_max() {
        let target = AtomicU32::new(0.0f32.to_bits());
        (0..500).into_par_iter().for_each(|i| {
            atomic_max_f32(&target, i as f32);
        });
        assert_eq!(f32::from_bits(target.load(Ordering::Relaxed)), 499.0);
    }
}
