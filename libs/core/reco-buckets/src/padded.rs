// [libs/core/reco-buckets/src/padded.rs]
//! Valor acolchado a una línea de caché, para evitar "false sharing" en
//! contadores atómicos que distintos hilos actualizan concurrentemente.
//!
//! Grounded on `algo/base/gpu/PaddedValue.h` (reference C++ source): a
//! fixed-size byte pad after the value brings `sizeof(Self)` up to the
//! cache line size, so two `PaddedToCacheLine<AtomicU32>` instances never
//! land on the same cache line.

use std::ops::{Deref, DerefMut};

/// Tamaño nominal de una línea de caché en la mayoría de las arquitecturas x86_64/aarch64.
pub const SIZE_OF_CACHE_LINE: usize = 64;

/// `PaddedValue` acolchado exactamente a una línea de caché (64 bytes).
///
/// El relleno real de bytes entre instancias adyacentes en un `Vec` proviene
/// de `#[repr(align(64))]`, que es la forma idiomática de expresar esta
/// garantía en Rust (el layout C-style de padding manual del original no es
/// necesario: alinear a 64 y dejar que el compilador añada cola de relleno
/// logra el mismo resultado de evitar "false sharing").
#[repr(C, align(64))]
pub struct PaddedToCacheLine<T>(pub T);

impl<T> PaddedToCacheLine<T> {
    /// Construye un nuevo valor acolchado a la línea de caché.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self(value)
    }
}

impl<T> Deref for PaddedToCacheLine<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for PaddedToCacheLine<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn padded_to_cache_line_is_at_least_one_cache_line() {
        assert!(std::mem::size_of::<PaddedToCacheLine<AtomicU32>>() >= SIZE_OF_CACHE_LINE);
    }

    #[test]
    fn adjacent_padded_values_do_not_share_a_cache_line() {
        let values: Vec<PaddedToCacheLine<AtomicU32>> =
            (0..4).map(|i| PaddedToCacheLine::new(AtomicU32::new(i))).collect();

        for window in values.windows(2) {
            let a = &window[0].0 as *const AtomicU32 as usize;
            let b = &window[1].0 as *const AtomicU32 as usize;
            assert!(b - a >= SIZE_OF_CACHE_LINE);
        }
    }
}
