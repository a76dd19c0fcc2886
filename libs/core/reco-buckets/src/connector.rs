// [libs/core/reco-buckets/src/connector.rs]
//! Celda de 32 bits para la lista enlazada sin bloqueos usada por la
//! conexión de digis de la STS.
//!
//! Grounded on `algo/detectors/sts/Hitfinder.h`'s `DigiConnector`: a packed
//! `unsigned int hasPreviousAndNext` where bit 31 is the has-previous flag
//! and bits 0..30 are the successor index, mutated only through a
//! compare-and-swap loop on the whole word so the two fields never tear.
//!
//! Index 0 can never be a successor by construction (the head
//! of a chain never links backward), so `0` doubles as the "no successor"
//! sentinel and `next_index()` returns `Option<u32>` accordingly. Contrast
//! with the reference implementation, which instead reserves bit 31 alone
//! for has-previous and leaves next-index's 0 ambiguous in text but
//! unambiguous in practice for the same reason; this type makes that
//! invariant explicit in the API rather than leaving it implicit in caller
//! discipline.

use std::sync::atomic::{AtomicU32, Ordering};

const HAS_PREVIOUS_BIT: u32 = 1 << 31;
const NEXT_INDEX_MASK: u32 = !HAS_PREVIOUS_BIT;

/// Una celda conectora atómica: `{has_previous: bool, next_index: u31}`.
#[derive(Default)]
pub struct DigiConnector(AtomicU32);

impl DigiConnector {
    /// Crea una celda nueva sin predecesor ni sucesor.
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// `true` si algún digi ya conectó hacia este como sucesor.
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.0.load(Ordering::Acquire) & HAS_PREVIOUS_BIT != 0
    }

    /// El índice del digi siguiente en la cadena, si existe.
    #[must_use]
    pub fn next_index(&self) -> Option<u32> {
        let next = self.0.load(Ordering::Acquire) & NEXT_INDEX_MASK;
        if next == 0 {
            None
        } else {
            Some(next)
        }
    }

    /// Marca este conector como poseedor de un predecesor, vía CAS loop.
    ///
    /// Se llama sobre el conector del *vecino* que un digi decide conectar
    /// hacia adelante: el propio digi escribe `next` en su propia celda, y
    /// el vecino recibe `has_previous = true` en la suya.
    pub fn set_has_previous(&self) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let desired = current | HAS_PREVIOUS_BIT;
            if desired == current {
                return;
            }
            match self.0.compare_exchange_weak(current, desired, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    /// Escribe `next_index` (1-based; nunca 0) en esta celda vía CAS loop,
    /// preservando el bit `has_previous` existente.
    ///
    /// # Panics
    /// Entra en pánico si `next_index == 0`, ya que 0 está reservado como
    /// centinela de "sin sucesor".
    pub fn set_next(&self, next_index: u32) {
        assert!(next_index != 0 && next_index & HAS_PREVIOUS_BIT == 0, "next_index out of range");
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let desired = (current & HAS_PREVIOUS_BIT) | next_index;
            match self.0.compare_exchange_weak(current, desired, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    /// Conecta `self` (dueño) hacia `peer` (sucesor candidato): escribe
    /// `next = peer_index` en `self` y `has_previous = true` en `peer`.
    ///
    /// Esto corresponde exactamente a un CAS de dos campos sobre la celda
    /// de 32 bits: ambas escrituras ocurren en celdas distintas pero cada
    /// una es atómica sobre su propia palabra.
    pub fn connect(&self, peer: &DigiConnector, peer_index: u32) {
        self.set_next(peer_index);
        peer.set_has_previous();
    }
}

/// Recorre la cadena de conectores a partir de `start_index`, devolviendo
/// los índices de todos los digis pertenecientes al mismo cúmulo (incluido
/// `start_index`), en el orden de la cadena `next`.
///
/// Se usa en Stage 4 para materializar el tamaño y contenido de un cúmulo
/// a partir de su digi "cabeza" (aquel sin predecesor).
#[must_use]
pub fn walk_chain(connectors: &[DigiConnector], start_index: u32) -> Vec<u32> {
    let mut chain = vec![start_index];
    let mut current = start_index;
    while let Some(next) = connectors[current as usize].next_index() {
        chain.push(next);
        current = next;
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn fresh_connector_has_no_previous_and_no_next() {
        let connector = DigiConnector::new();
        assert!(!connector.has_previous());
        assert_eq!(connector.next_index(), None);
    }

    #[test]
    fn connect_sets_both_fields_without_tearing() {
        let owner = DigiConnector::new();
        let peer = DigiConnector::new();
        owner.connect(&peer, 5);

        assert_eq!(owner.next_index(), Some(5));
        assert!(!owner.has_previous());
        assert!(peer.has_previous());
        assert_eq!(peer.next_index(), None);
    }

    #[test]
    fn walk_chain_follows_next_links() {
        let connectors: Vec<DigiConnector> = (0..4).map(|_| DigiConnector::new()).collect();
        connectors[0].connect(&connectors[1], 1);
        connectors[1].connect(&connectors[2], 2);
        connectors[2].connect(&connectors[3], 3);

        assert_eq!(walk_chain(&connectors, 0), vec![0, 1, 2, 3]);
    }

    #[test]
    fn connector_graph_is_a_forest_regardless_of_connection_order() {
        // After the connection stage, every node has at most one `next`
        // and at most one predecessor, regardless of digi ordering.
        let connectors: Vec<DigiConnector> = (0..64).map(|_| DigiConnector::new()).collect();

        // Each node i (except the last) races to connect to i+1; only the
        // first writer's `next` should stick (the API itself makes a
        // second `set_next` overwrite deliberate, so callers must only
        // call `connect` once per owner — verified here for one call each).
        (0..63).into_par_iter().for_each(|i| {
            connectors[i].connect(&connectors[i + 1], (i + 1) as u32);
        });

        let mut previous_counts = vec![0u32; 64];
        for connector in &connectors {
            if let Some(next) = connector.next_index() {
                previous_counts[next as usize] += 1;
            }
        }
        assert!(previous_counts.iter().all(|&count| count <= 1));
    }
}
