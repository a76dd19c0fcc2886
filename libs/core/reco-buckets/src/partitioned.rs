// [libs/core/reco-buckets/src/partitioned.rs]
//! Contenedor particionado: un vector plano más `offsets[N+1]` y
//! `addresses[N]` paralelos, dando búsqueda O(1) por índice de partición
//! y O(log N) por dirección (vía búsqueda binaria sobre direcciones
//! ordenadas).
//!
//! Grounded on the "Partitioned vector of T" data structure, and on the
//! `StsHits`/`TofHits` partition-by-module usage visible in
//! `reco/app/cbmreco/main.cxx`'s `dumpArchive` (each subsystem's hits are
//! iterated `for m in 0..NPartitions()`, `Partition(m) -> (span, address)`).

use crate::errors::BucketError;

/// Una secuencia plana particionada en rangos contiguos, cada uno etiquetado
/// con una dirección de detector estable.
#[derive(Debug, Clone)]
pub struct Partitioned<T> {
    data: Vec<T>,
    offsets: Vec<usize>,
    addresses: Vec<u64>,
    /// `(address, partition_index)` sorted by address, for O(log N) lookup.
    sorted_address_index: Vec<(u64, usize)>,
}

impl<T> Partitioned<T> {
    /// Construye un contenedor particionado a partir de datos planos,
    /// tamaños de partición y direcciones de partición.
    ///
    /// # Errors
    /// Devuelve `BucketError::SizeMismatch` si la suma de `sizes` no es
    /// igual a `data.len()`, `BucketError::AddressCountMismatch` si
    /// `addresses.len() != sizes.len()`, y `BucketError::DuplicateAddress`
    /// si `addresses` contiene un valor repetido.
    pub fn new(data: Vec<T>, sizes: &[usize], addresses: Vec<u64>) -> Result<Self, BucketError> {
        if addresses.len() != sizes.len() {
            return Err(BucketError::AddressCountMismatch {
                expected: sizes.len(),
                actual: addresses.len(),
            });
        }

        let sizes_sum: usize = sizes.iter().sum();
        if sizes_sum != data.len() {
            return Err(BucketError::SizeMismatch {
                sizes_sum,
                data_len: data.len(),
            });
        }

        let mut sorted_addresses = addresses.clone();
        sorted_addresses.sort_unstable();
        for window in sorted_addresses.windows(2) {
            if window[0] == window[1] {
                return Err(BucketError::DuplicateAddress { address: window[0] });
            }
        }

        let mut offsets = Vec::with_capacity(sizes.len() + 1);
        offsets.push(0usize);
        for &size in sizes {
            offsets.push(offsets.last().copied().unwrap_or(0) + size);
        }

        let mut sorted_address_index: Vec<(u64, usize)> =
            addresses.iter().copied().enumerate().map(|(i, a)| (a, i)).collect();
        sorted_address_index.sort_unstable_by_key(|&(address, _)| address);

        Ok(Self { data, offsets, addresses, sorted_address_index })
    }

    /// Número de particiones.
    #[must_use]
    pub fn n_partitions(&self) -> usize {
        self.addresses.len()
    }

    /// Número total de elementos en el contenedor.
    #[must_use]
    pub fn n_elements(&self) -> usize {
        self.data.len()
    }

    /// Devuelve el rango completo de datos planos, sin particionar.
    #[must_use]
    pub fn data_span(&self) -> &[T] {
        &self.data
    }

    /// Devuelve la partición `i` y su dirección, en O(1).
    ///
    /// # Panics
    /// Entra en pánico si `i >= n_partitions()`.
    #[must_use]
    pub fn partition(&self, i: usize) -> (&[T], u64) {
        let start = self.offsets[i];
        let end = self.offsets[i + 1];
        (&self.data[start..end], self.addresses[i])
    }

    /// Busca la partición con dirección `address` en O(log N).
    ///
    /// Devuelve `None` si no existe ninguna partición con esa dirección.
    #[must_use]
    pub fn partition_by_address(&self, address: u64) -> Option<&[T]> {
        let found = self.sorted_address_index.binary_search_by_key(&address, |&(a, _)| a).ok()?;
        let (_, partition_index) = self.sorted_address_index[found];
        let (span, _) = self.partition(partition_index);
        Some(span)
    }

    /// Las direcciones de partición, en el mismo orden que fueron construidas.
    #[must_use]
    pub fn addresses(&self) -> &[u64] {
        &self.addresses
    }

    /// Los desplazamientos de partición: `offsets[0] = 0`, `offsets[N] = n_elements()`.
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_4_partitioned_vector_construction() {
        let data = vec!['a', 'b', 'c', 'd', 'e'];
        let sizes = [2usize, 0, 3];
        let addresses = vec![10u64, 20, 30];

        let partitioned = Partitioned::new(data, &sizes, addresses).unwrap();

        assert_eq!(partitioned.offsets(), &[0, 2, 2, 5]);
        assert_eq!(partitioned.partition_by_address(20), Some(&[][..]));
        assert_eq!(partitioned.partition_by_address(30), Some(&['c', 'd', 'e'][..]));
        assert_eq!(partitioned.partition_by_address(999), None);
    }

    #[test]
    fn rejects_size_mismatch() {
        let err = Partitioned::new(vec![1, 2, 3], &[1, 1], vec![0, 1]).unwrap_err();
        assert_eq!(err, BucketError::SizeMismatch { sizes_sum: 2, data_len: 3 });
    }

    #[test]
    fn rejects_duplicate_addresses() {
        let err = Partitioned::new(vec![1, 2], &[1, 1], vec![5, 5]).unwrap_err();
        assert_eq!(err, BucketError::DuplicateAddress { address: 5 });
    }

    #[test]
    fn rejects_address_count_mismatch() {
        let err = Partitioned::new(vec![1, 2], &[1, 1], vec![5]).unwrap_err();
        assert_eq!(err, BucketError::AddressCountMismatch { expected: 2, actual: 1 });
    }

    #[test]
    fn partition_by_index_is_o1() {
        let partitioned = Partitioned::new(vec![1, 2, 3, 4], &[1, 3], vec![7, 8]).unwrap();
        assert_eq!(partitioned.partition(0), (&[1][..], 7));
        assert_eq!(partitioned.partition(1), (&[2, 3, 4][..], 8));
    }

    proptest::proptest! {
        #[test]
        fn offsets_always_monotone_and_bracket_data(sizes in proptest::collection::vec(0usize..20, 0..12)) {
            let total: usize = sizes.iter().sum();
            let data: Vec<u32> = (0..total as u32).collect();
            let addresses: Vec<u64> = (0..sizes.len() as u64).collect();

            let partitioned = Partitioned::new(data, &sizes, addresses).unwrap();
            let offsets = partitioned.offsets();

            proptest::prop_assert_eq!(offsets[0], 0);
            proptest::prop_assert_eq!(*offsets.last().unwrap(), total);
            for window in offsets.windows(2) {
                proptest::prop_assert!(window[0] <= window[1]);
            }
        }
    }
}
