// [libs/domain/detectors/src/prefix_sum.rs]
//! Ensamblado de fragmentos de resultado por-hilo en un `Partitioned<T>`
//! final, vía el patrón de "prefix-sum reduce" usado uniformemente por
//! todas las etapas de búsqueda de hits.
//!
//! Grounded exactly on `algo/detectors/tof/Hitfind.cxx`: cada hilo llena un
//! fragmento local por RPC; una sección de un solo hilo (`CBM_OMP(single)`)
//! calcula la suma acumulada (`prefix[tid+1] = prefix[tid] + fragment.size()`)
//! sobre los tamaños de fragmento; luego todos los hilos copian su fragmento
//! al segmento correspondiente del arreglo final. Aquí la suma acumulada se
//! expresa explícitamente en `fragment_offsets`, y la copia paralela se
//! delega al `collect()` de `rayon`, que garantiza el mismo orden final que
//! una concatenación secuencial de los fragmentos — la contraparte segura
//! de la escritura por puntero crudo del original.

use rayon::prelude::*;
use reco_core_buckets::{BucketError, Partitioned};

/// Un fragmento de resultado producido por un solo hilo/módulo/RPC/fila:
/// su dirección de partición más los elementos que contribuyó.
pub struct ThreadFragment<T> {
    /// Dirección de la partición a la que pertenece este fragmento.
    pub address: u64,
    /// Elementos producidos por este hilo para esa partición.
    pub items: Vec<T>,
}

impl<T> ThreadFragment<T> {
    /// Construye un fragmento vacío para la dirección dada.
    #[must_use]
    pub fn empty(address: u64) -> Self {
        Self { address, items: Vec::new() }
    }
}

/// Calcula los desplazamientos acumulados (`offsets[0]=0`,
/// `offsets[i+1] = offsets[i] + sizes[i]`) de una lista de tamaños de
/// fragmento, exactamente el paso de un solo hilo del patrón de
/// prefix-sum antes de la copia paralela.
#[must_use]
pub fn fragment_offsets(sizes: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(sizes.len() + 1);
    offsets.push(0usize);
    for &size in sizes {
        offsets.push(offsets.last().copied().unwrap_or(0) + size);
    }
    offsets
}

/// Ensambla una lista de fragmentos por-hilo en un `Partitioned<T>`, en el
/// mismo orden en que los fragmentos fueron provistos.
///
/// # Errors
/// Propaga `BucketError` si las direcciones de los fragmentos no son únicas
/// (ver `Partitioned::new`).
pub fn stitch<T: Send>(fragments: Vec<ThreadFragment<T>>) -> Result<Partitioned<T>, BucketError> {
    let sizes: Vec<usize> = fragments.iter().map(|f| f.items.len()).collect();
    let addresses: Vec<u64> = fragments.iter().map(|f| f.address).collect();

    // Paso de un solo hilo: calcular la suma acumulada de tamaños. No se
    // usa directamente para indexar (eso lo hace `Partitioned::new`), pero
    // es el paso explícito que el patrón original describe.
    let _offsets = fragment_offsets(&sizes);

    let data: Vec<T> = fragments.into_par_iter().flat_map_iter(|fragment| fragment.items.into_iter()).collect();
    Partitioned::new(data, &sizes, addresses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_accumulate_fragment_sizes() {
        assert_eq!(fragment_offsets(&[2, 0, 3]), vec![0, 2, 2, 5]);
    }

    #[test]
    fn stitch_preserves_fragment_order_and_addresses() {
        let fragments = vec![
            ThreadFragment { address: 10, items: vec!['a', 'b'] },
            ThreadFragment { address: 20, items: vec![] },
            ThreadFragment { address: 30, items: vec!['c', 'd', 'e'] },
        ];
        let partitioned = stitch(fragments).unwrap();
        assert_eq!(partitioned.offsets(), &[0, 2, 2, 5]);
        assert_eq!(partitioned.partition_by_address(30), Some(&['c', 'd', 'e'][..]));
    }

    #[test]
    fn stitch_rejects_duplicate_addresses() {
        let fragments = vec![
            ThreadFragment::<u32> { address: 1, items: vec![] },
            ThreadFragment::<u32> { address: 1, items: vec![] },
        ];
        assert!(stitch(fragments).is_err());
    }
}
