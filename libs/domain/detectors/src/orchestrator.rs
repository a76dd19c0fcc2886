// [libs/domain/detectors/src/orchestrator.rs]
//! Orquestador de búsqueda de hits: no es una etapa de cómputo propia, sino
//! el pegamento que da a los reconstructores STS/TRD/TOF una forma de
//! ejecución uniforme. Para cada detector, un trozo de scratch mutable
//! por-hilo por-módulo (o por-fila, o por-RPC) se construye una vez por
//! timeslice; un parallel-for lo despacha sobre el espacio de índices de
//! partición con una planificación dinámica; los fragmentos de resultado
//! por-hilo se ensamblan con `crate::prefix_sum::stitch`.
//!
//! Grounded on `algo/detectors/tof/Hitfind.cxx`'s orchestration shape (ya
//! citada por `crate::prefix_sum`): el `parallel-for` con planificación
//! dinámica se expresa aquí como `rayon`'s `into_par_iter`, cuyo robo de
//! trabajo entre hilos ociosos es la contraparte segura de una cláusula
//! `schedule(dynamic)` de OpenMP. El orquestador es dueño del ciclo de
//! vida del pool de hilos (dimensionado desde `--omp-threads` o el número
//! de núcleos del host) y es el único punto de llamada que también
//! encauza la colección opcional de tiempos por-etapa solicitada por
//! `--collect-kernel-times`.

use crate::errors::{DetectorError, Result};
use rayon::prelude::*;
use reco_core_buckets::{BucketError, Partitioned};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::prefix_sum::{stitch, ThreadFragment};

/// Configuración del orquestador: tamaño del pool de hilos y si se debe
/// recolectar el tiempo de pared de cada etapa despachada.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrchestratorConfig {
    /// Número de hilos de trabajo (`--omp-threads`); `None` usa el número
    /// de núcleos lógicos del host.
    pub omp_threads: Option<usize>,
    /// Si `true`, cada llamada a [`HitFinderOrchestrator::dispatch`] mide y
    /// devuelve su propio tiempo de pared (`--collect-kernel-times`).
    pub collect_kernel_times: bool,
    /// Índice de acelerador (`--device`), aceptado por compatibilidad de
    /// interfaz con el driver heterogéneo original; este orquestador solo
    /// tiene un backend de pool de hilos de CPU, así que el valor se
    /// conserva sin usarse (ningún stage aquí se despacha a un acelerador).
    pub device: Option<u32>,
}

/// Tiempos de pared por-etapa recolectados durante un timeslice, cuando
/// `OrchestratorConfig::collect_kernel_times` está activo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    /// Tiempo de pared del despacho del pipeline STS.
    pub sts: Option<Duration>,
    /// Tiempo de pared del despacho del reconstructor TRD-2D.
    pub trd2d: Option<Duration>,
    /// Tiempo de pared del despacho del reconstructor TRD-1D.
    pub trd1d: Option<Duration>,
    /// Tiempo de pared del despacho de calibración/búsqueda de hits TOF.
    pub tof: Option<Duration>,
    /// Tiempo de pared del despacho de calibración/búsqueda de hits BMon.
    pub bmon: Option<Duration>,
}

/// Una unidad de trabajo de una sola partición (módulo, fila o RPC): su
/// dirección de partición más el cierre que produce, en el hilo que lo
/// ejecute, el resultado de esa partición.
///
/// El cierre captura el scratch por-partición que el llamador construyó
/// para este timeslice: un trozo de estado mutable por-hilo, por-módulo,
/// construido una sola vez al inicio del timeslice.
pub struct PartitionJob<O> {
    /// Dirección de partición (módulo/fila/RPC) que produce este trabajo.
    pub address: u64,
    run: Box<dyn FnOnce() -> O + Send>,
}

impl<O> PartitionJob<O> {
    /// Construye un trabajo de partición a partir de su dirección y el
    /// cierre que lo ejecuta.
    pub fn new(address: u64, run: impl FnOnce() -> O + Send + 'static) -> Self {
        Self { address, run: Box::new(run) }
    }
}

/// El orquestador de búsqueda de hits: dueño del pool de hilos de trabajo
/// usado uniformemente por TOF, BMon, TRD-2D, TRD-1D y la STS.
pub struct HitFinderOrchestrator {
    pool: rayon::ThreadPool,
    collect_kernel_times: bool,
}

impl HitFinderOrchestrator {
    /// Construye el orquestador y su pool de hilos.
    ///
    /// # Errors
    /// Devuelve `DetectorError::WorkerPoolInit` si `rayon` no puede
    /// construir el pool con el número de hilos solicitado.
    pub fn new(config: OrchestratorConfig) -> Result<Self> {
        let n_threads = config.omp_threads.unwrap_or_else(num_cpus::get).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .map_err(|e| DetectorError::WorkerPoolInit(e.to_string()))?;
        Ok(Self { pool, collect_kernel_times: config.collect_kernel_times })
    }

    /// Número de hilos de trabajo del pool.
    #[must_use]
    pub fn n_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// `true` si este orquestador fue configurado para recolectar tiempos de
    /// pared (`--collect-kernel-times`). Los llamadores que miden sus propias
    /// etapas alrededor de [`Self::install`] (en vez de [`Self::dispatch`],
    /// que ya mide internamente) consultan esto para decidir si vale la pena
    /// tomar un `Instant::now()`.
    #[must_use]
    pub fn collects_kernel_times(&self) -> bool {
        self.collect_kernel_times
    }

    /// Despacha `jobs` sobre el pool de hilos con una planificación
    /// dinámica (parallel-for sobre módulos/filas), devolviendo los
    /// resultados por partición en orden arbitrario junto al tiempo de
    /// pared del despacho, si `collect_kernel_times` está activo.
    pub fn dispatch<O: Send>(&self, jobs: Vec<PartitionJob<O>>) -> (Vec<(u64, O)>, Option<Duration>) {
        let start = self.collect_kernel_times.then(Instant::now);
        let results = self.pool.install(|| jobs.into_par_iter().map(|job| (job.address, (job.run)())).collect());
        (results, start.map(|s| s.elapsed()))
    }

    /// Ejecuta `f` dentro del pool de hilos del orquestador sin exigir que
    /// capture solo datos `'static`, a diferencia de [`Self::dispatch`]. Para
    /// los reconstructores TRD, cuyo estado por-fila vive más allá de un
    /// único timeslice, el llamador necesita tomar prestado mutablemente el
    /// reconstructor dentro del `parallel-for`; `PartitionJob` no puede
    /// expresar ese préstamo porque sus cierres deben ser `'static` para
    /// poder ser encolados como trabajo boxeado. `rayon::ThreadPool::install`
    /// no tiene esa restricción, así que este método la expone directamente.
    pub fn install<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        self.pool.install(f)
    }

    /// Ensambla una lista de resultados `(address, items)` por partición en
    /// un `Partitioned<T>` final, vía `crate::prefix_sum::stitch`. Método de
    /// conveniencia para el caso común de un único vector de salida por
    /// partición (TOF, BMon, y cada mitad front/back de la STS).
    ///
    /// # Errors
    /// Propaga `BucketError` si las direcciones de partición no son únicas.
    pub fn stitch_results<T: Send>(results: Vec<(u64, Vec<T>)>) -> std::result::Result<Partitioned<T>, BucketError> {
        let fragments = results.into_iter().map(|(address, items)| ThreadFragment { address, items }).collect();
        stitch(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn n_threads_defaults_to_the_host_core_count() {
        let orchestrator = HitFinderOrchestrator::new(OrchestratorConfig::default()).unwrap();
        assert_eq!(orchestrator.n_threads(), num_cpus::get().max(1));
    }

    #[test]
    fn n_threads_honours_an_explicit_omp_threads_override() {
        let orchestrator = HitFinderOrchestrator::new(OrchestratorConfig { omp_threads: Some(2), collect_kernel_times: false, ..Default::default() }).unwrap();
        assert_eq!(orchestrator.n_threads(), 2);
    }

    #[test]
    fn dispatch_runs_every_job_and_preserves_no_particular_order_but_full_coverage() {
        let orchestrator = HitFinderOrchestrator::new(OrchestratorConfig { omp_threads: Some(4), collect_kernel_times: false, ..Default::default() }).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let jobs: Vec<PartitionJob<Vec<u32>>> = (0..16)
            .map(|i| {
                let counter = Arc::clone(&counter);
                PartitionJob::new(i as u64, move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    vec![i as u32]
                })
            })
            .collect();

        let (results, elapsed) = orchestrator.dispatch(jobs);
        assert!(elapsed.is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 16);
        assert_eq!(results.len(), 16);
    }

    #[test]
    fn dispatch_collects_wall_time_when_requested() {
        let orchestrator = HitFinderOrchestrator::new(OrchestratorConfig { omp_threads: Some(2), collect_kernel_times: true, ..Default::default() }).unwrap();
        let jobs: Vec<PartitionJob<Vec<u32>>> = vec![PartitionJob::new(0, || vec![1, 2, 3])];
        let (results, elapsed) = orchestrator.dispatch(jobs);
        assert_eq!(results.len(), 1);
        assert!(elapsed.is_some());
    }

    #[test]
    fn collects_kernel_times_reflects_the_config_flag() {
        let on = HitFinderOrchestrator::new(OrchestratorConfig { omp_threads: Some(1), collect_kernel_times: true, ..Default::default() }).unwrap();
        let off = HitFinderOrchestrator::new(OrchestratorConfig { omp_threads: Some(1), collect_kernel_times: false, ..Default::default() }).unwrap();
        assert!(on.collects_kernel_times());
        assert!(!off.collects_kernel_times());
    }

    #[test]
    fn install_runs_a_scoped_non_static_closure_on_the_pool() {
        let orchestrator = HitFinderOrchestrator::new(OrchestratorConfig { omp_threads: Some(2), collect_kernel_times: false, ..Default::default() }).unwrap();
        let mut scratch = vec![0u32; 4];
        orchestrator.install(|| {
            scratch.iter_mut().for_each(|v| *v += 1);
        });
        assert_eq!(scratch, vec![1, 1, 1, 1]);
    }

    #[test]
    fn stitch_results_assembles_a_partitioned_container_in_job_order() {
        let results = vec![(10u64, vec!['a', 'b']), (20u64, vec![]), (30u64, vec!['c'])];
        let partitioned = HitFinderOrchestrator::stitch_results(results).unwrap();
        assert_eq!(partitioned.n_partitions(), 3);
        assert_eq!(partitioned.partition_by_address(30), Some(&['c'][..]));
    }
}
