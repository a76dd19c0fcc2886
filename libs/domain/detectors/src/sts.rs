// [libs/domain/detectors/src/sts.rs]
//! Pipeline heterogéneo de siete etapas de la silicon tracking system:
//! ordenamiento por canal/tiempo, desplazamientos de canal,
//! conexión de digis vía conectores atómicos, materialización de cúmulos,
//! ordenamiento de cúmulos por tiempo, emparejamiento front/back por
//! intersección de tiras estéreo, y (a nivel de `crate::orchestrator`) el
//! ensamblado de eventos.
//!
//! Grounded on `algo/detectors/sts/Hitfinder.{h,cxx}`. El objetivo de
//! fidelidad de este módulo es preservar los invariantes observables de
//! cada etapa (orden `(channel,time)` tras la etapa 1, bosque de conectores
//! tras la etapa 3, validez de referencias de cúmulo en cada hit emitido)
//! en vez de replicar la sincronización a nivel de bloque de hilos de GPU,
//! que no tiene contraparte en un pool de hilos de CPU.

use reco_core_buckets::{atomic_max_f32, walk_chain, BucketArray, DigiConnector};
use reco_core_math::{
    cluster_geometry_size1, cluster_geometry_size2, cluster_geometry_size_n, intersect_stereo_lines, AsicParams, ClusterStrip,
    GlobalTransform, LandauTable, ModuleGeometry,
};
use reco_domain_model::{Digi, HitCommon, StsCluster, StsHit, StsMonitor};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// Configuración fija de un módulo STS: geometría, parámetros de ASIC,
/// tabla de Landau y capacidades de cubo.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StsModuleConfig {
    /// Parámetros del front-end de lectura.
    pub asic: AsicParams,
    /// Geometría de intersección de tiras estéreo y transformación local.
    pub geometry: ModuleGeometry,
    /// Transformación del módulo al sistema de coordenadas global.
    pub transform: GlobalTransform,
    /// Tabla de ancho de Landau usada para la incertidumbre de carga.
    pub landau: LandauTable,
    /// Capacidad del cubo de cúmulos (por lado; front y back comparten
    /// partición pero cada lado tiene su propio presupuesto de cubo).
    pub max_clusters_per_side: usize,
    /// Capacidad del cubo de hits del módulo.
    pub max_hits: usize,
    /// `timeCutDigiAbs`: ventana de conexión absoluta (stage 3).
    pub time_cut_digi_abs: u32,
    /// `timeCutDigiSig`: ventana de conexión en múltiplos de sigma (stage 3).
    pub time_cut_digi_sig: f32,
    /// Corte de correlación de carga front/back, si está habilitado (stage 6).
    pub charge_delta: Option<f32>,
    /// Corte de tiempo a nivel de cúmulo, si está habilitado (stage 6).
    pub cluster_time_cut: Option<f32>,
}

/// Resultado de procesar un lado (front o back) de un módulo hasta el final
/// de la etapa 5 (cúmulos materializados y ordenados por tiempo).
struct SideResult {
    clusters: Vec<StsCluster>,
    sorted_by_time: Vec<u32>,
    max_time_error: f32,
}

/// Etapa 1: ordena los digis de un lado por la clave compuesta
/// `(channel, time)`. El original usa un radix sort de bloque sobre un
/// búfer de scratch; en el pool de hilos de CPU un `sort_unstable_by_key`
/// ordinario basta, porque el invariante observable que depende la etapa 2
/// es solo el orden final, no el algoritmo.
fn sort_digis_by_channel_time(digis: &mut [(u32, Digi)]) {
    digis.sort_unstable_by_key(|(channel, digi)| (*channel, digi.time));
}

/// Etapa 2: calcula `channelOffsets[c]`, el índice de inicio del canal `c`
/// en el arreglo ya ordenado por `(channel, time)`. Longitud `n_channels+1`;
/// la última entrada es `nDigis`.
fn channel_offsets(sorted: &[(u32, Digi)], n_channels: usize) -> Vec<usize> {
    let mut offsets = vec![sorted.len(); n_channels + 1];
    let mut channel_cursor = 0usize;
    for (i, (channel, _)) in sorted.iter().enumerate() {
        while channel_cursor <= *channel as usize && channel_cursor < n_channels {
            offsets[channel_cursor] = i;
            channel_cursor += 1;
        }
    }
    while channel_cursor <= n_channels {
        offsets[channel_cursor] = sorted.len();
        channel_cursor += 1;
    }
    offsets
}

/// Etapa 3: conecta cada digi con el primer digi compatible del canal
/// siguiente mediante una búsqueda binaria seguida de un recorrido lineal
/// acotado por la ventana `ΔT`, materializando la conexión en el conector
/// atómico del dueño y del vecino.
fn connect_digis(sorted: &[(u32, Digi)], offsets: &[usize], asic: &AsicParams, cfg: &StsModuleConfig) -> Vec<DigiConnector> {
    let connectors: Vec<DigiConnector> = (0..sorted.len()).map(|_| DigiConnector::new()).collect();
    let delta_t = cfg.time_cut_digi_abs.max((cfg.time_cut_digi_sig * std::f32::consts::SQRT_2 * asic.time_resolution) as u32);

    for (owner_index, (channel, digi)) in sorted.iter().enumerate() {
        let next_channel = *channel as usize + 1;
        if next_channel + 1 >= offsets.len() {
            continue;
        }
        let peer_start = offsets[next_channel];
        let peer_end = offsets[next_channel + 1];
        if peer_start >= peer_end {
            continue;
        }
        let peer_slice = &sorted[peer_start..peer_end];

        let lower_bound = digi.time.saturating_sub(delta_t);
        let search_start = peer_slice.partition_point(|(_, peer_digi)| peer_digi.time < lower_bound);

        for offset in search_start..peer_slice.len() {
            let (_, peer_digi) = &peer_slice[offset];
            if peer_digi.time > digi.time + delta_t {
                break;
            }
            let peer_index = peer_start + offset;
            if connectors[peer_index].has_previous() {
                continue;
            }
            connectors[owner_index].connect(&connectors[peer_index], peer_index as u32);
            break;
        }
    }

    connectors
}

/// Etapa 4: para cada digi sin predecesor (cabeza de cadena), recorre el
/// encadenamiento `next` y materializa un cúmulo con la fórmula de
/// geometría correspondiente a su tamaño.
fn materialize_clusters(
    sorted: &[(u32, Digi)],
    connectors: &[DigiConnector],
    asic: &AsicParams,
    landau: &LandauTable,
    n_channels: i32,
    is_back: bool,
    bucket: &BucketArray<StsCluster>,
    max_time_error_bits: &AtomicU32,
) {
    for (head_index, (channel, digi)) in sorted.iter().enumerate() {
        if connectors[head_index].has_previous() {
            continue;
        }
        let chain = walk_chain(connectors, head_index as u32);

        let geometry = match chain.len() {
            1 => cluster_geometry_size1(asic, *channel as f32, digi.charge_or_tot, digi.time as f32),
            2 => {
                let (_, d2) = &sorted[chain[1] as usize];
                cluster_geometry_size2(asic, landau, *channel as f32, digi.charge_or_tot, d2.charge_or_tot, digi.time as f32, d2.time as f32)
            }
            _ => {
                let strips: Vec<ClusterStrip> = chain
                    .iter()
                    .map(|&idx| {
                        let (c, d) = &sorted[idx as usize];
                        ClusterStrip { channel: *c as i32, charge: d.charge_or_tot, time: d.time }
                    })
                    .collect();
                cluster_geometry_size_n(asic, landau, &strips)
            }
        };

        let position = geometry.position + if is_back { n_channels as f32 } else { 0.0 };
        let cluster = StsCluster {
            charge: geometry.charge,
            size: chain.len() as u32,
            position,
            position_error: geometry.position_error,
            time: geometry.time.round() as u32,
            time_error: geometry.time_error,
        };

        atomic_max_f32(max_time_error_bits, geometry.time_error);
        bucket.push(cluster);
    }
}

/// Etapa 5: ordena el arreglo de índices de cúmulo por tiempo, dejando
/// intacto el arreglo de payloads.
fn sorted_cluster_indices(clusters: &[StsCluster]) -> Vec<u32> {
    let mut indices: Vec<u32> = (0..clusters.len() as u32).collect();
    indices.sort_unstable_by_key(|&i| clusters[i as usize].time);
    indices
}

fn process_side(
    mut digis: Vec<(u32, Digi)>,
    cfg: &StsModuleConfig,
    n_channels: usize,
    is_back: bool,
    monitor: &mut StsMonitor,
) -> SideResult {
    sort_digis_by_channel_time(&mut digis);
    let offsets = channel_offsets(&digis, n_channels);
    let connectors = connect_digis(&digis, &offsets, &cfg.asic, cfg);

    let bucket = BucketArray::with_capacity(cfg.max_clusters_per_side);
    let max_time_error_bits = AtomicU32::new(0.0f32.to_bits());
    materialize_clusters(&digis, &connectors, &cfg.asic, &cfg.landau, n_channels as i32, is_back, &bucket, &max_time_error_bits);
    monitor.cluster_bucket_overflow += bucket.overflow_count() as u64;

    let clusters = bucket.into_vec();
    let sorted_by_time = sorted_cluster_indices(&clusters);
    let max_time_error = f32::from_bits(max_time_error_bits.load(Ordering::Relaxed));
    SideResult { clusters, sorted_by_time, max_time_error }
}

/// Etapa 6: empareja cúmulos front/back de un módulo intersectando sus
/// tiras estéreo, avanzando una marca de agua `startB` sobre el arreglo de
/// cúmulos traseros ordenados por tiempo. Guarda de evento monstruo
/// incluida: si el número de hits escritos en `hit_bucket` excede
/// `2*maxHitsPerModule`, el emparejamiento del módulo se detiene ahí
/// (`monitor.monster_event_guard_triggered` lo señala); otros módulos no
/// se ven afectados.
fn match_front_back(front: &SideResult, back: &SideResult, cfg: &StsModuleConfig, hit_bucket: &BucketArray<StsHit>, monitor: &mut StsMonitor) {
    let global_cut = 4.0 * (front.max_time_error.powi(2) + back.max_time_error.powi(2)).sqrt();
    let monster_guard_hits = 2 * cfg.max_hits;
    let mut start_b = 0usize;

    'front: for &front_idx in &front.sorted_by_time {
        let f = &front.clusters[front_idx as usize];

        while start_b < back.sorted_by_time.len() {
            let candidate = &back.clusters[back.sorted_by_time[start_b] as usize];
            if (f.time as f32 - candidate.time as f32) > global_cut {
                start_b += 1;
            } else {
                break;
            }
        }

        for &back_idx in &back.sorted_by_time[start_b..] {
            let b = &back.clusters[back_idx as usize];
            let dt = f.time as f32 - b.time as f32;
            if dt > global_cut {
                continue;
            }
            if -dt > global_cut {
                break;
            }

            let per_pair_cut = 4.0 * (f.time_error.powi(2) + b.time_error.powi(2)).sqrt();
            if dt.abs() > per_pair_cut {
                continue;
            }

            if let Some(charge_delta) = cfg.charge_delta {
                if (f.charge - b.charge).abs() > charge_delta {
                    continue;
                }
            }
            if let Some(cluster_time_cut) = cfg.cluster_time_cut {
                if dt.abs() > cluster_time_cut {
                    continue;
                }
            }

            let x_front = reco_core_math::cluster_position_to_local(&cfg.geometry, f.position, true);
            let x_back = reco_core_math::cluster_position_to_local(&cfg.geometry, b.position, false);

            if let Some(intersection) =
                intersect_stereo_lines(&cfg.geometry, x_front, f.position_error, x_back, b.position_error)
            {
                let global = cfg.transform.to_global(intersection.x, intersection.y, 0.0);
                let hit = StsHit {
                    common: HitCommon {
                        x: global[0],
                        y: global[1],
                        z: global[2],
                        time: ((f.time as f32 + b.time as f32) / 2.0).round() as u32,
                        sigma_x: intersection.var_x.sqrt(),
                        sigma_y: intersection.var_y.sqrt(),
                        sigma_z: 0.0,
                        sigma_t: per_pair_cut / 4.0,
                    },
                    sigma_xy: intersection.var_xy,
                    du: f.position_error,
                    dv: b.position_error,
                    front_cluster_index: front_idx,
                    back_cluster_index: back_idx,
                };
                if hit_bucket.push(hit).is_none() {
                    monitor.hit_bucket_overflow += 1;
                }

                // `attempted_count()`, no `len()`: sigue creciendo más allá
                // de `capacity` aunque la escritura se descarte por desbordamiento.
                if hit_bucket.attempted_count() > monster_guard_hits {
                    monitor.monster_event_guard_triggered += 1;
                    break 'front;
                }
            }
        }
    }
}

/// El pipeline heterogéneo de siete etapas, configurado por módulo.
pub struct StsPipeline {
    configs: Vec<StsModuleConfig>,
    n_channels: usize,
}

/// Resultado de procesar un único módulo: cúmulos front+back concatenados
/// (posiciones de lado trasero ya desplazadas a un rango disjunto del
/// lado front) y los hits emparejados.
pub struct ModuleOutput {
    /// Cúmulos de ambos lados, front primero, luego back.
    pub clusters: Vec<StsCluster>,
    /// Hits emparejados front/back.
    pub hits: Vec<StsHit>,
}

impl StsPipeline {
    /// Construye un pipeline con un bloque de configuración por módulo.
    #[must_use]
    pub fn new(configs: Vec<StsModuleConfig>, n_channels_per_side: usize) -> Self {
        Self { configs, n_channels: n_channels_per_side }
    }

    /// Número de módulos configurados.
    #[must_use]
    pub fn n_modules(&self) -> usize {
        self.configs.len()
    }

    /// Ejecuta las seis etapas de cómputo del módulo `module_index`, a
    /// partir de sus digis crudos de ambos lados (distinguidos por
    /// `address.sensor()`: 0 = front, 1 = back, por convención de este
    /// workspace).
    #[must_use]
    pub fn process_module(&self, module_index: usize, raw_digis: &[Digi]) -> (ModuleOutput, StsMonitor) {
        let start = Instant::now();
        let cfg = &self.configs[module_index];
        let mut monitor = StsMonitor::default();

        let mut front_digis = Vec::new();
        let mut back_digis = Vec::new();
        for digi in raw_digis {
            let channel = digi.address.channel();
            if digi.address.sensor() % 2 == 0 {
                front_digis.push((channel, *digi));
            } else {
                back_digis.push((channel, *digi));
            }
        }

        let front = process_side(front_digis, cfg, self.n_channels, false, &mut monitor);
        let back = process_side(back_digis, cfg, self.n_channels, true, &mut monitor);

        let hit_bucket = BucketArray::with_capacity(cfg.max_hits);
        match_front_back(&front, &back, cfg, &hit_bucket, &mut monitor);
        monitor.hit_bucket_overflow += hit_bucket.overflow_count() as u64;

        let n_front = front.clusters.len();
        let mut clusters = front.clusters;
        clusters.extend(back.clusters);
        let mut hits = hit_bucket.into_vec();
        for hit in &mut hits {
            hit.back_cluster_index += n_front as u32;
        }

        monitor.wall_time = start.elapsed();
        (ModuleOutput { clusters, hits }, monitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_core_math::GlobalTransform;
    use reco_domain_model::{DetectorAddress, Subsystem, TriggerKind};

    fn config() -> StsModuleConfig {
        StsModuleConfig {
            asic: AsicParams { noise: 1000.0, time_resolution: 5.0, dynamic_range: 150_000.0, n_adc: 256 },
            geometry: ModuleGeometry {
                dx: 60.0,
                dy: 40.0,
                pitch: 0.058,
                stereo_front: 0.0,
                stereo_back: 7.5,
                tan_stereo_front: 0.0,
                tan_stereo_back: 7.5f32.to_radians().tan(),
                lorentz_front: 0.0,
                lorentz_back: 0.0,
                n_channels: 1024,
                error_factor: 1.0,
            },
            transform: GlobalTransform { translation: [0.0; 3], rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0] },
            landau: LandauTable::new(5000.0, vec![2000.0, 3000.0, 4000.0, 5000.0, 6000.0]),
            max_clusters_per_side: 64,
            max_hits: 64,
            time_cut_digi_abs: 8,
            time_cut_digi_sig: 0.0,
            charge_delta: None,
            cluster_time_cut: None,
        }
    }

    fn digi(sensor: u16, channel: u32, time: u32, charge: f32) -> Digi {
        Digi { address: DetectorAddress::pack(Subsystem::Sts, 0, sensor, channel), time, charge_or_tot: charge, trigger: TriggerKind::SelfTriggered }
    }

    #[test]
    fn scenario_2_single_digi_front_cluster_has_exact_geometry() {
        let pipeline = StsPipeline::new(vec![config()], 1024);
        let raw = vec![digi(0, 7, 100, 25_000.0)];
        let (output, _) = pipeline.process_module(0, &raw);
        assert_eq!(output.clusters.len(), 1);
        let c = &output.clusters[0];
        assert_eq!(c.size, 1);
        assert_eq!(c.position, 7.0);
        assert!((c.position_error - 1.0 / 24.0f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn adjacent_digis_on_adjacent_channels_form_one_cluster() {
        let pipeline = StsPipeline::new(vec![config()], 1024);
        let raw = vec![digi(0, 10, 100, 25_000.0), digi(0, 11, 101, 20_000.0)];
        let (output, _) = pipeline.process_module(0, &raw);
        assert_eq!(output.clusters.len(), 1);
        assert_eq!(output.clusters[0].size, 2);
    }

    #[test]
    fn front_back_pair_with_matching_time_produces_one_hit() {
        let pipeline = StsPipeline::new(vec![config()], 1024);
        let raw = vec![digi(0, 5, 1000, 30_000.0), digi(1, 3, 1003, 30_000.0)];
        let (output, monitor) = pipeline.process_module(0, &raw);
        assert_eq!(output.clusters.len(), 2);
        assert_eq!(output.hits.len(), 1);
        let hit = &output.hits[0];
        assert!((hit.common.time as f32 - 1001.5).abs() <= 1.0);
        assert_eq!(monitor.hit_bucket_overflow, 0);
    }

    #[test]
    fn monster_event_stops_hit_emission_for_the_module_once_the_guard_fires() {
        let cfg = StsModuleConfig { max_hits: 2, ..config() };
        let pipeline = StsPipeline::new(vec![cfg], 1024);

        // Seis pares front/back bien separados en canal (sin adyacencia
        // dentro de un mismo lado) y próximos en tiempo entre lados, para
        // que cada par produzca un hit independiente: `2*maxHits = 4`, así
        // que el quinto intento debe activar la guarda y cortar el resto.
        let mut raw = Vec::new();
        for i in 0..6u32 {
            let t = 1000 + i * 100;
            raw.push(digi(0, i * 20, t, 30_000.0));
            raw.push(digi(1, i * 20 + 2, t + 3, 30_000.0));
        }

        let (output, monitor) = pipeline.process_module(0, &raw);
        assert_eq!(monitor.monster_event_guard_triggered, 1);
        assert!(output.hits.len() <= 2, "hit bucket capacity must still be respected: {}", output.hits.len());
    }
}
