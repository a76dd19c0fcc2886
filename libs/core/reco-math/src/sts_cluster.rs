// [libs/core/reco-math/src/sts_cluster.rs]
//! Fórmulas de posición y error de posición para cúmulos STS de tamaño 1, 2
//! y N, y el cómputo de su incertidumbre de carga por tira.
//!
//! Grounded on `algo/detectors/sts/Hitfinder.cxx`'s
//! `CreateClusterFromConnectors{1,2,N}`. Cada función reproduce exactamente
//! las fórmulas algebraicas del original (incluida la propagación de errores
//! por suma en cuadratura), traducidas de punteros/lambdas de captura a
//! entrada/salida explícitas.

use crate::landau::LandauTable;

/// Parámetros físicos del front-end de lectura (ASIC) de un módulo STS,
/// usados para convertir ADC a carga y para estimar incertidumbres.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct AsicParams {
    /// Ruido electrónico del canal, en unidades de carga.
    pub noise: f32,
    /// Resolución temporal del ASIC, en las mismas unidades que el tiempo de digi.
    pub time_resolution: f32,
    /// Rango dinámico total del ADC.
    pub dynamic_range: f32,
    /// Número de pasos ADC (p. ej. 256 para un ADC de 8 bits).
    pub n_adc: u32,
}

impl AsicParams {
    fn digitization_error_sq(&self) -> f32 {
        let charge_per_adc = self.dynamic_range / self.n_adc as f32;
        charge_per_adc * charge_per_adc / 12.0
    }
}

/// Posición, error de posición, carga y tiempo calculados para un cúmulo,
/// antes de anexar el lado (front/back) o el índice de módulo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterGeometry {
    /// Posición del cúmulo en unidades de canal (puede ser fraccionaria).
    pub position: f32,
    /// Desviación estándar de la posición, en unidades de canal.
    pub position_error: f32,
    /// Carga total del cúmulo.
    pub charge: f32,
    /// Tiempo promedio del cúmulo.
    pub time: f32,
    /// Desviación estándar del tiempo.
    pub time_error: f32,
}

/// El error de posición de un cúmulo de un solo canal: `1/sqrt(24)`, la
/// desviación estándar de una distribución uniforme de ancho unitario.
///
/// Grounded exactly on `Hitfinder.cxx:304`.
#[must_use]
pub fn single_channel_position_error() -> f32 {
    1.0 / 24.0f32.sqrt()
}

/// Geometría de un cúmulo de un solo canal.
#[must_use]
pub fn cluster_geometry_size1(asic: &AsicParams, channel: f32, charge: f32, time: f32) -> ClusterGeometry {
    ClusterGeometry {
        position: channel,
        position_error: single_channel_position_error(),
        charge,
        time,
        time_error: asic.time_resolution,
    }
}

/// Geometría de un cúmulo de dos canales adyacentes, ponderada por carga.
///
/// `channel1` debe ser el canal más a la izquierda tras resolver la
/// periodicidad del borde (el llamador resta `n_channels` si es necesario,
/// como hace el original antes de invocar esta fórmula).
#[must_use]
pub fn cluster_geometry_size2(
    asic: &AsicParams,
    landau: &LandauTable,
    channel1: f32,
    charge1: f32,
    charge2: f32,
    time1: f32,
    time2: f32,
) -> ClusterGeometry {
    let noise_sq = asic.noise * asic.noise;
    let digit_sq = asic.digitization_error_sq();

    let width1 = landau.width(charge1);
    let eq1_sq = width1 * width1 + noise_sq + digit_sq;
    let width2 = landau.width(charge2);
    let eq2_sq = width2 * width2 + noise_sq + digit_sq;

    let time = 0.5 * (time1 + time2);
    let time_error = asic.time_resolution * std::f32::consts::FRAC_1_SQRT_2;

    let x = channel1 + 0.5 + (charge2 - charge1) / 3.0 / charge1.max(charge2);

    let (ex0_sq, ex1_sq, ex2_sq) = if charge1 < charge2 {
        (
            (charge2 - charge1).powi(2) / charge2.powi(2) / 72.0,
            eq1_sq / charge2.powi(2) / 9.0,
            eq2_sq * charge1.powi(2) / charge2.powi(4) / 9.0,
        )
    } else {
        (
            (charge2 - charge1).powi(2) / charge1.powi(2) / 72.0,
            eq1_sq * charge2.powi(2) / charge1.powi(4) / 9.0,
            eq2_sq / charge1.powi(2) / 9.0,
        )
    };
    let position_error = (ex0_sq + ex1_sq + ex2_sq).sqrt();

    ClusterGeometry {
        position: x,
        position_error,
        charge: charge1 + charge2,
        time,
        time_error,
    }
}

/// Una tira perteneciente a un cúmulo de tres o más canales, en el orden en
/// que aparece en la cadena de conectores (de izquierda a derecha).
#[derive(Debug, Clone, Copy)]
pub struct ClusterStrip {
    /// Número de canal de la tira.
    pub channel: i32,
    /// Carga de la tira, ya convertida de ADC.
    pub charge: f32,
    /// Tiempo de digi de la tira.
    pub time: u32,
}

/// Geometría de un cúmulo de tres o más canales.
///
/// `strips` debe contener al menos 3 elementos, en orden de cadena; el
/// primero y el último son tratados como los extremos ("F" y "L") y todos
/// los intermedios se promedian como tira central ("M"), exactamente como
/// el original.
///
/// # Panics
/// Entra en pánico si `strips.len() < 3`.
#[must_use]
pub fn cluster_geometry_size_n(asic: &AsicParams, landau: &LandauTable, strips: &[ClusterStrip]) -> ClusterGeometry {
    assert!(strips.len() >= 3, "size-N cluster geometry needs at least 3 strips");

    let noise_sq = asic.noise * asic.noise;
    let digit_sq = asic.digitization_error_sq();

    let charge_error_sq = |charge: f32| -> f32 {
        let width = landau.width(charge);
        width * width + noise_sq + digit_sq
    };

    let first = strips.first().unwrap();
    let last = strips.last().unwrap();
    let middle = &strips[1..strips.len() - 1];

    let n_digis = strips.len() as f32;
    let t_sum: f32 = strips.iter().map(|s| s.time as f32).sum();
    let t_resol_sum = asic.time_resolution * n_digis;
    let time = t_sum / n_digis;
    let time_error = (t_resol_sum / n_digis) / n_digis.sqrt();

    let x_sum: f32 = strips.iter().map(|s| s.charge * s.channel as f32).sum();

    let q_f = first.charge;
    let eq_f_sq = charge_error_sq(q_f);
    let q_l = last.charge;
    let eq_l_sq = charge_error_sq(q_l);
    let q_m_total: f32 = middle.iter().map(|s| s.charge).sum();
    let eq_m_sq_total: f32 = middle.iter().map(|s| charge_error_sq(s.charge)).sum();
    let n_middle = middle.len() as f32;
    let q_m = q_m_total / n_middle;
    let eq_m_sq = eq_m_sq_total / n_middle;

    let q_sum = q_f + q_m_total + q_l;

    let chan_f = first.channel as f32;
    let chan_l = last.channel as f32;
    let mut x = 0.5 * (chan_f + chan_l + (q_l - q_f) / q_m);

    let ex_f_sq = eq_f_sq / q_m / q_m / 4.0;
    let ex_m_sq = eq_m_sq * (q_l - q_f).powi(2) / q_m.powi(4) / 4.0;
    let ex_l_sq = eq_l_sq / q_m / q_m / 4.0;
    let position_error = (ex_f_sq + ex_m_sq + ex_l_sq).sqrt();

    if x < chan_f || x > chan_l {
        x = x_sum / q_sum;
    }

    ClusterGeometry {
        position: x,
        position_error,
        charge: q_sum,
        time,
        time_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asic() -> AsicParams {
        AsicParams { noise: 1000.0, time_resolution: 5.0, dynamic_range: 150_000.0, n_adc: 256 }
    }

    fn landau() -> LandauTable {
        LandauTable::new(5000.0, vec![2000.0, 3000.0, 4000.0, 5000.0, 6000.0])
    }

    #[test]
    fn scenario_2_single_channel_cluster_has_exact_position_error() {
        let geometry = cluster_geometry_size1(&asic(), 42.0, 25_000.0, 100.0);
        assert_eq!(geometry.position, 42.0);
        assert!((geometry.position_error - 1.0 / 24.0f32.sqrt()).abs() < 1e-7);
    }

    #[test]
    fn size2_symmetric_charges_land_at_midpoint() {
        let geometry = cluster_geometry_size2(&asic(), &landau(), 10.0, 25_000.0, 25_000.0, 100.0, 104.0);
        assert!((geometry.position - 10.5).abs() < 1e-5);
        assert_eq!(geometry.charge, 50_000.0);
        assert!((geometry.time - 102.0).abs() < 1e-5);
    }

    #[test]
    fn size2_unequal_charges_skew_toward_larger_charge_side() {
        let symmetric = cluster_geometry_size2(&asic(), &landau(), 10.0, 25_000.0, 25_000.0, 100.0, 100.0);
        let skewed = cluster_geometry_size2(&asic(), &landau(), 10.0, 10_000.0, 40_000.0, 100.0, 100.0);
        assert!(skewed.position > symmetric.position);
    }

    #[test]
    fn size_n_reconstructs_symmetric_triplet_at_the_middle_channel() {
        let strips = [
            ClusterStrip { channel: 10, charge: 20_000.0, time: 100 },
            ClusterStrip { channel: 11, charge: 40_000.0, time: 101 },
            ClusterStrip { channel: 12, charge: 20_000.0, time: 102 },
        ];
        let geometry = cluster_geometry_size_n(&asic(), &landau(), &strips);
        assert!((geometry.position - 11.0).abs() < 1e-4);
        assert_eq!(geometry.charge, 80_000.0);
    }

    #[test]
    #[should_panic(expected = "at least 3 strips")]
    fn size_n_rejects_fewer_than_three_strips() {
        let strips =
            [ClusterStrip { channel: 1, charge: 1.0, time: 0 }, ClusterStrip { channel: 2, charge: 1.0, time: 0 }];
        cluster_geometry_size_n(&asic(), &landau(), &strips);
    }
}
