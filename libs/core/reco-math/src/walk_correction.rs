// [libs/core/reco-math/src/walk_correction.rs]
//! Corrección de "walk" (dependencia entre el tiempo medido y la amplitud
//! de la señal) para canales TOF/BMon, vía una tabla de corrección por bins
//! de ToT con interpolación lineal hacia el bin vecino.
//!
//! Grounded on `algo/detectors/tof/Calibrate.cxx`'s walk-correction block:
//! el bin se calcula a partir de `(tot - tot_min) / bin_size`, se acota a
//! `[0, num_bins-1]`, y la corrección interpola linealmente hacia el bin de
//! la izquierda o la derecha según el signo del resto fraccionario
//! (desplazado en 0.5 para centrar el bin).

/// Tabla de corrección de walk de un canal, indexada por bin de ToT.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WalkTable {
    tot_min: f64,
    tot_max: f64,
    num_bins: usize,
    corrections: Vec<f64>,
}

impl WalkTable {
    /// Construye una tabla de corrección de walk.
    ///
    /// # Panics
    /// Entra en pánico si `corrections` está vacío o si `tot_max <= tot_min`.
    #[must_use]
    pub fn new(tot_min: f64, tot_max: f64, corrections: Vec<f64>) -> Self {
        assert!(!corrections.is_empty(), "walk table needs at least one bin");
        assert!(tot_max > tot_min, "walk table requires tot_max > tot_min");
        let num_bins = corrections.len();
        Self { tot_min, tot_max, num_bins, corrections }
    }

    /// Evalúa la corrección de tiempo (a restar del tiempo de digi) para un
    /// valor de ToT dado, interpolando linealmente hacia el bin vecino.
    #[must_use]
    pub fn correction_for_tot(&self, tot: f64) -> f64 {
        let bin_size = (self.tot_max - self.tot_min) / self.num_bins as f64;
        let raw_bin = ((tot - self.tot_min) / bin_size).floor() as i64;
        let bin = raw_bin.clamp(0, self.num_bins as i64 - 1) as usize;

        let fractional = (tot - self.tot_min) / bin_size - bin as f64 - 0.5;
        let mut correction = self.corrections[bin];

        if fractional > 0.0 {
            if bin < self.num_bins - 1 {
                correction += fractional * (self.corrections[bin + 1] - self.corrections[bin]);
            }
        } else if bin > 0 {
            correction -= fractional * (self.corrections[bin - 1] - self.corrections[bin]);
        }

        correction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_table_returns_constant_correction() {
        let table = WalkTable::new(0.0, 10.0, vec![2.5; 5]);
        assert_eq!(table.correction_for_tot(0.1), 2.5);
        assert_eq!(table.correction_for_tot(9.9), 2.5);
    }

    #[test]
    fn out_of_range_tot_clamps_to_edge_bin() {
        let table = WalkTable::new(0.0, 10.0, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(table.correction_for_tot(-5.0), table.correction_for_tot(0.05));
        assert_eq!(table.correction_for_tot(500.0), table.correction_for_tot(9.95));
    }

    #[test]
    fn interpolates_toward_neighbor_bin_center() {
        let table = WalkTable::new(0.0, 10.0, vec![0.0, 10.0, 20.0, 30.0, 40.0]);
        // Bin size 2.0; bin 2 spans [4,6), centered at 5.0.
        let at_center = table.correction_for_tot(5.0);
        let past_center = table.correction_for_tot(5.9);
        assert!(past_center > at_center);
    }
}
