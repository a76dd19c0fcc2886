// [libs/core/reco-math/src/landau.rs]
//! Ancho de Landau tabulado en función de la carga de un canal, usado para
//! estimar la incertidumbre de carga de cada tira en un cúmulo STS.
//!
//! Grounded on `algo/detectors/sts/Hitfinder.cxx`'s `LandauWidth(charge)`:
//! una tabla uniformemente espaciada (`landauStepSize`) con interpolación
//! lineal entre los dos puntos vecinos, y saturación en los extremos.

/// Tabla de ancho de Landau: valores uniformemente espaciados cada
/// `step_size` unidades de carga, con interpolación lineal entre muestras.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LandauTable {
    step_size: f32,
    values: Vec<f32>,
}

impl LandauTable {
    /// Construye una tabla a partir de muestras uniformemente espaciadas.
    ///
    /// # Panics
    /// Entra en pánico si `values` tiene menos de 2 elementos o si
    /// `step_size` no es positivo.
    #[must_use]
    pub fn new(step_size: f32, values: Vec<f32>) -> Self {
        assert!(values.len() >= 2, "landau table needs at least two samples");
        assert!(step_size > 0.0, "landau table step size must be positive");
        Self { step_size, values }
    }

    /// Evalúa el ancho de Landau interpolado para una carga dada.
    ///
    /// Satura al primer valor de la tabla para cargas por debajo del primer
    /// escalón, y al último valor para cargas por encima del último escalón,
    /// exactamente como el original: no hay extrapolación fuera de rango.
    #[must_use]
    pub fn width(&self, charge: f32) -> f32 {
        let table_size = self.values.len();
        if charge <= self.step_size {
            return self.values[0];
        }
        if charge > self.step_size * (table_size - 1) as f32 {
            return self.values[table_size - 1];
        }

        let mut table_idx = (charge / self.step_size).ceil() as usize;
        let e2 = table_idx as f32 * self.step_size;
        let v2 = self.values[table_idx];
        table_idx -= 1;
        let e1 = table_idx as f32 * self.step_size;
        let v1 = self.values[table_idx];
        v1 + (charge - e1) * (v2 - v1) / (e2 - e1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> LandauTable {
        LandauTable::new(10.0, vec![1.0, 2.0, 4.0, 8.0])
    }

    #[test]
    fn saturates_below_first_step() {
        let table = sample_table();
        assert_eq!(table.width(0.0), 1.0);
        assert_eq!(table.width(10.0), 1.0);
    }

    #[test]
    fn saturates_above_last_step() {
        let table = sample_table();
        assert_eq!(table.width(1000.0), 8.0);
    }

    #[test]
    fn interpolates_linearly_between_samples() {
        let table = sample_table();
        // Between index 1 (e=10, v=2) and index 2 (e=20, v=4): midpoint charge 15 -> v=3.
        assert!((table.width(15.0) - 3.0).abs() < 1e-6);
    }

    proptest::proptest! {
        #[test]
        fn width_never_exceeds_table_bounds(charge in 0.0f32..500.0) {
            let table = sample_table();
            let width = table.width(charge);
            proptest::prop_assert!(width >= 1.0 && width <= 8.0);
        }
    }
}
