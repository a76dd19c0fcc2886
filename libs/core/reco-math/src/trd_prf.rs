// [libs/core/reco-math/src/trd_prf.rs]
//! Ajuste de la función de respuesta de pad (PRF) gaussiana usada por el
//! reconstructor TRD-2D para estimar la energía depositada de un cúmulo a
//! partir de las cargas por pad.
//!
//! Grounded on `reco/detectors/trd/CbmTrdModuleRec2D.cxx`'s uso de
//! `TF1("prf", "[0]*exp(-0.5*((x-[1])/[2])**2)")` ajustado vía
//! `TF1::Fit` (minimizador de ROOT) con el parámetro de posición fijo en el
//! pad central y un ancho (`prf`) acotado a `[0.45, 10.5]`.
//!
//! El minimizador de ROOT no tiene equivalente directo fuera de ROOT; en su
//! lugar se resuelve la misma familia gaussiana en forma cerrada a partir de
//! tres muestras consecutivas (interpolación parabólica en espacio
//! logarítmico), que es la técnica estándar para localizar el pico de una
//! gaussiana muestreada sin recurrir a un minimizador iterativo.

/// Tres cargas de pad consecutivas centradas en el pad de mayor carga.
#[derive(Debug, Clone, Copy)]
pub struct PadTriplet {
    /// Carga del pad a la izquierda del máximo.
    pub left: f32,
    /// Carga del pad central (máximo local).
    pub center: f32,
    /// Carga del pad a la derecha del máximo.
    pub right: f32,
}

/// Resultado del ajuste de PRF: amplitud (proporcional a la energía
/// depositada), posición fraccionaria del pico relativa al pad central y
/// ancho gaussiano.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrfFit {
    /// Amplitud ajustada de la gaussiana.
    pub amplitude: f32,
    /// Desplazamiento fraccionario del pico respecto al pad central, en
    /// unidades de ancho de pad.
    pub offset: f32,
    /// Ancho (sigma) de la gaussiana ajustada.
    pub sigma: f32,
}

/// Ajusta una gaussiana a tres cargas de pad consecutivas vía interpolación
/// parabólica en espacio logarítmico.
///
/// Devuelve `None` si alguna de las tres cargas no es estrictamente
/// positiva (el logaritmo no está definido) o si el ancho resultante no es
/// finito.
#[must_use]
pub fn fit_gaussian_prf(triplet: PadTriplet) -> Option<PrfFit> {
    if triplet.left <= 0.0 || triplet.center <= 0.0 || triplet.right <= 0.0 {
        return None;
    }

    let log_left = triplet.left.ln();
    let log_center = triplet.center.ln();
    let log_right = triplet.right.ln();

    let denominator = log_left - 2.0 * log_center + log_right;
    if denominator == 0.0 {
        return None;
    }

    let offset = 0.5 * (log_left - log_right) / denominator;
    let sigma_sq = -1.0 / (2.0 * denominator);
    if !sigma_sq.is_finite() || sigma_sq <= 0.0 {
        return None;
    }
    let sigma = sigma_sq.sqrt();

    let amplitude = (log_center + (offset * offset) / (2.0 * sigma_sq)).exp();

    Some(PrfFit { amplitude, offset, sigma })
}

/// Integra la gaussiana ajustada entre `x_lo` y `x_hi`, aproximando la
/// energía depositada total del cúmulo (cf. `fgPRF->Integral(...)`).
#[must_use]
pub fn integrate_prf(fit: &PrfFit, x_lo: f32, x_hi: f32) -> f32 {
    let normal_cdf = |x: f32| -> f32 {
        let z = (x - fit.offset) / (fit.sigma * std::f32::consts::SQRT_2);
        0.5 * (1.0 + erf(z))
    };
    fit.amplitude * fit.sigma * (2.0 * std::f32::consts::PI).sqrt() * (normal_cdf(x_hi) - normal_cdf(x_lo))
}

/// Aproximación racional de la función de error (Abramowitz & Stegun 7.1.26),
/// suficiente para la integración de la PRF gaussiana.
fn erf(x: f32) -> f32 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    const A1: f32 = 0.254_829_592;
    const A2: f32 = -0.284_496_736;
    const A3: f32 = 1.421_413_741;
    const A4: f32 = -1.453_152_027;
    const A5: f32 = 1.061_405_429;
    const P: f32 = 0.327_591_1;

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_triplet_has_zero_offset() {
        let fit = fit_gaussian_prf(PadTriplet { left: 10.0, center: 40.0, right: 10.0 }).unwrap();
        assert!(fit.offset.abs() < 1e-5);
    }

    #[test]
    fn asymmetric_triplet_shifts_offset_toward_larger_neighbor() {
        let fit = fit_gaussian_prf(PadTriplet { left: 20.0, center: 40.0, right: 10.0 }).unwrap();
        assert!(fit.offset < 0.0);
    }

    #[test]
    fn non_positive_charge_has_no_fit() {
        assert!(fit_gaussian_prf(PadTriplet { left: 0.0, center: 40.0, right: 10.0 }).is_none());
    }

    #[test]
    fn integral_over_whole_real_line_approaches_total_energy() {
        let fit = PrfFit { amplitude: 40.0, offset: 0.0, sigma: 0.65 };
        let integral = integrate_prf(&fit, -10.0, 10.0);
        let expected = fit.amplitude * fit.sigma * (2.0 * std::f32::consts::PI).sqrt();
        assert!((integral - expected).abs() < 1e-2);
    }
}
