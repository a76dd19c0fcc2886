// [libs/core/reco-math/src/sts_hit.rs]
//! Intersección de cúmulos front/back sobre tiras estéreo y transformación a
//! coordenadas globales, para la materialización de hits STS.
//!
//! Grounded on `algo/detectors/sts/Hitfinder.cxx`'s `IntersectClusters`,
//! `GetClusterPosition`, `Intersect`, `IsInside`, `ToGlobal` y `CreateHit`.

/// Parámetros geométricos de un módulo STS necesarios para convertir
/// posiciones de cúmulo (en canales) a coordenadas locales y para
/// intersectar tiras estéreo front/back.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ModuleGeometry {
    /// Ancho del sensor a lo largo del eje de lectura.
    pub dx: f32,
    /// Alto del sensor a lo largo del eje perpendicular a las tiras.
    pub dy: f32,
    /// Tamaño de una tira, usado para escalar el error de posición del
    /// cúmulo (en unidades de canal) a unidades físicas.
    pub pitch: f32,
    /// Ángulo estéreo de las tiras delanteras, en grados.
    pub stereo_front: f32,
    /// Ángulo estéreo de las tiras traseras, en grados.
    pub stereo_back: f32,
    /// `tan(stereo_front)`, precalculado.
    pub tan_stereo_front: f32,
    /// `tan(stereo_back)`, precalculado.
    pub tan_stereo_back: f32,
    /// Corrección de desplazamiento de Lorentz en el lado delantero.
    pub lorentz_front: f32,
    /// Corrección de desplazamiento de Lorentz en el lado trasero.
    pub lorentz_back: f32,
    /// Número de canales por lado de un sensor (usado para separar canal de
    /// tira cuando el canal pertenece al lado trasero).
    pub n_channels: i32,
    /// Factor multiplicativo aplicado a las varianzas cuando ambos lados
    /// tienen ángulo estéreo no nulo.
    pub error_factor: f32,
}

/// Traslación (3) y matriz de rotación (3x3, fila mayor) de un módulo hacia
/// el sistema de coordenadas global.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct GlobalTransform {
    /// Vector de traslación `[x, y, z]` del origen del módulo.
    pub translation: [f32; 3],
    /// Matriz de rotación 3x3 en orden fila mayor.
    pub rotation: [f32; 9],
}

impl GlobalTransform {
    /// Transforma un punto local `(lx, ly, lz)` a coordenadas globales.
    ///
    /// Grounded exactly on `Hitfinder.cxx`'s `ToGlobal`.
    #[must_use]
    pub fn to_global(&self, lx: f32, ly: f32, lz: f32) -> [f32; 3] {
        let t = self.translation;
        let r = self.rotation;
        [
            t[0] + lx * r[0] + ly * r[1] + lz * r[2],
            t[1] + lx * r[3] + ly * r[4] + lz * r[5],
            t[2] + lx * r[6] + ly * r[7] + lz * r[8],
        ]
    }
}

/// Convierte la posición fraccionaria de un cúmulo (en unidades de canal) a
/// una coordenada local a lo largo del eje de lectura del módulo, aplicando
/// la corrección de desplazamiento de Lorentz del lado correspondiente.
///
/// Grounded on `GetClusterPosition`.
#[must_use]
pub fn cluster_position_to_local(geometry: &ModuleGeometry, centre: f32, is_front: bool) -> f32 {
    let i_channel = centre as i32;
    let x_diff = centre - i_channel as f32;
    let i_strip = i_channel - if is_front { 0 } else { geometry.n_channels };
    let mut x_cluster = (i_strip as f32 + x_diff + 0.5) * geometry.pitch;
    x_cluster -= if is_front { geometry.lorentz_front } else { geometry.lorentz_back };
    x_cluster
}

/// Resultado de intersectar una línea front con una línea back: posición del
/// hit (origen en la esquina inferior del sensor) y su matriz de covarianza
/// 2x2 (representada por sus tres componentes independientes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Coordenada x del punto de intersección (origen en la esquina del sensor).
    pub x: f32,
    /// Coordenada y del punto de intersección (origen en la esquina del sensor).
    pub y: f32,
    /// Varianza en x.
    pub var_x: f32,
    /// Varianza en y.
    pub var_y: f32,
    /// Covarianza cruzada x-y.
    pub var_xy: f32,
}

/// Intersecta las líneas front/back correspondientes a dos cúmulos, dados
/// sus desplazamientos de borde top-edge `x_front`/`x_back` (ya desplazados
/// por múltiplos de `dx` para cruces de conexión horizontal) y sus
/// incertidumbres físicas `error_front`/`error_back`.
///
/// Devuelve `None` si los ángulos estéreo son indistinguibles (sin
/// intersección posible) o si el punto cae fuera del área activa del
/// sensor.
///
/// Grounded on `Intersect` + `IsInside`.
#[must_use]
pub fn intersect_stereo_lines(
    geometry: &ModuleGeometry,
    x_front: f32,
    error_front: f32,
    x_back: f32,
    error_back: f32,
) -> Option<Intersection> {
    if (geometry.stereo_front - geometry.stereo_back).abs() < 0.5 {
        return None;
    }

    let ef2 = error_front * error_front;
    let eb2 = error_back * error_back;

    let intersection = if geometry.stereo_front.abs() < 0.001 {
        let x = x_front;
        let y = geometry.dy - (x_front - x_back) / geometry.tan_stereo_back;
        Intersection {
            x,
            y,
            var_x: ef2,
            var_y: (ef2 + eb2) / geometry.tan_stereo_back / geometry.tan_stereo_back,
            var_xy: -ef2 / geometry.tan_stereo_back,
        }
    } else if geometry.stereo_back.abs() < 0.001 {
        let x = x_back;
        let y = geometry.dy - (x_back - x_front) / geometry.tan_stereo_front;
        Intersection {
            x,
            y,
            var_x: eb2,
            var_y: (ef2 + eb2) / geometry.tan_stereo_front / geometry.tan_stereo_front,
            var_xy: -eb2 / geometry.tan_stereo_front,
        }
    } else {
        let tan_f = geometry.tan_stereo_front;
        let tan_b = geometry.tan_stereo_back;
        let x = (tan_b * x_front - tan_f * x_back) / (tan_b - tan_f);
        let y = geometry.dy + (x_back - x_front) / (tan_b - tan_f);
        Intersection {
            x,
            y,
            var_x: geometry.error_factor * (ef2 * tan_b * tan_b + eb2 * tan_f * tan_f),
            var_y: geometry.error_factor * (ef2 + eb2),
            var_xy: -geometry.error_factor * (ef2 * tan_b + eb2 * tan_f),
        }
    };

    if is_inside_active_area(geometry, intersection.x - geometry.dx / 2.0, intersection.y - geometry.dy / 2.0) {
        Some(intersection)
    } else {
        None
    }
}

fn is_inside_active_area(geometry: &ModuleGeometry, x: f32, y: f32) -> bool {
    x >= -geometry.dx / 2.0 && x <= geometry.dx / 2.0 && y >= -geometry.dy / 2.0 && y <= geometry.dy / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> ModuleGeometry {
        let stereo_front_deg = 0.0f32;
        let stereo_back_deg = 7.5f32;
        ModuleGeometry {
            dx: 60.0,
            dy: 40.0,
            pitch: 0.058,
            stereo_front: stereo_front_deg,
            stereo_back: stereo_back_deg,
            tan_stereo_front: stereo_front_deg.to_radians().tan(),
            tan_stereo_back: stereo_back_deg.to_radians().tan(),
            lorentz_front: 0.0,
            lorentz_back: 0.0,
            n_channels: 1024,
            error_factor: 1.0,
        }
    }

    #[test]
    fn identical_stereo_angles_never_intersect() {
        let mut geometry = geometry();
        geometry.stereo_back = geometry.stereo_front;
        assert_eq!(intersect_stereo_lines(&geometry, 30.0, 0.01, 30.0, 0.01), None);
    }

    #[test]
    fn vertical_front_strip_intersects_at_its_own_x() {
        let geometry = geometry();
        let intersection = intersect_stereo_lines(&geometry, 30.0, 0.01, 30.0, 0.01).unwrap();
        assert!((intersection.x - 30.0).abs() < 1e-5);
    }

    #[test]
    fn out_of_bounds_intersection_is_rejected() {
        let geometry = geometry();
        assert_eq!(intersect_stereo_lines(&geometry, 1000.0, 0.01, 1000.0, 0.01), None);
    }

    #[test]
    fn global_transform_is_identity_when_rotation_is_identity_and_translation_is_zero() {
        let transform = GlobalTransform { translation: [0.0, 0.0, 0.0], rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0] };
        assert_eq!(transform.to_global(1.0, 2.0, 3.0), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn global_transform_applies_translation() {
        let transform = GlobalTransform { translation: [5.0, -5.0, 10.0], rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0] };
        assert_eq!(transform.to_global(0.0, 0.0, 0.0), [5.0, -5.0, 10.0]);
    }
}
