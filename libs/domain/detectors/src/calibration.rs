// [libs/domain/detectors/src/calibration.rs]
//! Calibración de digis por canal compartida entre TOF y BMon: tiempo
//! muerto, desplazamiento/ganancia de ToT y corrección de walk, más la
//! reordenación por inserción que restaura el orden temporal tras
//! calibrar.
//!
//! Grounded on `algo/detectors/tof/Calibrate.cxx`'s per-digi calibration
//! block; BMon (`algo/detectors/bmon/Calibrate.cxx`) reuses the identical
//! dead-time/walk logic over its own diamond-indexed channel table, hence
//! the shared module rather than duplicating the arithmetic per subsystem.

use reco_domain_model::{CalibrationMonitor, ChannelCalibration, Digi};

/// Tabla de tiempos muertos por canal, inicializada en NaN: un canal sin
/// tiempo muerto activo nunca bloquea un digi entrante.
#[derive(Debug, Clone)]
pub struct ChannelDeadTimes(Vec<f64>);

impl ChannelDeadTimes {
    /// Crea una tabla de `n_channels` entradas, todas sin tiempo muerto activo.
    #[must_use]
    pub fn new(n_channels: usize) -> Self {
        Self(vec![f64::NAN; n_channels])
    }
}

/// Calibra un único digi crudo sobre el canal `channel_index` de `calib`.
///
/// Devuelve `None` si el digi cae dentro de la ventana de tiempo muerto del
/// canal (incrementando `monitor.dropped_deadtime` y refrescando la
/// ventana), o `Some(calibrated)` en caso contrario (incrementando
/// `monitor.processed`). No realiza el intercambio de lados de canal TOF ni
/// la reordenación por inserción: esos pasos son responsabilidad del
/// llamador, porque solo TOF aplica el intercambio de lados.
pub fn calibrate_channel(
    raw: &Digi,
    channel_index: usize,
    calib: &ChannelCalibration,
    dead_times: &mut ChannelDeadTimes,
    monitor: &mut CalibrationMonitor,
) -> Option<Digi> {
    monitor.processed += 1;

    let digi_time = raw.time as f64;
    let stored_dead_time = dead_times.0[channel_index];
    if !stored_dead_time.is_nan() && digi_time <= stored_dead_time {
        dead_times.0[channel_index] = digi_time + calib.dead_time;
        monitor.dropped_deadtime += 1;
        return None;
    }

    let calibrated_time = digi_time - calib.time_offset;
    let tot = (raw.charge_or_tot as f64 - calib.tot_offset).max(0.001) * calib.tot_gain;
    let walk_correction = calib.walk.correction_for_tot(tot);
    let walked_time = calibrated_time - walk_correction;

    dead_times.0[channel_index] = digi_time + calib.dead_time;

    let mut calibrated = *raw;
    calibrated.time = walked_time.round() as u32;
    calibrated.charge_or_tot = tot as f32;
    Some(calibrated)
}

/// Restaura el orden no-decreciente en tiempo de un conjunto de digis casi
/// ordenado, mediante inserción: preferida sobre un ordenamiento de
/// comparación general porque la entrada llega casi ordenada.
pub fn insertion_sort_by_time(digis: &mut [Digi]) {
    for i in 1..digis.len() {
        let mut j = i;
        while j > 0 && digis[j - 1].time > digis[j].time {
            digis.swap(j - 1, j);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reco_core_math::WalkTable;
    use reco_domain_model::{DetectorAddress, Subsystem, TriggerKind};

    fn calib() -> ChannelCalibration {
        ChannelCalibration {
            time_offset: 0.0,
            tot_offset: 0.0,
            tot_gain: 1.0,
            walk: WalkTable::new(0.0, 100.0, vec![0.0; 10]),
            dead_time: 50.0,
        }
    }

    fn digi(time: u32, tot: f32) -> Digi {
        Digi { address: DetectorAddress::pack(Subsystem::Tof, 0, 0, 1), time, charge_or_tot: tot, trigger: TriggerKind::SelfTriggered }
    }

    #[test]
    fn scenario_1_dead_time_drops_the_second_pulse_and_extends_the_window() {
        let mut dead_times = ChannelDeadTimes::new(1);
        let mut monitor = CalibrationMonitor::default();
        let c = calib();

        let first = calibrate_channel(&digi(100, 10.0), 0, &c, &mut dead_times, &mut monitor);
        assert!(first.is_some());

        let second = calibrate_channel(&digi(105, 10.0), 0, &c, &mut dead_times, &mut monitor);
        assert!(second.is_none());
        assert_eq!(monitor.dropped_deadtime, 1);
        assert_eq!(dead_times.0[0], 155.0);
    }

    #[test]
    fn insertion_sort_restores_nearly_sorted_order() {
        let mut digis = vec![digi(10, 1.0), digi(8, 1.0), digi(20, 1.0), digi(19, 1.0)];
        insertion_sort_by_time(&mut digis);
        let times: Vec<u32> = digis.iter().map(|d| d.time).collect();
        assert_eq!(times, vec![8, 10, 19, 20]);
    }
}
