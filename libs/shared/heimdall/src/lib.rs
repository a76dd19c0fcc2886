// [libs/shared/heimdall/src/lib.rs]
/*!
 * =================================================================
 * APARATO: HEIMDALL NEURAL OBSERVER
 * CLASIFICACIÓN: SHARED UTILITY (ESTRATO L4/L6)
 * RESPONSABILIDAD: GESTIÓN DE TRAZADO ESTRUCTURADO Y CAPTURA DE PÁNICOS
 *
 * # Logic:
 * Todos los binarios del núcleo de reconstrucción (reco-driver, histserv)
 * llaman a `init_tracing` una única vez al arrancar. El filtro se puede
 * sobreescribir con la variable de entorno estándar (`RUST_LOG` o
 * `<service>=<level>`); el hook de pánico asegura que un colapso en un
 * hilo del pool de reconstrucción quede en el rastro antes de que el
 * proceso termine.
 * =================================================================
 */

use std::panic;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as formatting_layer, EnvFilter};

/// Overrides for [`init_tracing`], mapped from a binary's `--log-level`/`--log-file` flags.
#[derive(Debug, Clone, Default)]
pub struct TracingOverrides {
    /// Explicit level (`--log-level`), taking precedence over `RUST_LOG` and
    /// the service's debug/release default.
    pub level: Option<String>,
    /// If set, logs are written to this file instead of stdout. The
    /// returned [`WorkerGuard`] must be held for the life of the process —
    /// dropping it stops the non-blocking writer's background flush thread.
    pub file: Option<PathBuf>,
}

/// Inicializa el sistema de trazas Heimdall con blindaje de pánicos.
///
/// - Desarrollo: logs interactivos, compactos, sin campos de target.
/// - Producción: estructura JSON plana, apta para un colector externo.
///
/// Devuelve el `WorkerGuard` del escritor no bloqueante cuando `overrides.file`
/// está presente; el llamador debe mantenerlo vivo mientras el proceso corra.
///
/// # Errors:
/// Entra en pánico si otro suscriptor global ya fue inicializado en el runtime.
#[instrument(skip_all)]
pub fn init_tracing(service_nominal_identifier: &str, overrides: TracingOverrides) -> Option<WorkerGuard> {
    let environmental_filter = overrides
        .level
        .as_deref()
        .map(Into::into)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| {
            format!(
                "{}={level},tower_http=warn,hyper=warn",
                service_nominal_identifier,
                level = if cfg!(debug_assertions) { "debug" } else { "info" }
            )
            .into()
        });

    let is_production_strata = !cfg!(debug_assertions);

    let guard = if let Some(log_file) = overrides.file.as_deref() {
        let (directory, file_name) = split_log_path(log_file);
        let appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        if is_production_strata {
            tracing_subscriber::registry()
                .with(environmental_filter)
                .with(formatting_layer::layer().json().flatten_event(true).with_writer(writer))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(environmental_filter)
                .with(formatting_layer::layer().compact().with_target(false).with_writer(writer))
                .init();
        }
        Some(guard)
    } else {
        if is_production_strata {
            tracing_subscriber::registry()
                .with(environmental_filter)
                .with(formatting_layer::layer().json().flatten_event(true))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(environmental_filter)
                .with(formatting_layer::layer().compact().with_target(false))
                .init();
        }
        None
    };

    let service_id_snapshot = service_nominal_identifier.to_string();

    panic::set_hook(Box::new(move |panic_metadata| {
        let panic_location = panic_metadata
            .location()
            .map(|location| format!("{}:{}:{}", location.file(), location.line(), location.column()))
            .unwrap_or_else(|| "UNKNOWN_LOCATION".to_string());

        let panic_payload_message = panic_metadata
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_metadata.payload().downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("UNDEFINED_PANIC_PAYLOAD");

        error!(
            target: "panic_monitor",
            service = %service_id_snapshot,
            location = %panic_location,
            "thread terminated abruptly: {}",
            panic_payload_message
        );
    }));

    info!("heimdall observability initialized for [{}]", service_nominal_identifier);
    guard
}

/// Splits a log file path into the directory `tracing_appender::rolling`
/// rotates within and the bare file name it rotates.
fn split_log_path(path: &Path) -> (&Path, String) {
    let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "reco.log".to_string());
    (directory, file_name)
}
