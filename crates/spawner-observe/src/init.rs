use tracing_subscriber::{Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::LoggerConfig,
    error::{LoggerError, LoggerResult},
    format::LoggerFormat,
    timer::LoggerRfc3339,
};

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Filter plus one output layer, installed as the global default.
pub(crate) fn install(cfg: &LoggerConfig) -> LoggerResult<()> {
    let filter = cfg.level.to_env_filter()?;
    let output = output_layer(cfg)?.with_filter(filter);

    tracing_subscriber::registry()
        .with(output)
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}

fn output_layer(cfg: &LoggerConfig) -> LoggerResult<OutputLayer> {
    let timer = LoggerRfc3339::new(cfg.tz);
    let layer = match cfg.format {
        LoggerFormat::Text => fmt::layer()
            .with_ansi(cfg.should_use_color())
            .with_target(cfg.with_targets)
            .with_timer(timer)
            .boxed(),
        // span fields are flattened into every event
        LoggerFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(timer)
            .boxed(),
        LoggerFormat::Journald => journald()?,
    };
    Ok(layer)
}

#[cfg(target_os = "linux")]
fn journald() -> LoggerResult<OutputLayer> {
    tracing_journald::layer()
        .map(|layer| layer.boxed())
        .map_err(|e| LoggerError::Journald(e.to_string()))
}

#[cfg(not(target_os = "linux"))]
fn journald() -> LoggerResult<OutputLayer> {
    Err(LoggerError::Journald("not supported on this platform".into()))
}
