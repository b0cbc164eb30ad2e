//! Логирование через `tracing`: фильтр из конфигурации или `RUST_LOG` и
//! консольный вывод в формате pretty, compact или json.

pub mod config;
mod filters;
mod formatter;

pub use config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Устанавливает глобальный subscriber.
///
/// Возвращает ошибку при неверном уровне или если subscriber уже
/// установлен.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config.validate()?;

    tracing_subscriber::registry()
        .with(filters::build_filter_from_config(config))
        .with(formatter::build_formatter_from_config(config))
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("CHANCASTER_GIT_COMMIT"),
        built_at = env!("CHANCASTER_BUILD_TIME"),
        log_level = %config.level,
        format = ?config.format,
        "Logging system initialized"
    );
    Ok(())
}
