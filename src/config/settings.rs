use std::path::Path;

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use super::CasterConfig;
use crate::logging::LoggingConfig;

/// Полная конфигурация сессии: брокер и логирование.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub caster: CasterConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Значения по умолчанию и переменные окружения `CHANCASTER_*`.
    ///
    /// Вложенные ключи разделяются `__`, например
    /// `CHANCASTER_CASTER__DUPLICATE_KEY=reject`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder(None)?.build()?.try_deserialize()
    }

    /// Как [`Settings::load`], но с обязательным файлом конфигурации.
    /// Формат определяется по расширению; окружение перекрывает файл.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::builder(Some(path.as_ref()))?
            .build()?
            .try_deserialize()
    }

    fn builder(path: Option<&Path>) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("caster.name", defaults.caster.name)?
            .set_default("caster.duplicate_key", "replace")?
            .set_default("logging.level", defaults.logging.level)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.add_source(
            Environment::with_prefix("CHANCASTER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        ))
    }
}
