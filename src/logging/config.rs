use serde::{Deserialize, Serialize};

/// Формат вывода событий.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

/// Конфигурация логирования.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Базовый уровень: trace, debug, info, warn, error.
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
    /// Дополнительные директивы фильтра, например `chancaster::caster=debug`.
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
            directives: Vec::new(),
        }
    }
}

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl LoggingConfig {
    /// Проверяет уровень логирования.
    pub fn validate(&self) -> Result<(), String> {
        let level = self.level.to_ascii_lowercase();
        if LEVELS.contains(&level.as_str()) {
            Ok(())
        } else {
            Err(format!(
                "invalid log level '{}', expected one of {}",
                self.level,
                LEVELS.join(", ")
            ))
        }
    }

    /// Директива для `EnvFilter`: уровень и дополнительные директивы через
    /// запятую.
    pub fn build_filter_directive(&self) -> String {
        std::iter::once(self.level.to_ascii_lowercase())
            .chain(self.directives.iter().cloned())
            .collect::<Vec<_>>()
            .join(",")
    }
}
