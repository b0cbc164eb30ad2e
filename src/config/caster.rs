use serde::{Deserialize, Serialize};

/// Что делать при `add` для уже зарегистрированного ключа.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateKeyPolicy {
    /// Закрыть прежний канал (его потребитель получит конец потока) и
    /// зарегистрировать новый.
    #[default]
    Replace,
    /// Отказать с ошибкой `KeyExists`, прежняя регистрация остаётся.
    Reject,
}

/// Настройки одного брокера.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CasterConfig {
    /// Имя брокера в логах.
    pub name: String,
    pub duplicate_key: DuplicateKeyPolicy,
}

impl Default for CasterConfig {
    fn default() -> Self {
        Self {
            name: "chancaster".to_string(),
            duplicate_key: DuplicateKeyPolicy::default(),
        }
    }
}

impl CasterConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
