use std::{any::Any, fmt};

use thiserror::Error;

use crate::{ErrorExt, StackError, StatusCode};

/// Ошибки операций брокера и его задач.
#[derive(Debug, Clone, Error)]
pub enum CasterError {
    /// Область отмены уже отменена; хранит исходную причину.
    #[error("scope canceled: {cause}")]
    ScopeCanceled {
        #[source]
        cause: StackError,
    },
    /// Для ключа не зарегистрирован канал.
    #[error("no channel found for key {key}")]
    KeyNotFound { key: String },
    /// Канал для ключа уже зарегистрирован (политика `reject`).
    #[error("channel already registered for key {key}")]
    KeyExists { key: String },
    /// Все получатели канала исчезли до передачи значения.
    #[error("channel closed before the value was received")]
    ChannelClosed,
    /// Задача завершилась с ошибкой.
    #[error("task failed: {reason}")]
    TaskFailed { reason: String },
    /// Задача запаниковала.
    #[error("task for key {key} panicked")]
    TaskPanicked { key: String },
    /// Задачу снял рантайм (например, при его остановке), она не завершилась.
    #[error("task for key {key} was aborted by the runtime")]
    TaskAborted { key: String },
    /// Вызов вне рантайма tokio: задачу негде запустить.
    #[error("no tokio runtime to spawn task for key {key}")]
    NoRuntime { key: String },
    /// Явное завершение работы брокера.
    #[error("caster shut down: {reason}")]
    Shutdown { reason: String },
    /// Группа задач дождалась завершения всех задач.
    #[error("task group finished")]
    GroupFinished,
}

impl CasterError {
    pub fn key_not_found(key: impl fmt::Debug) -> Self {
        Self::KeyNotFound {
            key: format!("{key:?}"),
        }
    }

    pub fn key_exists(key: impl fmt::Debug) -> Self {
        Self::KeyExists {
            key: format!("{key:?}"),
        }
    }

    /// Ошибка для пользовательских задач.
    pub fn task(reason: impl Into<String>) -> Self {
        Self::TaskFailed {
            reason: reason.into(),
        }
    }

    pub fn shutdown(reason: impl Into<String>) -> Self {
        Self::Shutdown {
            reason: reason.into(),
        }
    }

    pub fn canceled(cause: StackError) -> Self {
        Self::ScopeCanceled { cause }
    }

    /// Причина отмены для `ScopeCanceled`.
    pub fn cause(&self) -> Option<&StackError> {
        match self {
            Self::ScopeCanceled { cause } => Some(cause),
            _ => None,
        }
    }
}

impl ErrorExt for CasterError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ScopeCanceled { .. } | Self::GroupFinished => StatusCode::Canceled,
            Self::KeyNotFound { .. } => StatusCode::NotFound,
            Self::KeyExists { .. } => StatusCode::AlreadyExists,
            Self::ChannelClosed => StatusCode::ChannelClosed,
            Self::TaskFailed { .. } => StatusCode::TaskFailed,
            Self::TaskPanicked { .. } => StatusCode::TaskPanicked,
            Self::TaskAborted { .. } => StatusCode::Canceled,
            Self::NoRuntime { .. } => StatusCode::Unsupported,
            Self::Shutdown { .. } => StatusCode::Shutdown,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет текст ошибки отсутствующего ключа: драйверы ищут в нём
    /// подстроку "no channel found for key".
    #[test]
    fn test_key_not_found_message() {
        let err = CasterError::key_not_found("MSFT");
        assert_eq!(err.to_string(), "no channel found for key \"MSFT\"");
        assert_eq!(err.status_code(), StatusCode::NotFound);
    }

    /// Тест проверяет, что ScopeCanceled несёт причину и отдаёт её как source.
    #[test]
    fn test_scope_canceled_carries_cause() {
        let cause = StackError::new(CasterError::task("feed broke"));
        let err = CasterError::canceled(cause.clone());

        assert_eq!(err.status_code(), StatusCode::Canceled);
        assert!(err.to_string().contains("feed broke"));
        assert_eq!(
            err.cause().map(|c| c.to_string()),
            Some(cause.to_string())
        );
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source, Some(cause.to_string()));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            CasterError::key_exists(1).status_code(),
            StatusCode::AlreadyExists
        );
        assert_eq!(
            CasterError::ChannelClosed.status_code(),
            StatusCode::ChannelClosed
        );
        assert_eq!(
            CasterError::shutdown("bye").status_code(),
            StatusCode::Shutdown
        );
        assert_eq!(
            CasterError::GroupFinished.status_code(),
            StatusCode::Canceled
        );
        assert_eq!(
            CasterError::TaskPanicked { key: "k".into() }.status_code(),
            StatusCode::TaskPanicked
        );
        assert_eq!(
            CasterError::TaskAborted { key: "k".into() }.status_code(),
            StatusCode::Canceled
        );
        assert_eq!(
            CasterError::NoRuntime { key: "k".into() }.status_code(),
            StatusCode::Unsupported
        );
    }
}
