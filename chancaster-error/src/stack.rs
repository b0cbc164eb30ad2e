use std::{error::Error, fmt, iter, panic::Location, sync::Arc};

use crate::{ErrorExt, LogLevel, StatusCode};

/// Ошибка брокера вместе со следом: какие операции она прошла по пути наверх.
///
/// Одна и та же ошибка задачи одновременно становится причиной отмены области
/// и результатом `wait`, поэтому и корень, и след лежат за `Arc`: клон не
/// копирует ни то, ни другое.
#[derive(Clone)]
pub struct StackError {
    root: Arc<dyn ErrorExt>,
    trail: Arc<[Frame]>,
}

/// Ступень следа: сообщение и место, где его добавили.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message: String,
    pub location: &'static Location<'static>,
}

impl StackError {
    pub fn new<E: ErrorExt>(err: E) -> Self {
        Self {
            root: Arc::new(err),
            trail: Arc::from(Vec::new()),
        }
    }

    /// Добавляет ступень в конец следа.
    ///
    /// Исходная ошибка и её клоны не меняются.
    #[track_caller]
    pub fn context(
        self,
        message: impl Into<String>,
    ) -> Self {
        let frame = Frame {
            message: message.into(),
            location: Location::caller(),
        };
        Self {
            trail: self.trail.iter().cloned().chain(iter::once(frame)).collect(),
            root: self.root,
        }
    }

    /// Код корневой ошибки: контекст его не меняет.
    pub fn status_code(&self) -> StatusCode {
        self.root.status_code()
    }

    pub fn log_level(&self) -> LogLevel {
        self.status_code().log_level()
    }

    /// След в порядке добавления: первым идёт ближайший к корню.
    pub fn frames(&self) -> &[Frame] {
        &self.trail
    }

    pub fn downcast_ref<T: ErrorExt>(&self) -> Option<&T> {
        self.root.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("StackError")
            .field("root", &format_args!("{}", self.root))
            .field("status", &self.status_code())
            .field("trail", &self.trail)
            .finish()
    }
}

/// `publish "AAPL" → task "AAPL": task failed: ...`
///
/// С `{:#}` к каждой ступени добавляется `file:line`.
impl fmt::Display for StackError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for (i, frame) in self.trail.iter().enumerate() {
            if i > 0 {
                f.write_str(" → ")?;
            }
            f.write_str(&frame.message)?;
            if f.alternate() {
                write!(f, " ({}:{})", frame.location.file(), frame.location.line())?;
            }
        }
        if !self.trail.is_empty() {
            f.write_str(": ")?;
        }
        fmt::Display::fmt(&self.root, f)
    }
}

impl Error for StackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.root.as_ref())
    }
}

impl<E: ErrorExt> From<E> for StackError {
    fn from(err: E) -> Self {
        Self::new(err)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
