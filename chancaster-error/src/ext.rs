use std::{any::Any, error::Error};

use crate::StatusCode;

/// Ошибка, которую можно положить в [`StackError`](crate::StackError).
///
/// Object-safe: корень хранится как `Arc<dyn ErrorExt>`.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// По умолчанию [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Для `downcast_ref` к конкретному типу.
    fn as_any(&self) -> &dyn Any;
}
