use std::sync::{Arc, Weak};

use chancaster_error::StackError;
use parking_lot::Mutex;
use tokio::sync::watch;

/// Отменяемая область выполнения.
///
/// Отмена однократна: первая причина побеждает, последующие вызовы
/// [`Scope::cancel`] ничего не меняют. Отмена родителя распространяется на
/// всех живых потомков вместе с причиной. Отмена носит рекомендательный
/// характер: задачи сами опрашивают [`Scope::is_canceled`] или ждут
/// [`Scope::canceled`].
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    /// `None`, пока область активна.
    state: watch::Sender<Option<StackError>>,
    /// Потомки, которых нужно отменить вместе с этой областью.
    children: Mutex<Vec<Weak<ScopeInner>>>,
}

impl Scope {
    /// Корневая область без родителя.
    pub fn root() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            inner: Arc::new(ScopeInner {
                state,
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Производная область: отменяется вместе с `self`.
    ///
    /// Если `self` уже отменена, потомок создаётся отменённым с той же
    /// причиной.
    pub fn child(&self) -> Self {
        let child = Self::root();
        // Причину проверяем под блокировкой списка потомков: `cancel`
        // выставляет состояние до захвата этой блокировки, поэтому потомок
        // либо увидит причину, либо попадёт в список до обхода.
        let mut children = self.inner.children.lock();
        match self.cause() {
            Some(cause) => {
                drop(children);
                child.cancel(cause);
            }
            None => {
                children.retain(|weak| weak.strong_count() > 0);
                children.push(Arc::downgrade(&child.inner));
            }
        }
        child
    }

    /// Отменяет область с указанной причиной.
    ///
    /// Возвращает `true`, если именно этот вызов выполнил отмену.
    pub fn cancel(
        &self,
        cause: impl Into<StackError>,
    ) -> bool {
        let cause = cause.into();
        let canceled = self.inner.state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(cause.clone());
            true
        });

        if canceled {
            let children = std::mem::take(&mut *self.inner.children.lock());
            for child in children.iter().filter_map(Weak::upgrade) {
                Scope { inner: child }.cancel(cause.clone());
            }
        }
        canceled
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.state.borrow().is_some()
    }

    /// Причина отмены, если область отменена.
    pub fn cause(&self) -> Option<StackError> {
        self.inner.state.borrow().clone()
    }

    /// Ждёт отмены области.
    pub async fn canceled(&self) {
        let mut rx = self.inner.state.subscribe();
        // Отправитель живёт в `self.inner`, поэтому ошибка закрытия
        // невозможна, пока жив `self`.
        let _ = rx.wait_for(Option::is_some).await;
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::root()
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("cause", &self.cause())
            .finish()
    }
}
