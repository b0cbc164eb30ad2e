use std::{
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use chancaster_error::{CasterError, CasterResult, LogLevel, StackError};
use parking_lot::Mutex;
use tokio::{runtime::Handle, sync::Notify, task::JoinError};
use tracing::{debug, error, info, warn};

use super::Scope;

/// Группа задач: первая ошибка отменяет общую область и запоминается для
/// [`TaskGroup::wait`].
///
/// Каждая задача идёт под отдельным надзирателем, который сам записывает
/// исход. Поэтому `wait` ничего не джойнит и может быть прерван (тайм-аут,
/// `select!`) без потери ошибок.
pub struct TaskGroup {
    scope: Scope,
    state: Arc<GroupState>,
}

#[derive(Default)]
struct GroupState {
    first_error: Mutex<Option<StackError>>,
    spawned: AtomicUsize,
    failed: AtomicUsize,
    /// Надзиратели, которые ещё не записали исход.
    running: AtomicUsize,
    idle: Notify,
}

impl GroupState {
    /// Запоминает ошибку, если она первая, и отменяет ею область.
    ///
    /// Запись и отмена идут под одной блокировкой: причина отмены и
    /// результат `wait` всегда совпадают.
    fn fail(
        &self,
        scope: &Scope,
        err: StackError,
    ) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        let mut first = self.first_error.lock();
        if first.is_none() {
            scope.cancel(err.clone());
            *first = Some(err);
        }
    }
}

/// Снимает надзирателя со счёта при любом выходе, включая остановку рантайма.
struct RunningGuard(Arc<GroupState>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if self.0.running.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl TaskGroup {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            state: Arc::new(GroupState::default()),
        }
    }

    /// Запускает задачу в текущем рантайме tokio.
    ///
    /// `label` попадает в логи и в ошибки задачи. Вне рантайма возвращает
    /// [`CasterError::NoRuntime`] и ничего не запускает.
    pub fn spawn<F, E>(
        &self,
        label: String,
        task: F,
    ) -> CasterResult<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<StackError> + Send + 'static,
    {
        let handle = current_runtime(&label)?;
        self.spawn_on(&handle, label, task);
        Ok(())
    }

    pub(crate) fn spawn_on<F, E>(
        &self,
        handle: &Handle,
        label: String,
        task: F,
    ) where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<StackError> + Send + 'static,
    {
        let scope = self.scope.clone();
        let state = Arc::clone(&self.state);
        state.spawned.fetch_add(1, Ordering::Relaxed);
        state.running.fetch_add(1, Ordering::AcqRel);
        let guard = RunningGuard(Arc::clone(&state));

        // Отдельная задача, чтобы паника была замечена надзирателем сразу.
        let inner = handle.spawn(async move { task.await.map_err(Into::<StackError>::into) });
        handle.spawn(async move {
            let _guard = guard;
            let err = match inner.await {
                Ok(Ok(())) => {
                    debug!(task = %label, "task finished");
                    return;
                }
                Ok(Err(err)) => err.context(format!("task {label}")),
                Err(join_err) => join_failure(label.clone(), join_err).into(),
            };
            report(&label, &err);
            state.fail(&scope, err);
        });
    }

    /// Ждёт, пока все задачи, включая добавленные во время ожидания, не
    /// запишут исход. После этого отменяет область (если она ещё активна) и
    /// возвращает первую ошибку.
    ///
    /// Прерванный `wait` ничего не теряет: повторный вызов видит все исходы.
    pub async fn wait(&self) -> CasterResult<()> {
        loop {
            let idle = self.state.idle.notified();
            tokio::pin!(idle);
            // Подписка до проверки счётчика, чтобы не пропустить последнее
            // уведомление.
            idle.as_mut().enable();
            if self.state.running.load(Ordering::Acquire) == 0 {
                break;
            }
            idle.await;
        }

        self.scope.cancel(CasterError::GroupFinished);

        match self.state.first_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn spawned(&self) -> usize {
        self.state.spawned.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.state.failed.load(Ordering::Relaxed)
    }
}

pub(crate) fn current_runtime(label: &str) -> Result<Handle, CasterError> {
    Handle::try_current().map_err(|_| CasterError::NoRuntime {
        key: label.to_string(),
    })
}

fn join_failure(
    key: String,
    join_err: JoinError,
) -> CasterError {
    if join_err.is_panic() {
        CasterError::TaskPanicked { key }
    } else {
        CasterError::TaskAborted { key }
    }
}

fn report(
    label: &str,
    err: &StackError,
) {
    match err.log_level() {
        LogLevel::Error => error!(task = %label, error = %err, "task failed"),
        LogLevel::Warn => warn!(task = %label, error = %err, "task failed"),
        LogLevel::Info => info!(task = %label, error = %err, "task failed"),
        LogLevel::Debug | LogLevel::Trace => debug!(task = %label, error = %err, "task failed"),
    }
}
