use std::{
    fmt::Debug,
    future::Future,
    hash::Hash,
    sync::atomic::{AtomicUsize, Ordering},
};

use chancaster_error::{CasterError, CasterResult, StackError};
use dashmap::{mapref::entry::Entry, DashMap};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{group::current_runtime, rendezvous, Receiver, Scope, Sender, TaskGroup};
use crate::config::{CasterConfig, DuplicateKeyPolicy};

/// Канал, зарегистрированный за ключом.
struct Channel<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

/// Брокер каналов по ключам.
///
/// Для каждого ключа держит канал-рандеву и задачу-потребителя, запущенную
/// через [`ChanCaster::add`]. Все задачи делят одну область отмены: первая
/// ошибка любой из них отменяет её, а [`ChanCaster::wait`] возвращает эту
/// ошибку.
///
/// Типичный сценарий: брокер оборачивается в `Arc`, задача сама получает
/// свой канал через [`ChanCaster::get`] и читает его в цикле до конца потока.
pub struct ChanCaster<K, T> {
    id: Uuid,
    config: CasterConfig,
    scope: Scope,
    channels: DashMap<K, Channel<T>>,
    group: TaskGroup,
    /// Количество успешных `publish`.
    published: AtomicUsize,
    /// Количество закрытых каналов (через `close` или замену).
    closed: AtomicUsize,
}

/// Снимок счётчиков брокера.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CasterStats {
    pub active_channels: usize,
    pub published: usize,
    pub closed: usize,
    pub tasks_spawned: usize,
    pub tasks_failed: usize,
}

impl<K, T> ChanCaster<K, T>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    T: Send + 'static,
{
    /// Создаёт брокер с областью, производной от `parent`.
    ///
    /// Область брокера отменяется при отмене родителя, при первой ошибке
    /// задачи, при [`ChanCaster::shutdown`] или по завершении
    /// [`ChanCaster::wait`].
    pub fn new(parent: &Scope) -> Self {
        Self::with_config(parent, CasterConfig::default())
    }

    pub fn with_config(
        parent: &Scope,
        config: CasterConfig,
    ) -> Self {
        let scope = parent.child();
        let id = Uuid::new_v4();
        debug!(caster = %config.name, %id, policy = ?config.duplicate_key, "caster created");
        Self {
            id,
            config,
            group: TaskGroup::new(scope.clone()),
            scope,
            channels: DashMap::new(),
            published: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        }
    }

    /// Регистрирует канал для `key` и запускает `task` в группе.
    ///
    /// Если область уже отменена, возвращает [`CasterError::ScopeCanceled`]
    /// с причиной отмены и ничего не регистрирует. Вне рантайма tokio
    /// возвращает [`CasterError::NoRuntime`]. Повторная регистрация ключа
    /// следует [`DuplicateKeyPolicy`].
    pub fn add<F, E>(
        &self,
        key: K,
        task: F,
    ) -> CasterResult<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<StackError> + Send + 'static,
    {
        self.ensure_active()?;
        let label = format!("{key:?}");
        let handle = current_runtime(&label)?;

        let (tx, rx) = rendezvous();
        match self.channels.entry(key.clone()) {
            Entry::Occupied(mut entry) => match self.config.duplicate_key {
                DuplicateKeyPolicy::Reject => {
                    debug!(caster = %self.config.name, ?key, "duplicate key rejected");
                    return Err(CasterError::key_exists(&key).into());
                }
                DuplicateKeyPolicy::Replace => {
                    // Старый отправитель уходит вместе с заменённым значением,
                    // и прежний потребитель получает конец потока.
                    drop(entry.insert(Channel { tx, rx }));
                    self.closed.fetch_add(1, Ordering::Relaxed);
                    info!(caster = %self.config.name, ?key, "channel replaced");
                }
            },
            Entry::Vacant(entry) => {
                entry.insert(Channel { tx, rx });
            }
        }

        self.group.spawn_on(&handle, label, task);
        debug!(caster = %self.config.name, ?key, "channel added");
        Ok(())
    }

    /// Возвращает получателя для `key`.
    ///
    /// Отсутствие ключа не ошибка: возвращается `Ok(None)`. Ошибкой
    /// является только отменённая область.
    pub fn get(
        &self,
        key: &K,
    ) -> CasterResult<Option<Receiver<T>>> {
        self.ensure_active()?;
        Ok(self.channels.get(key).map(|channel| channel.rx.clone()))
    }

    /// Передаёт `value` потребителю `key` и ждёт, пока тот его примет.
    ///
    /// Возвращает [`CasterError::KeyNotFound`], если канала нет. Тайм-аутов
    /// нет: без читающего потребителя вызов ждёт бесконечно.
    pub async fn publish(
        &self,
        key: &K,
        value: T,
    ) -> CasterResult<()> {
        // Отправитель клонируется, чтобы не держать шард карты во время
        // ожидания.
        let tx = match self.channels.get(key) {
            Some(channel) => channel.tx.clone(),
            None => {
                debug!(caster = %self.config.name, ?key, "publish to unknown key");
                return Err(CasterError::key_not_found(key).into());
            }
        };

        if let Err(err) = tx.send(value).await {
            warn!(caster = %self.config.name, ?key, error = %err, "handoff failed");
            return Err(StackError::new(err).context(format!("publish {key:?}")));
        }
        self.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Закрывает канал `key` и удаляет его из карты одним шагом.
    ///
    /// Потребитель дочитывает уже переданное значение и получает конец
    /// потока. Повторное закрытие даёт [`CasterError::KeyNotFound`].
    pub fn close(
        &self,
        key: &K,
    ) -> CasterResult<()> {
        match self.channels.remove(key) {
            Some(_) => {
                self.closed.fetch_add(1, Ordering::Relaxed);
                debug!(caster = %self.config.name, ?key, "channel closed");
                Ok(())
            }
            None => {
                debug!(caster = %self.config.name, ?key, "close of unknown key");
                Err(CasterError::key_not_found(key).into())
            }
        }
    }

    /// Ждёт завершения всех задач и возвращает первую ошибку.
    ///
    /// По завершении область брокера отменяется, и новые `add` больше не
    /// принимаются.
    pub async fn wait(&self) -> CasterResult<()> {
        debug!(caster = %self.config.name, tasks = self.group.spawned(), "waiting for tasks");
        let res = self.group.wait().await;
        match &res {
            Ok(()) => info!(caster = %self.config.name, "all tasks finished"),
            Err(err) => warn!(caster = %self.config.name, error = %err, "tasks finished with error"),
        }
        res
    }

    /// Явно отменяет область брокера.
    ///
    /// Задачи не прерываются; они должны заметить отмену через
    /// [`ChanCaster::scope`].
    pub fn shutdown(
        &self,
        reason: impl Into<String>,
    ) -> bool {
        let reason = reason.into();
        let canceled = self.scope.cancel(CasterError::shutdown(reason.clone()));
        if canceled {
            info!(caster = %self.config.name, %reason, "caster shut down");
        }
        canceled
    }

    /// Снимок зарегистрированных ключей в произвольном порядке.
    pub fn keys(&self) -> Vec<K> {
        self.channels.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn contains_key(
        &self,
        key: &K,
    ) -> bool {
        self.channels.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stats(&self) -> CasterStats {
        CasterStats {
            active_channels: self.channels.len(),
            published: self.published.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            tasks_spawned: self.group.spawned(),
            tasks_failed: self.group.failed(),
        }
    }

    fn ensure_active(&self) -> CasterResult<()> {
        match self.scope.cause() {
            Some(cause) => Err(CasterError::canceled(cause).into()),
            None => Ok(()),
        }
    }
}
