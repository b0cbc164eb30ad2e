//! Канал-рандеву: отправка завершается только после того, как получатель
//! забрал значение.
//!
//! Каждое значение уходит в конверте вместе с `oneshot`-подтверждением.
//! Внутренний `mpsc` имеет ёмкость 1, так что в полёте находится не больше
//! одного конверта, а отправители ждут своей очереди в порядке прихода.
//! Конверт, отправитель которого перестал ждать, получатель выбрасывает:
//! значение считается переданным только вместе с подтверждением.
//! Конец потока наступает, когда исчезли все [`Sender`] и буфер пуст.

use std::sync::Arc;

use chancaster_error::CasterError;
use tokio::sync::{mpsc, oneshot, Mutex};

struct Envelope<T> {
    value: T,
    ack: oneshot::Sender<()>,
}

/// Отправляющая сторона канала.
pub struct Sender<T> {
    inner: mpsc::Sender<Envelope<T>>,
}

/// Принимающая сторона канала.
///
/// Клоны разделяют один поток значений: каждое значение получает ровно один
/// из них.
pub struct Receiver<T> {
    inner: Arc<Mutex<mpsc::Receiver<Envelope<T>>>>,
}

/// Создаёт новый канал-рандеву.
pub fn rendezvous<T>() -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = mpsc::channel(1);
    (
        Sender { inner: tx },
        Receiver {
            inner: Arc::new(Mutex::new(rx)),
        },
    )
}

impl<T> Sender<T> {
    /// Передаёт значение и ждёт, пока получатель его заберёт.
    ///
    /// Возвращает [`CasterError::ChannelClosed`], если все получатели
    /// исчезли раньше, чем значение было принято.
    pub async fn send(
        &self,
        value: T,
    ) -> Result<(), CasterError> {
        let (ack, acked) = oneshot::channel();
        self.inner
            .send(Envelope { value, ack })
            .await
            .map_err(|_| CasterError::ChannelClosed)?;
        acked.await.map_err(|_| CasterError::ChannelClosed)
    }

    /// `true`, если получателей больше нет.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

impl<T> Receiver<T> {
    /// Ждёт следующее значение.
    ///
    /// `None` означает конец потока: канал закрыт и пуст. Значения,
    /// отправитель которых перестал ждать (например, `publish` отменили по
    /// тайм-ауту), выбрасываются и не доставляются.
    pub async fn recv(&self) -> Option<T> {
        let mut rx = self.inner.lock().await;
        loop {
            if let Some(value) = Self::accept(rx.recv().await?) {
                return Some(value);
            }
        }
    }

    /// Забирает значение, если отправитель уже ждёт.
    ///
    /// Возвращает `None`, если значения нет или другой клон занят `recv`.
    pub fn try_recv(&self) -> Option<T> {
        let mut rx = self.inner.try_lock().ok()?;
        loop {
            if let Some(value) = Self::accept(rx.try_recv().ok()?) {
                return Some(value);
            }
        }
    }

    /// Подтверждение и передача значения происходят одним шагом: если
    /// отправитель уже ушёл, `send` подтверждения не удаётся и значение
    /// остаётся неотданным.
    fn accept(envelope: Envelope<T>) -> Option<T> {
        let Envelope { value, ack } = envelope;
        ack.send(()).ok().map(|()| value)
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for Sender<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Sender")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T> std::fmt::Debug for Receiver<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Receiver").finish_non_exhaustive()
    }
}
