//! Брокер каналов по ключам.
//!
//! - `broker`: [`ChanCaster`] — регистрация каналов и задач, публикация,
//!   закрытие, ожидание.
//! - `channel`: канал-рандеву с блокирующей передачей значения.
//! - `group`: группа задач, где первая ошибка отменяет общую область.
//! - `scope`: отменяемая область выполнения с причиной отмены.

pub mod broker;
pub mod channel;
pub mod group;
pub mod scope;

pub use broker::{CasterStats, ChanCaster};
pub use channel::{rendezvous, Receiver, Sender};
pub use group::TaskGroup;
pub use scope::Scope;
