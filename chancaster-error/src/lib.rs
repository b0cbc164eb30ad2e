pub mod context;
pub mod ext;
pub mod stack;
pub mod status_code;
pub mod types;

pub use context::*;
pub use ext::*;
pub use stack::*;
pub use status_code::*;
pub use types::*;

pub type CasterResult<T> = Result<T, StackError>;
