pub mod caster;
pub mod settings;

pub use caster::{CasterConfig, DuplicateKeyPolicy};
pub use settings::Settings;
