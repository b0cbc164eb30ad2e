pub mod caster;

pub use caster::*;
