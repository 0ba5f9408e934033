//! Domain layer types and invariants.

pub mod front_matter;
pub mod themes;
