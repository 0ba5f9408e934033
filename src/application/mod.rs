//! Application services layer.

pub mod error;
pub mod inline;
pub mod render;
