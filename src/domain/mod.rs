//! Domain layer types.

pub mod listings;
