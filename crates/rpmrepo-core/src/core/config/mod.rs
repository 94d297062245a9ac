//! Environment-derived settings shared by every command.

pub mod settings;

pub use settings::*;
