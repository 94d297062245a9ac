pub mod commands;
pub mod config;
pub mod enumerate;
pub(crate) mod fs;
pub mod index;
pub mod layout;
pub mod publish;
pub mod pull;
pub mod resolver;
pub mod tooling;
