//! CLI subcommands.

pub(crate) mod config;
pub(crate) mod connect;
