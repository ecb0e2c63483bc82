pub mod archive;
pub mod cleanup;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetch;
pub mod formula;
pub mod http;
pub mod install;
pub mod installer;
pub mod platform;
pub mod runtime;
