pub mod error;
pub mod event;
pub mod value;
pub mod formatter;
pub mod pattern;
pub mod registry;
pub mod diagnostics;
pub mod document;
pub mod connection;
pub mod store;
pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongo;

pub mod appender;
pub mod config;
pub mod env;
pub mod layer;
pub mod init;
