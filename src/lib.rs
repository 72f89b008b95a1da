pub mod api;
pub mod command;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod identity;
pub mod poll;
pub mod probe;
pub mod scenario;
pub mod scenarios;
