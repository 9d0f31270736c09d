pub mod browser;
pub mod config;
pub mod selectors;
pub mod server;
pub mod tools;
pub mod watch;
