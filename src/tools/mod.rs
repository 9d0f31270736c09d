pub mod dom;
pub mod navigation;
pub mod watch;
