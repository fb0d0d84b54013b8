pub mod app;
pub mod chunker;
pub mod core;
pub mod detection;
pub mod dispatch;
pub mod scanner;
pub mod store;
pub mod tracker;
