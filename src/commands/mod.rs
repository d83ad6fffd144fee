pub mod config;
pub mod monitor;
pub mod utils;
