pub mod config;
pub mod id;
