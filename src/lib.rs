pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod generate;
pub mod store;
pub mod types;
