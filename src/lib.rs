pub mod config;
pub mod models;
pub mod node;
pub mod repository;
pub mod shutdown;
pub mod store;
pub mod streams;
pub mod workers;
