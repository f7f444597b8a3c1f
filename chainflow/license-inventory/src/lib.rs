pub mod cache;
pub mod chain;
pub mod errors;
pub mod handler;
pub mod models;
