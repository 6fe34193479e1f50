pub mod config;
pub mod history;
pub mod kong;
pub mod observability;
pub mod types;
