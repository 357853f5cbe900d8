pub mod api;
pub mod catalog;
pub mod compactor;
pub mod config;
pub mod engine;
pub mod hours;
pub mod limits;
pub mod model;
pub mod observability;
pub mod service;
pub mod slot;
pub mod wal;
