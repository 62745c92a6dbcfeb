//! Configuration and the records the service works with

pub mod config;
pub mod models;
