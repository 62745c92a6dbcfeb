//! Traffic analytics over the RUM metrics tables

pub mod paid;
pub mod predominant;
