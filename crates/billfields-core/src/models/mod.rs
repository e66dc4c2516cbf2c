//! Data models: fragments, candidates, extracted fields, schemas and
//! configuration.

pub mod config;
pub mod fields;
pub mod fragment;
pub mod schema;
