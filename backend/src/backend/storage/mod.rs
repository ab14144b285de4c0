//! # Storage Module
//!
//! Data persistence for the fee tracker. File-based storage under a data
//! directory: CSV row files per entity (one subdirectory per academic year,
//! catalog files at the root) plus YAML for institute metadata and
//! permission sets.

pub mod csv;
pub mod traits;

pub use csv::*;
pub use traits::*;
