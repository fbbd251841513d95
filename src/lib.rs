//! Library crate for topkey exposing reusable modules.
pub mod controller;
pub mod frame;
pub mod merge;
pub mod page;
pub mod progress;
pub mod query;
pub mod server;
pub mod table;
pub mod types;
