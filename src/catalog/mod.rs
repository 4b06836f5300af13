//! Schema catalog for the engine tables

mod registry;
pub mod tables;

pub use registry::{SchemaComponent, SchemaRegistry, TableHandler};
