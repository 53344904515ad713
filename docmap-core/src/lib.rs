//! Maps typed, schema-described entities onto BSON documents and back.
//!
//! This crate is the core of the docmap project and provides:
//!
//! - **Type descriptors** ([`types`]) - The closed set of property types the mapper understands
//! - **Values** ([`value`]) - Runtime property values and the [`Mappable`](value::Mappable) bridge from Rust types
//! - **Model** ([`model`]) - Property and entity descriptors, entity entries
//! - **Codecs** ([`codec`]) - Stateless converters between values and BSON
//! - **Codec resolution** ([`resolver`]) - Deterministic type-to-codec dispatch
//! - **Document writers** ([`writer`]) - Streaming construction of documents
//! - **Entity mapping** ([`mapper`]) - Key grouping, field paths, typed reads
//! - **Conventions** ([`conventions`]) - Embedded-vs-referenced classification
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docmap_core::{mapper::EntityMapper, model::{EntityType, Property, TrackedEntry}, types::ValueType, value::Value};
//!
//! let orders = EntityType::builder("Order")
//!     .property(Property::new("CustomerId", ValueType::String))
//!     .property(Property::new("OrderId", ValueType::Int32))
//!     .key(["CustomerId", "OrderId"])
//!     .build()?;
//!
//! let entry = TrackedEntry::new(&orders)
//!     .with_value("CustomerId", Value::String("ALFKI".into()))
//!     .with_value("OrderId", Value::Int32(10643));
//!
//! let document = EntityMapper::new().to_document(&entry)?;
//! // { "_id": { "CustomerId": "ALFKI", "OrderId": 10643 } }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmap_core;

pub mod codec;
pub mod conventions;
pub mod error;
pub mod mapper;
pub mod model;
pub mod resolver;
pub mod types;
pub mod value;
pub mod writer;

#[cfg(test)]
mod proptest_tests;
