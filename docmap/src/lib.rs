//! Main docmap crate providing typed entity to document mapping.
//!
//! This crate is the primary entry point for users of the docmap project. It re-exports
//! the core modules from `docmap-core` and the derive macros from `docmap-macros`.
//!
//! # Features
//!
//! - **Typed entities** - Derive `Entity` on a struct and the model is built from its fields
//! - **Composite keys** - Multi-part primary keys are grouped under a nested `_id` document
//! - **Deterministic codecs** - Every property type resolves to one shared codec instance
//! - **Typed reads** - Materialize fields and whole entities straight from BSON documents
//!
//! # Quick Start
//!
//! ```ignore
//! use docmap::prelude::*;
//! use rust_decimal::Decimal;
//!
//! #[derive(Debug, Clone, PartialEq, Entity)]
//! #[docmap(name = "Order")]
//! pub struct Order {
//!     #[docmap(key, element = "CustomerId")]
//!     pub customer_id: String,
//!     #[docmap(key, element = "OrderId")]
//!     pub order_id: i32,
//!     #[docmap(element = "Amount")]
//!     pub amount: Decimal,
//! }
//!
//! let order = Order {
//!     customer_id: "ALFKI".to_string(),
//!     order_id: 10643,
//!     amount: Decimal::new(81400, 2),
//! };
//!
//! let mapper = EntityMapper::new();
//!
//! // { "_id": { "CustomerId": "ALFKI", "OrderId": 10643 }, "Amount": "814.00" }
//! let document = mapper.to_document(&order).unwrap();
//!
//! let restored = Order::materialize(&document).unwrap();
//! assert_eq!(restored, order);
//! ```
//!
//! # Dynamic Models
//!
//! Hosts that only know their entity types at runtime describe them with
//! [`EntityType::builder`](model::EntityType::builder) or load them from JSON with
//! [`EntityType::from_json`](model::EntityType::from_json), and hand the mapper a
//! [`TrackedEntry`](model::TrackedEntry) holding the current values.
//!
//! ```ignore
//! use docmap::prelude::*;
//!
//! let people = EntityType::builder("Person")
//!     .property(Property::new("Id", ValueType::ObjectId))
//!     .property(Property::new("Name", ValueType::String))
//!     .key(["Id"])
//!     .build()
//!     .unwrap();
//!
//! let entry = TrackedEntry::new(&people)
//!     .with_value("Id", Value::ObjectId(bson::oid::ObjectId::new()))
//!     .with_value("Name", Value::String("Ada".into()));
//!
//! let document = EntityMapper::new().to_document(&entry).unwrap();
//! let name: String = EntityMapper::new().read_property(&document, &people, "Name").unwrap();
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmap;

pub mod prelude;

pub use docmap_core::{codec, conventions, error, mapper, model, resolver, types, value, writer};

pub use docmap_macros::{Entity, Enumeration};

// Re-export BSON types for convenience
pub use bson;
