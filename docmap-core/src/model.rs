//! Property and entity descriptors supplied by the host model.
//!
//! Descriptors are declared once per entity type, either through the fluent
//! [`EntityTypeBuilder`], from JSON with [`EntityType::from_json`], or by
//! `#[derive(Entity)]`. They are immutable once built.
//!
//! # Example
//!
//! ```ignore
//! use docmap_core::{model::{EntityType, Property}, types::ValueType};
//!
//! let orders = EntityType::builder("Order")
//!     .property(Property::new("CustomerId", ValueType::String))
//!     .property(Property::new("OrderId", ValueType::Int32))
//!     .property(Property::new("Amount", ValueType::Decimal))
//!     .key(["CustomerId", "OrderId"])
//!     .build()?;
//! ```

use bson::Document;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::{
    error::{MappingError, MappingResult},
    mapper::KEY_FIELD_NAME,
    types::ValueType,
    value::Value,
};

/// How a date-time without offset is interpreted when stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateTimeKind {
    /// No zone assumption; the clock time is stored as-is.
    #[default]
    Unspecified,
    /// Marked as UTC. Stored through the local-time codec like `Local`.
    Utc,
    /// Interpreted as local time and converted on the way in and out.
    Local,
}

/// Describes a single property of an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    name: String,
    value_type: ValueType,
    nullable: bool,
    #[serde(default)]
    shadow: bool,
    element_name: String,
    #[serde(default)]
    date_time_kind: DateTimeKind,
}

impl Property {
    /// Creates a property whose element name equals its name.
    ///
    /// The nullable flag defaults to whether `value_type` is the nullable wrapper.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        let name = name.into();
        Property {
            element_name: name.clone(),
            nullable: value_type.is_nullable(),
            name,
            value_type,
            shadow: false,
            date_time_kind: DateTimeKind::Unspecified,
        }
    }

    /// Sets the document field name. An empty name means the property is not persisted.
    pub fn with_element_name(mut self, element_name: impl Into<String>) -> Self {
        self.element_name = element_name.into();
        self
    }

    /// Excludes the property from the document.
    pub fn not_mapped(self) -> Self {
        self.with_element_name("")
    }

    /// Sets whether an absent field reads back as "no value" instead of failing.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Marks the property as having no backing storage on the entity.
    pub fn with_shadow(mut self, shadow: bool) -> Self {
        self.shadow = shadow;
        self
    }

    /// Sets the date-time kind used to pick the date-time codec.
    pub fn with_date_time_kind(mut self, kind: DateTimeKind) -> Self {
        self.date_time_kind = kind;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_shadow(&self) -> bool {
        self.shadow
    }

    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    pub fn date_time_kind(&self) -> DateTimeKind {
        self.date_time_kind
    }

    /// Returns `true` when the property has a non-empty element name.
    pub fn is_mapped(&self) -> bool {
        !self.element_name.is_empty()
    }
}

/// Describes an entity type: its declared properties and ordered primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityType {
    name: String,
    properties: Vec<Property>,
    #[serde(default)]
    primary_key: Vec<String>,
}

impl EntityType {
    /// Creates a new builder for fluent construction.
    pub fn builder(name: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder::new(name)
    }

    /// Creates a validated entity type.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidModel`] if two properties share a name, a key
    /// name does not refer to a declared property, a nullable property has a type that
    /// cannot hold null, or two stored properties map to the same field.
    pub fn new(
        name: impl Into<String>,
        properties: Vec<Property>,
        primary_key: Vec<String>,
    ) -> MappingResult<Self> {
        let entity_type = EntityType {
            name: name.into(),
            properties,
            primary_key,
        };
        entity_type.validate()?;
        Ok(entity_type)
    }

    /// Parses and validates an entity type declared as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Serialization`] for malformed JSON and
    /// [`MappingError::InvalidModel`] when validation fails.
    pub fn from_json(json: &str) -> MappingResult<Self> {
        let entity_type: EntityType = serde_json::from_str(json)?;
        entity_type.validate()?;
        Ok(entity_type)
    }

    fn validate(&self) -> MappingResult<()> {
        let mut seen = HashSet::new();
        for property in &self.properties {
            if !seen.insert(property.name()) {
                return Err(MappingError::InvalidModel(format!(
                    "entity type {} declares property {} more than once",
                    self.name,
                    property.name()
                )));
            }
        }

        let mut key_seen = HashSet::new();
        for key in &self.primary_key {
            if !seen.contains(key.as_str()) {
                return Err(MappingError::InvalidModel(format!(
                    "primary key of {} refers to unknown property {}",
                    self.name, key
                )));
            }
            if !key_seen.insert(key.as_str()) {
                return Err(MappingError::InvalidModel(format!(
                    "primary key of {} lists {} more than once",
                    self.name, key
                )));
            }
        }

        if let Some(property) = self
            .properties
            .iter()
            .find(|property| property.is_nullable() && !property.value_type().is_nullable())
        {
            return Err(MappingError::InvalidModel(format!(
                "property {} of {} is nullable but its type {} cannot hold null",
                property.name(),
                self.name,
                property.value_type()
            )));
        }

        self.validate_element_names()
    }

    /// Stored properties sharing a document scope must have distinct element names.
    fn validate_element_names(&self) -> MappingResult<()> {
        let stored = |property: &&Property| !property.is_shadow() && property.is_mapped();
        let compound = self.key_properties().filter(stored).count() > 1;

        let mut top_level = HashSet::new();
        let mut key_scope = HashSet::new();
        if compound {
            top_level.insert(KEY_FIELD_NAME);
        }

        for property in self.properties.iter().filter(stored) {
            let scope = if compound && self.is_primary_key(property) {
                &mut key_scope
            } else {
                &mut top_level
            };
            if !scope.insert(property.element_name()) {
                return Err(MappingError::InvalidModel(format!(
                    "property {} of {} maps to element {} which is already in use",
                    property.name(),
                    self.name,
                    property.element_name()
                )));
            }
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the properties in declared order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Looks a property up by name.
    pub fn find_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|property| property.name() == name)
    }

    /// Looks a property up by name, failing with [`MappingError::PropertyNotFound`].
    pub fn property(&self, name: &str) -> MappingResult<&Property> {
        self.find_property(name).ok_or_else(|| MappingError::PropertyNotFound {
            entity: self.name.clone(),
            property: name.to_string(),
        })
    }

    /// Returns the key properties in declared key order.
    pub fn key_properties(&self) -> impl Iterator<Item = &Property> {
        self.primary_key
            .iter()
            .filter_map(|name| self.find_property(name))
    }

    /// Returns `true` if the property is part of the primary key.
    pub fn is_primary_key(&self, property: &Property) -> bool {
        self.primary_key.iter().any(|name| name == property.name())
    }
}

/// Fluent builder for [`EntityType`].
#[derive(Debug, Clone)]
pub struct EntityTypeBuilder {
    name: String,
    properties: Vec<Property>,
    primary_key: Vec<String>,
}

impl EntityTypeBuilder {
    /// Creates a new builder for an entity type with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        EntityTypeBuilder {
            name: name.into(),
            properties: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    /// Appends a property. Properties keep the order they are added in.
    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Sets the primary key, in key order.
    pub fn key<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.primary_key = names.into_iter().map(Into::into).collect();
        self
    }

    /// Builds and validates the entity type.
    ///
    /// # Errors
    ///
    /// See [`EntityType::new`].
    pub fn build(self) -> MappingResult<EntityType> {
        EntityType::new(self.name, self.properties, self.primary_key)
    }
}

/// Host-side access to one entity instance being persisted.
///
/// The update pipeline hands an entry to the mapper; the mapper only asks for the
/// entity's type and the current value of each property it writes.
pub trait EntityEntry {
    /// Returns the entity's type descriptor.
    fn entity_type(&self) -> &EntityType;

    /// Returns the current value of `property`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::PropertyNotFound`] if the entry holds no value for it.
    fn current_value(&self, property: &Property) -> MappingResult<Value>;
}

/// A statically typed entity that owns its model.
///
/// Usually implemented with `#[derive(Entity)]`.
pub trait Entity: EntityEntry + Sized {
    /// Returns the entity type, built once per process.
    fn model() -> &'static EntityType;

    /// Reconstructs an entity from a document.
    ///
    /// # Errors
    ///
    /// Fails with [`MappingError::FieldMissing`] for absent required fields, or with
    /// any codec error raised while decoding.
    fn materialize(document: &Document) -> MappingResult<Self>;
}

/// An [`EntityEntry`] backed by a map of property values.
///
/// Useful for hosts that track entities dynamically, and for shadow properties whose
/// values live only in the tracking layer.
#[derive(Debug, Clone)]
pub struct TrackedEntry<'a> {
    entity_type: &'a EntityType,
    values: HashMap<String, Value>,
}

impl<'a> TrackedEntry<'a> {
    /// Creates an entry with no values.
    pub fn new(entity_type: &'a EntityType) -> Self {
        TrackedEntry {
            entity_type,
            values: HashMap::new(),
        }
    }

    /// Sets the current value of a property.
    pub fn with_value(mut self, property: impl Into<String>, value: Value) -> Self {
        self.set(property, value);
        self
    }

    /// Sets the current value of a property.
    pub fn set(&mut self, property: impl Into<String>, value: Value) {
        self.values.insert(property.into(), value);
    }
}

impl EntityEntry for TrackedEntry<'_> {
    fn entity_type(&self) -> &EntityType {
        self.entity_type
    }

    fn current_value(&self, property: &Property) -> MappingResult<Value> {
        self.values
            .get(property.name())
            .cloned()
            .ok_or_else(|| MappingError::PropertyNotFound {
                entity: self.entity_type.name().to_string(),
                property: property.name().to_string(),
            })
    }
}
