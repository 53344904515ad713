//! Entity serialization and typed field reads.
//!
//! The [`EntityMapper`] writes an entity's key and non-key properties into a
//! [`DocumentWriter`] and reads typed values back out of a [`Document`]. Both directions
//! derive the field address of a property through the same function,
//! [`EntityMapper::serialization_info`], so whatever is written under a path is looked up
//! under that same path.
//!
//! # Key grouping
//!
//! When more than one mapped, non-shadow property forms the primary key, all of them
//! are written as siblings inside the reserved [`KEY_FIELD_NAME`] sub-document. A single
//! key property is written directly under its own element name.
//!
//! ```ignore
//! // Composite key (CustomerId, OrderId) and a non-key Amount
//! { "_id": { "CustomerId": "ALFKI", "OrderId": 10643 }, "Amount": "814.50" }
//! ```

use bson::{Bson, Document};
use std::fmt;
use tracing::trace;

use crate::{
    codec::CodecRef,
    error::{MappingError, MappingResult},
    model::{EntityEntry, EntityType, Property},
    resolver::CodecResolver,
    types::ValueType,
    value::{Mappable, Value},
    writer::{BsonDocumentWriter, DocumentWriter},
};

/// Reserved field holding the members of a composite key.
pub const KEY_FIELD_NAME: &str = "_id";

/// The address of a field: a non-empty sequence of names from the document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// A path of exactly one name.
    pub fn single(name: impl Into<String>) -> Self {
        FieldPath {
            segments: vec![name.into()],
        }
    }

    /// A path of `first` followed by `rest`.
    pub fn nested<S: Into<String>>(first: impl Into<String>, rest: impl IntoIterator<Item = S>) -> Self {
        let mut segments = vec![first.into()];
        segments.extend(rest.into_iter().map(Into::into));
        FieldPath { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment: the name the value itself is stored under.
    pub fn leaf(&self) -> &str {
        // Never empty: both constructors push at least one segment.
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }

    /// The dotted form used in query filters, e.g. `_id.OrderId`.
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }

    /// Looks the path up in `document`.
    ///
    /// A missing segment, or an intermediate value that is not a sub-document, means the
    /// value is absent; it never fails.
    pub fn lookup<'d>(&self, document: &'d Document) -> Option<&'d Bson> {
        let (leaf, parents) = self.segments.split_last()?;
        let mut current = document;
        for segment in parents {
            match current.get(segment) {
                Some(Bson::Document(inner)) => current = inner,
                _ => return None,
            }
        }
        current.get(leaf)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

/// Everything needed to read or write one field: where it lives and how it is encoded.
#[derive(Debug, Clone)]
pub struct SerializationInfo {
    pub path: FieldPath,
    pub codec: CodecRef,
    pub value_type: ValueType,
}

impl SerializationInfo {
    /// Looks the raw value up and decodes it, or returns `None` if it is absent.
    fn try_read(&self, document: &Document) -> MappingResult<Option<Value>> {
        self.path
            .lookup(document)
            .map(|raw| self.codec.decode(raw))
            .transpose()
    }
}

/// Writes entities into documents and reads typed values back out.
///
/// The mapper holds no state besides a reference to the codec resolver; it can be used
/// from any number of threads as long as each call gets its own writer or document.
#[derive(Debug, Clone, Copy)]
pub struct EntityMapper<'r> {
    resolver: &'r CodecResolver,
}

impl Default for EntityMapper<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityMapper<'static> {
    /// Creates a mapper using the process-wide resolver.
    pub fn new() -> Self {
        EntityMapper {
            resolver: CodecResolver::global(),
        }
    }
}

impl<'r> EntityMapper<'r> {
    /// Creates a mapper using the given resolver.
    pub fn with_resolver(resolver: &'r CodecResolver) -> Self {
        EntityMapper { resolver }
    }

    /// Returns the key properties that are actually stored: non-shadow and mapped, in key order.
    pub fn stored_key_properties<'e>(&self, entity_type: &'e EntityType) -> Vec<&'e Property> {
        entity_type
            .key_properties()
            .filter(|property| !property.is_shadow() && property.is_mapped())
            .collect()
    }

    /// Computes the field path and codec for `property`.
    ///
    /// Key properties of an entity whose stored key has more than one member live under
    /// [`KEY_FIELD_NAME`]; every other property lives at its element name.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::PropertyNotMapped`] for a property with an empty element
    /// name, or the codec resolution error for its type.
    pub fn serialization_info(
        &self,
        entity_type: &EntityType,
        property: &Property,
    ) -> MappingResult<SerializationInfo> {
        if !property.is_mapped() {
            return Err(MappingError::PropertyNotMapped(property.name().to_string()));
        }

        let codec = self.resolver.resolve(property.value_type(), Some(property))?;
        let path = if entity_type.is_primary_key(property) && self.stored_key_properties(entity_type).len() > 1 {
            FieldPath::nested(KEY_FIELD_NAME, [property.element_name()])
        } else {
            FieldPath::single(property.element_name())
        };

        Ok(SerializationInfo {
            path,
            codec,
            value_type: property.value_type().clone(),
        })
    }

    /// Computes the serialization info of a free-standing element of type `T`.
    ///
    /// # Errors
    ///
    /// Returns the codec resolution error for `T`.
    pub fn element_serialization_info<T: Mappable>(&self, element_name: &str) -> MappingResult<SerializationInfo> {
        let value_type = T::value_type();
        Ok(SerializationInfo {
            path: FieldPath::single(element_name),
            codec: self.resolver.resolve(&value_type, None)?,
            value_type,
        })
    }

    /// Writes the stored key properties of `entry`.
    ///
    /// Nothing is written if no key property is stored. More than one stored key
    /// property is grouped in a [`KEY_FIELD_NAME`] sub-document; a single one is written
    /// directly under its element name.
    ///
    /// # Errors
    ///
    /// Propagates codec, value access and writer errors unmodified.
    pub fn write_key(&self, writer: &mut dyn DocumentWriter, entry: &dyn EntityEntry) -> MappingResult<()> {
        let entity_type = entry.entity_type();
        let key_properties = self.stored_key_properties(entity_type);
        if key_properties.is_empty() {
            return Ok(());
        }

        let compound = key_properties.len() > 1;
        if compound {
            writer.write_name(KEY_FIELD_NAME)?;
            writer.write_start_document()?;
        }

        for property in key_properties {
            let info = self.serialization_info(entity_type, property)?;
            self.write_property(writer, entry, property, &info)?;
        }

        if compound {
            writer.write_end_document()?;
        }
        Ok(())
    }

    /// Writes every stored, non-key property of `entry` accepted by `filter`, in declared order.
    ///
    /// The filter lets callers restrict a write to the properties that changed.
    ///
    /// # Errors
    ///
    /// Propagates codec, value access and writer errors unmodified.
    pub fn write_non_key(
        &self,
        writer: &mut dyn DocumentWriter,
        entry: &dyn EntityEntry,
        filter: Option<&dyn Fn(&Property) -> bool>,
    ) -> MappingResult<()> {
        let entity_type = entry.entity_type();
        let properties = entity_type.properties().iter().filter(|property| {
            !property.is_shadow()
                && !entity_type.is_primary_key(property)
                && property.is_mapped()
                && filter.is_none_or(|accept| accept(property))
        });

        for property in properties {
            let info = self.serialization_info(entity_type, property)?;
            self.write_property(writer, entry, property, &info)?;
        }
        Ok(())
    }

    fn write_property(
        &self,
        writer: &mut dyn DocumentWriter,
        entry: &dyn EntityEntry,
        property: &Property,
        info: &SerializationInfo,
    ) -> MappingResult<()> {
        let value = entry.current_value(property)?;
        trace!(field = %info.path, property = property.name(), "writing property");

        // Inside the key sub-document only the leaf name is written.
        writer.write_name(info.path.leaf())?;
        writer.write_value(info.codec.encode(&value)?)
    }

    /// Serializes a whole entity: its key followed by all non-key properties.
    ///
    /// # Errors
    ///
    /// See [`EntityMapper::write_key`] and [`EntityMapper::write_non_key`].
    pub fn to_document(&self, entry: &dyn EntityEntry) -> MappingResult<Document> {
        let mut writer = BsonDocumentWriter::new();
        self.write_key(&mut writer, entry)?;
        self.write_non_key(&mut writer, entry, None)?;
        writer.into_document()
    }

    /// Builds the document that addresses `entry` by key, for replace and delete filters.
    ///
    /// # Errors
    ///
    /// See [`EntityMapper::write_key`].
    pub fn key_filter(&self, entry: &dyn EntityEntry) -> MappingResult<Document> {
        let mut writer = BsonDocumentWriter::new();
        self.write_key(&mut writer, entry)?;
        writer.into_document()
    }

    /// Reads the value of the named property from `document`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::FieldMissing`] if the value is absent and the property is
    /// not nullable, [`MappingError::PropertyNotFound`] or
    /// [`MappingError::PropertyNotMapped`] for a bad property, and decoding errors.
    pub fn read_property<T: Mappable>(
        &self,
        document: &Document,
        entity_type: &EntityType,
        property_name: &str,
    ) -> MappingResult<T> {
        let property = entity_type.property(property_name)?;
        let info = self.serialization_info(entity_type, property)?;

        match info.try_read(document)? {
            Some(value) => T::from_value(value),
            None if property.is_nullable() => T::from_value(Value::Null),
            None => Err(MappingError::FieldMissing(property.name().to_string())),
        }
    }

    /// Reads a top-level element of type `T` from `document`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::FieldMissing`] if the element is absent and `T` is not
    /// nullable, and decoding errors.
    pub fn read_element<T: Mappable>(&self, document: &Document, element_name: &str) -> MappingResult<T> {
        let info = self.element_serialization_info::<T>(element_name)?;

        match info.try_read(document)? {
            Some(value) => T::from_value(value),
            None if info.value_type.is_nullable() => T::from_value(Value::Null),
            None => Err(MappingError::FieldMissing(element_name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrackedEntry;
    use bson::{Uuid, doc};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn orders() -> EntityType {
        EntityType::builder("Order")
            .property(Property::new("CustomerId", ValueType::String))
            .property(Property::new("OrderId", ValueType::Int32))
            .property(Property::new("Amount", ValueType::Decimal))
            .key(["CustomerId", "OrderId"])
            .build()
            .unwrap()
    }

    fn notes() -> EntityType {
        EntityType::builder("Note")
            .property(Property::new("Id", ValueType::Uuid))
            .property(Property::new("Note", ValueType::nullable(ValueType::String)))
            .key(["Id"])
            .build()
            .unwrap()
    }

    #[test]
    fn composite_key_is_grouped() {
        let entity_type = orders();
        let amount = Decimal::from_str("19.99").unwrap();
        let entry = TrackedEntry::new(&entity_type)
            .with_value("CustomerId", Value::String("ALFKI".to_string()))
            .with_value("OrderId", Value::Int32(10643))
            .with_value("Amount", Value::Decimal(amount));

        let mapper = EntityMapper::new();
        let document = mapper.to_document(&entry).unwrap();
        assert_eq!(
            document,
            doc! { "_id": { "CustomerId": "ALFKI", "OrderId": 10643 }, "Amount": "19.99" }
        );

        assert_eq!(mapper.read_property::<String>(&document, &entity_type, "CustomerId").unwrap(), "ALFKI");
        assert_eq!(mapper.read_property::<i32>(&document, &entity_type, "OrderId").unwrap(), 10643);
        assert_eq!(mapper.read_property::<Decimal>(&document, &entity_type, "Amount").unwrap(), amount);
    }

    #[test]
    fn single_key_is_not_wrapped() {
        let entity_type = notes();
        let id = Uuid::new();
        let entry = TrackedEntry::new(&entity_type)
            .with_value("Id", Value::Uuid(id))
            .with_value("Note", Value::Null);

        let mapper = EntityMapper::new();
        let document = mapper.to_document(&entry).unwrap();
        assert_eq!(document, doc! { "Id": bson::Binary::from_uuid(id), "Note": null });

        assert_eq!(mapper.read_property::<Uuid>(&document, &entity_type, "Id").unwrap(), id);
        assert_eq!(mapper.read_property::<Option<String>>(&document, &entity_type, "Note").unwrap(), None);
    }

    #[test]
    fn paths_are_the_same_for_read_and_write() {
        let entity_type = orders();
        let mapper = EntityMapper::new();

        let order_id = entity_type.property("OrderId").unwrap();
        let info = mapper.serialization_info(&entity_type, order_id).unwrap();
        assert_eq!(info.path.segments(), ["_id", "OrderId"]);
        assert_eq!(info.path.dotted(), "_id.OrderId");

        let amount = entity_type.property("Amount").unwrap();
        let info = mapper.serialization_info(&entity_type, amount).unwrap();
        assert_eq!(info.path, FieldPath::single("Amount"));
        assert!(!info.path.is_nested());
    }

    #[test]
    fn shadow_and_unmapped_key_members_do_not_count() {
        let entity_type = EntityType::builder("Tenanted")
            .property(Property::new("TenantId", ValueType::Int32).with_shadow(true))
            .property(Property::new("Id", ValueType::Int64))
            .property(Property::new("Version", ValueType::Int32).not_mapped())
            .key(["TenantId", "Id", "Version"])
            .build()
            .unwrap();
        let entry = TrackedEntry::new(&entity_type).with_value("Id", Value::Int64(9));

        let mapper = EntityMapper::new();
        assert_eq!(mapper.key_filter(&entry).unwrap(), doc! { "Id": 9i64 });

        let id = entity_type.property("Id").unwrap();
        assert_eq!(mapper.serialization_info(&entity_type, id).unwrap().path, FieldPath::single("Id"));
    }

    #[test]
    fn entity_without_stored_key_writes_nothing_for_the_key() {
        let entity_type = EntityType::builder("Keyless")
            .property(Property::new("Name", ValueType::String))
            .build()
            .unwrap();
        let entry = TrackedEntry::new(&entity_type).with_value("Name", Value::String("x".to_string()));

        let mapper = EntityMapper::new();
        assert_eq!(mapper.key_filter(&entry).unwrap(), Document::new());
        assert_eq!(mapper.to_document(&entry).unwrap(), doc! { "Name": "x" });
    }

    #[test]
    fn non_key_writes_respect_filter_and_declared_order() {
        let entity_type = EntityType::builder("Product")
            .property(Property::new("Id", ValueType::Int32))
            .property(Property::new("Name", ValueType::String))
            .property(Property::new("Price", ValueType::Double))
            .property(Property::new("Stock", ValueType::Int32))
            .property(Property::new("Cached", ValueType::Int32).not_mapped())
            .property(Property::new("RowVersion", ValueType::Int64).with_shadow(true))
            .key(["Id"])
            .build()
            .unwrap();
        let entry = TrackedEntry::new(&entity_type)
            .with_value("Id", Value::Int32(1))
            .with_value("Name", Value::String("Chai".to_string()))
            .with_value("Price", Value::Double(18.0))
            .with_value("Stock", Value::Int32(39));

        let mapper = EntityMapper::new();
        let mut writer = BsonDocumentWriter::new();
        let changed = |property: &Property| property.name() != "Price";
        mapper.write_non_key(&mut writer, &entry, Some(&changed)).unwrap();

        let document = writer.into_document().unwrap();
        let keys: Vec<_> = document.keys().cloned().collect();
        assert_eq!(keys, ["Name", "Stock"]);
    }

    #[test]
    fn element_names_differ_from_property_names() {
        let entity_type = EntityType::builder("Customer")
            .property(Property::new("Id", ValueType::String).with_element_name("_id"))
            .property(Property::new("CompanyName", ValueType::String).with_element_name("company"))
            .key(["Id"])
            .build()
            .unwrap();
        let entry = TrackedEntry::new(&entity_type)
            .with_value("Id", Value::String("BONAP".to_string()))
            .with_value("CompanyName", Value::String("Bon app'".to_string()));

        let mapper = EntityMapper::new();
        let document = mapper.to_document(&entry).unwrap();
        assert_eq!(document, doc! { "_id": "BONAP", "company": "Bon app'" });
        assert_eq!(
            mapper.read_property::<String>(&document, &entity_type, "CompanyName").unwrap(),
            "Bon app'"
        );
    }

    #[test]
    fn missing_required_field_fails() {
        let entity_type = orders();
        let mapper = EntityMapper::new();
        let document = doc! { "_id": { "CustomerId": "ALFKI" } };

        match mapper.read_property::<i32>(&document, &entity_type, "OrderId") {
            Err(MappingError::FieldMissing(field)) => assert_eq!(field, "OrderId"),
            other => panic!("expected FieldMissing, got {other:?}"),
        }
        assert!(matches!(
            mapper.read_property::<Decimal>(&document, &entity_type, "Amount").unwrap_err(),
            MappingError::FieldMissing(_)
        ));
    }

    #[test]
    fn broken_intermediate_segment_is_absence_not_a_type_error() {
        let entity_type = orders();
        let mapper = EntityMapper::new();

        for document in [doc! {}, doc! { "_id": "not a document" }, doc! { "_id": null }] {
            assert!(matches!(
                mapper.read_property::<String>(&document, &entity_type, "CustomerId").unwrap_err(),
                MappingError::FieldMissing(_)
            ));
        }

        let nullable_key = EntityType::builder("Pair")
            .property(Property::new("A", ValueType::nullable(ValueType::Int32)))
            .property(Property::new("B", ValueType::Int32))
            .key(["A", "B"])
            .build()
            .unwrap();
        let document = doc! { "_id": 5 };
        assert_eq!(mapper.read_property::<Option<i32>>(&document, &nullable_key, "A").unwrap(), None);
    }

    #[test]
    fn nullable_flag_allows_absence() {
        let entity_type = EntityType::builder("Shipper")
            .property(Property::new("Id", ValueType::Int32))
            .property(Property::new("Phone", ValueType::nullable(ValueType::String)))
            .key(["Id"])
            .build()
            .unwrap();
        let mapper = EntityMapper::new();
        let document = doc! { "Id": 1 };

        assert_eq!(mapper.read_property::<Option<String>>(&document, &entity_type, "Phone").unwrap(), None);
    }

    #[test]
    fn unmapped_and_unknown_properties_cannot_be_read() {
        let entity_type = EntityType::builder("Widget")
            .property(Property::new("Id", ValueType::Int32))
            .property(Property::new("Scratch", ValueType::Int32).not_mapped())
            .key(["Id"])
            .build()
            .unwrap();
        let mapper = EntityMapper::new();
        let document = doc! { "Id": 1, "Scratch": 2 };

        assert!(matches!(
            mapper.read_property::<i32>(&document, &entity_type, "Scratch").unwrap_err(),
            MappingError::PropertyNotMapped(_)
        ));
        assert!(matches!(
            mapper.read_property::<i32>(&document, &entity_type, "Nope").unwrap_err(),
            MappingError::PropertyNotFound { .. }
        ));
    }

    #[test]
    fn element_reads() {
        let mapper = EntityMapper::new();
        let document = doc! { "count": 3, "tags": ["a", "b"], "missing_ok": null };

        assert_eq!(mapper.read_element::<i64>(&document, "count").unwrap(), 3);
        assert_eq!(mapper.read_element::<Vec<String>>(&document, "tags").unwrap(), ["a", "b"]);
        assert_eq!(mapper.read_element::<Option<i32>>(&document, "missing_ok").unwrap(), None);
        assert_eq!(mapper.read_element::<Option<i32>>(&document, "absent").unwrap(), None);
        assert!(matches!(
            mapper.read_element::<i32>(&document, "absent").unwrap_err(),
            MappingError::FieldMissing(_)
        ));
    }

    #[test]
    fn present_null_in_required_field_is_a_type_error() {
        let mapper = EntityMapper::new();
        let document = doc! { "count": null };
        assert!(matches!(
            mapper.read_element::<i32>(&document, "count").unwrap_err(),
            MappingError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn codec_errors_propagate_from_writes() {
        let entity_type = EntityType::builder("Bad")
            .property(Property::new("Id", ValueType::Int32))
            .property(Property::new("Where", ValueType::record("Address")))
            .key(["Id"])
            .build()
            .unwrap();
        let entry = TrackedEntry::new(&entity_type)
            .with_value("Id", Value::Int32(1))
            .with_value("Where", Value::Null);

        assert!(matches!(
            EntityMapper::new().to_document(&entry).unwrap_err(),
            MappingError::CodecUnsupported(name) if name == "Address"
        ));
    }
}
