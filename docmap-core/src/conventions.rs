//! Model discovery conventions.

use crate::types::ValueType;

/// Decides whether a referenced type is embedded in its parent document.
///
/// Plain composite types are embedded. Generic containers are not: they describe a
/// multi-valued relationship whose elements need their own discovery. The string-keyed
/// untyped map is the exception and is embedded as a bag of fields. Generic types that
/// are not containers (such as the nullable wrapper) are embedded as well.
pub fn should_be_embedded(value_type: &ValueType) -> bool {
    !value_type.is_generic() || matches!(value_type, ValueType::UntypedMap) || !value_type.is_iterable()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_records_are_embedded() {
        assert!(should_be_embedded(&ValueType::record("Address")));
    }

    #[test]
    fn generic_sequences_are_not_embedded() {
        assert!(!should_be_embedded(&ValueType::sequence(ValueType::record("OrderLine"))));
        assert!(!should_be_embedded(&ValueType::map(ValueType::String, ValueType::record("Tag"))));
    }

    #[test]
    fn untyped_map_is_embedded() {
        assert!(should_be_embedded(&ValueType::UntypedMap));
    }

    #[test]
    fn non_container_generics_are_embedded() {
        assert!(should_be_embedded(&ValueType::nullable(ValueType::record("Point"))));
        assert!(should_be_embedded(&ValueType::generic("Audited", [ValueType::record("Price")])));
    }

    #[test]
    fn fixed_arrays_are_not_generic_and_so_embed() {
        assert!(should_be_embedded(&ValueType::array(ValueType::record("Line"))));
    }
}
