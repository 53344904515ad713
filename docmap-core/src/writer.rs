//! Streaming document writers.
//!
//! The mapper emits documents as a sequence of named fields, opening and closing
//! sub-document scopes as needed. Field order is preserved and is part of the contract.

use bson::{Bson, Document};

use crate::error::{MappingError, MappingResult};

/// A sink for named fields and nested sub-documents.
///
/// A single writer must not be shared by concurrent mapping calls.
pub trait DocumentWriter {
    /// Sets the name of the next value or sub-document.
    fn write_name(&mut self, name: &str) -> MappingResult<()>;

    /// Writes a value under the pending name.
    fn write_value(&mut self, value: Bson) -> MappingResult<()>;

    /// Opens a sub-document under the pending name.
    fn write_start_document(&mut self) -> MappingResult<()>;

    /// Closes the innermost open sub-document.
    fn write_end_document(&mut self) -> MappingResult<()>;
}

#[derive(Debug, Default)]
struct Scope {
    /// Name this scope is stored under in its parent; `None` for the root.
    name: Option<String>,
    document: Document,
    pending: Option<String>,
}

/// Builds an in-memory [`Document`].
///
/// # Example
///
/// ```ignore
/// let mut writer = BsonDocumentWriter::new();
/// writer.write_name("_id")?;
/// writer.write_start_document()?;
/// writer.write_name("OrderId")?;
/// writer.write_value(Bson::Int32(7))?;
/// writer.write_end_document()?;
/// let document = writer.into_document()?;
/// ```
#[derive(Debug)]
pub struct BsonDocumentWriter {
    scopes: Vec<Scope>,
}

impl Default for BsonDocumentWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BsonDocumentWriter {
    /// Creates a writer positioned in an empty root document.
    pub fn new() -> Self {
        BsonDocumentWriter {
            scopes: vec![Scope::default()],
        }
    }

    /// Returns the number of open sub-documents below the root.
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Finishes writing and returns the root document.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidWriterState`] if a sub-document is still open or a
    /// name was written without a value.
    pub fn into_document(mut self) -> MappingResult<Document> {
        if self.depth() > 0 {
            return Err(MappingError::InvalidWriterState(format!(
                "{} sub-document(s) still open",
                self.depth()
            )));
        }
        let root = self
            .scopes
            .pop()
            .ok_or_else(|| MappingError::InvalidWriterState("writer has no root".to_string()))?;
        if let Some(name) = root.pending {
            return Err(MappingError::InvalidWriterState(format!(
                "field {name} has no value"
            )));
        }
        Ok(root.document)
    }

    fn current(&mut self) -> MappingResult<&mut Scope> {
        self.scopes
            .last_mut()
            .ok_or_else(|| MappingError::InvalidWriterState("writer has no root".to_string()))
    }

    fn take_pending(&mut self, action: &str) -> MappingResult<String> {
        self.current()?.pending.take().ok_or_else(|| {
            MappingError::InvalidWriterState(format!("cannot {action} without a field name"))
        })
    }
}

impl DocumentWriter for BsonDocumentWriter {
    fn write_name(&mut self, name: &str) -> MappingResult<()> {
        let scope = self.current()?;
        if let Some(pending) = &scope.pending {
            return Err(MappingError::InvalidWriterState(format!(
                "field {pending} has no value"
            )));
        }
        scope.pending = Some(name.to_string());
        Ok(())
    }

    fn write_value(&mut self, value: Bson) -> MappingResult<()> {
        let name = self.take_pending("write a value")?;
        self.current()?.document.insert(name, value);
        Ok(())
    }

    fn write_start_document(&mut self) -> MappingResult<()> {
        let name = self.take_pending("start a document")?;
        self.scopes.push(Scope {
            name: Some(name),
            ..Scope::default()
        });
        Ok(())
    }

    fn write_end_document(&mut self) -> MappingResult<()> {
        if self.depth() == 0 {
            return Err(MappingError::InvalidWriterState(
                "no open sub-document to end".to_string(),
            ));
        }
        let scope = self
            .scopes
            .pop()
            .ok_or_else(|| MappingError::InvalidWriterState("writer has no root".to_string()))?;
        if let Some(pending) = scope.pending {
            return Err(MappingError::InvalidWriterState(format!(
                "field {pending} has no value"
            )));
        }
        let name = scope
            .name
            .ok_or_else(|| MappingError::InvalidWriterState("unnamed sub-document".to_string()))?;

        self.current()?.document.insert(name, Bson::Document(scope.document));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn writes_nested_documents_in_order() {
        let mut writer = BsonDocumentWriter::new();
        writer.write_name("_id").unwrap();
        writer.write_start_document().unwrap();
        writer.write_name("b").unwrap();
        writer.write_value(Bson::Int32(2)).unwrap();
        writer.write_name("a").unwrap();
        writer.write_value(Bson::Int32(1)).unwrap();
        assert_eq!(writer.depth(), 1);
        writer.write_end_document().unwrap();
        writer.write_name("z").unwrap();
        writer.write_value(Bson::Null).unwrap();

        let document = writer.into_document().unwrap();
        assert_eq!(document, doc! { "_id": { "b": 2, "a": 1 }, "z": null });
        let keys: Vec<_> = document.get_document("_id").unwrap().keys().cloned().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn value_without_name_is_rejected() {
        let mut writer = BsonDocumentWriter::new();
        assert!(matches!(
            writer.write_value(Bson::Int32(1)).unwrap_err(),
            MappingError::InvalidWriterState(_)
        ));
    }

    #[test]
    fn unbalanced_scopes_are_rejected() {
        let mut writer = BsonDocumentWriter::new();
        assert!(writer.write_end_document().is_err());

        writer.write_name("open").unwrap();
        writer.write_start_document().unwrap();
        assert!(writer.into_document().is_err());
    }

    #[test]
    fn dangling_name_is_rejected() {
        let mut writer = BsonDocumentWriter::new();
        writer.write_name("a").unwrap();
        assert!(writer.write_name("b").is_err());
        assert!(writer.into_document().is_err());
    }
}
