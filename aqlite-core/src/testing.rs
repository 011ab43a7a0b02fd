//! A small backend for unit tests that only need predictable storage.

use std::{collections::BTreeMap, sync::Mutex};

use serde_json::Value;

use crate::{
    backend::{CollectionInfo, DatabaseBackend},
    document::{CollectionType, KEY_FIELD, REV_FIELD, WriteOptions, decorate, into_object, new_revision, strip_pseudo_fields},
    document_id::validate_collection_name,
    error::{DatabaseError, DatabaseResult},
};

/// Document collections kept as vectors of decorated documents.
#[derive(Debug, Default)]
pub(crate) struct TestBackend {
    collections: Mutex<BTreeMap<String, Vec<Value>>>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collection holding `documents`; missing keys are numbered from 1.
    pub fn with_collection(self, name: &str, documents: impl IntoIterator<Item = Value>) -> Self {
        self.create_collection(name, CollectionType::Document).unwrap();
        for document in documents {
            self.insert_document(name, document, WriteOptions::new()).unwrap();
        }
        self
    }

    fn with<R>(&self, collection: &str, f: impl FnOnce(&mut Vec<Value>) -> DatabaseResult<R>) -> DatabaseResult<R> {
        let mut collections = self.collections.lock().unwrap();
        let documents = collections
            .get_mut(collection)
            .ok_or_else(|| DatabaseError::collection_not_found(collection))?;
        f(documents)
    }

    fn position(documents: &[Value], key: &str) -> Option<usize> {
        documents
            .iter()
            .position(|document| document[KEY_FIELD] == key)
    }
}

impl DatabaseBackend for TestBackend {
    fn create_collection(&self, name: &str, collection_type: CollectionType) -> DatabaseResult<CollectionInfo> {
        validate_collection_name(name)?;

        let mut collections = self.collections.lock().unwrap();
        if collections.contains_key(name) {
            return Err(DatabaseError::duplicate_name(name));
        }
        collections.insert(name.to_string(), Vec::new());

        Ok(CollectionInfo { name: name.to_string(), collection_type })
    }

    fn delete_collection(&self, name: &str) -> DatabaseResult<()> {
        self.collections
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DatabaseError::collection_not_found(name))
    }

    fn collection_info(&self, name: &str) -> DatabaseResult<CollectionInfo> {
        self.with(name, |_| {
            Ok(CollectionInfo { name: name.to_string(), collection_type: CollectionType::Document })
        })
    }

    fn list_collections(&self) -> DatabaseResult<Vec<String>> {
        Ok(self.collections.lock().unwrap().keys().cloned().collect())
    }

    fn get_document(&self, collection: &str, key: Option<&str>) -> DatabaseResult<Option<Value>> {
        self.with(collection, |documents| {
            Ok(key
                .and_then(|key| Self::position(documents, key))
                .map(|index| documents[index].clone()))
        })
    }

    fn insert_document(&self, collection: &str, document: Value, _: WriteOptions) -> DatabaseResult<Option<Value>> {
        self.with(collection, |documents| {
            let mut object = into_object(document)?;
            let key = match object.get(KEY_FIELD).and_then(Value::as_str) {
                Some(key) => key.to_string(),
                None => (documents.len() + 1).to_string(),
            };
            if Self::position(documents, &key).is_some() {
                return Err(DatabaseError::unique_constraint_violated(&key));
            }

            strip_pseudo_fields(&mut object);
            object.insert(REV_FIELD.to_string(), Value::String(new_revision()));

            let stored = decorate(collection, &key, &object);
            documents.push(stored.clone());
            Ok(Some(stored))
        })
    }

    fn replace_document(&self, collection: &str, key: &str, document: Value, _: WriteOptions) -> DatabaseResult<Option<Value>> {
        self.with(collection, |documents| {
            let index = Self::position(documents, key).ok_or_else(DatabaseError::document_not_found)?;
            let mut object = into_object(document)?;

            strip_pseudo_fields(&mut object);
            object.insert(REV_FIELD.to_string(), Value::String(new_revision()));

            documents[index] = decorate(collection, key, &object);
            Ok(Some(documents[index].clone()))
        })
    }

    fn remove_document(&self, collection: &str, key: &str, _: Option<&str>, _: WriteOptions) -> DatabaseResult<()> {
        self.with(collection, |documents| {
            let index = Self::position(documents, key).ok_or_else(DatabaseError::document_not_found)?;
            documents.remove(index);
            Ok(())
        })
    }

    fn truncate_collection(&self, collection: &str) -> DatabaseResult<()> {
        self.with(collection, |documents| {
            documents.clear();
            Ok(())
        })
    }

    fn documents(&self, collection: &str) -> DatabaseResult<Vec<Value>> {
        self.with(collection, |documents| Ok(documents.clone()))
    }
}
