//! Schema registry
//!
//! An arena of built schemas. Registering hands back a [`ClassId`], a small
//! index that stays valid for the registry's lifetime.

use crate::error::{SchemaError, SchemaResult};
use crate::schema::ClassSchema;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Index of a schema within a [`SchemaRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(u32);

impl ClassId {
    /// Arena index
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

/// Once-built catalogue of every class a program binds
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: Vec<Arc<ClassSchema>>,
    by_name: FxHashMap<Arc<str>, ClassId>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schema; binary names are unique within one registry
    pub fn register(&mut self, schema: ClassSchema) -> SchemaResult<ClassId> {
        let name: Arc<str> = schema.name().into();
        if self.by_name.contains_key(&name) {
            return Err(SchemaError::DuplicateClass {
                name: name.to_string(),
            });
        }
        let id = ClassId(self.schemas.len() as u32);
        self.schemas.push(Arc::new(schema));
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Schema by id
    pub fn get(&self, id: ClassId) -> Option<&Arc<ClassSchema>> {
        self.schemas.get(id.index())
    }

    /// Id by binary name
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// Schema by binary name
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<ClassSchema>> {
        self.lookup(name).and_then(|id| self.get(id))
    }

    /// Iterate in registration order
    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &Arc<ClassSchema>)> + '_ {
        self.schemas
            .iter()
            .enumerate()
            .map(|(i, schema)| (ClassId(i as u32), schema))
    }

    /// Number of registered schemas
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
