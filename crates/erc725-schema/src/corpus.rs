use crate::builtin;
use crate::error::{Result, SchemaError};
use crate::key::{KeyShape, parse_key};
use crate::schema::SchemaEntry;
use alloy_primitives::B256;
use erc725_common::{KeyType, Value};
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// An ordered set of schema entries, unique by name.
///
/// Order is load order and decides which entry wins when several match a key.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    entries: Vec<SchemaEntry>,
    /// Map from name to position in `entries`
    by_name: BTreeMap<SmolStr, usize>,
}

impl SchemaSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled-in LSP schemas
    pub fn builtin() -> Self {
        builtin::schemas().clone()
    }

    /// Parse a JSON array of schema entries
    pub fn from_json_str(src: &str) -> Result<Self> {
        Self::parse_source(Path::new("<inline>"), src)
    }

    pub(crate) fn parse_source(path: &Path, src: &str) -> Result<Self> {
        let entries: Vec<SchemaEntry> = serde_json::from_str(src)
            .map_err(|e| SchemaError::parse_error_with_source(e, path, src.to_owned()))?;
        let mut set = Self::new();
        set.extend(entries);
        Ok(set)
    }

    /// Load one schema file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let src = fs::read_to_string(path)?;
        Self::parse_source(path, &src)
    }

    /// Load every `*.json` file of a directory, in file name order
    pub fn load_from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let mut files = Vec::new();
        for entry in fs::read_dir(path.as_ref())? {
            let file = entry?.path();
            if file.is_file() && file.extension().is_some_and(|ext| ext == "json") {
                files.push(file);
            }
        }
        files.sort();

        let mut set = Self::new();
        for file in files {
            set.extend(Self::load_file(&file)?);
        }
        Ok(set)
    }

    /// Add an entry. An entry with the same name is replaced in place.
    pub fn insert(&mut self, entry: SchemaEntry) {
        match self.by_name.get(&entry.name) {
            Some(&index) => self.entries[index] = entry,
            None => {
                self.by_name.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Entry by exact name
    pub fn get(&self, name: &str) -> Option<&SchemaEntry> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    /// Entry whose declared key equals `key`. Dynamic templates never match.
    pub fn get_by_key(&self, key: &B256) -> Option<&SchemaEntry> {
        self.entries
            .iter()
            .find(|entry| entry.key == *key && !entry.is_dynamic())
    }

    /// Concrete entry for a name, a hashed key (with or without `0x`) or a
    /// dynamic template plus the values of its placeholders.
    ///
    /// Keys that match no declared entry go through [`SchemaSet::get_schema`].
    pub fn lookup(&self, name_or_key: &str, parts: &[Value]) -> Result<SchemaEntry> {
        if let Some(entry) = self.get(name_or_key) {
            return if entry.is_dynamic() {
                entry.materialize(parts)
            } else if parts.is_empty() {
                Ok(entry.clone())
            } else {
                Err(SchemaError::DynamicPartCount {
                    name: entry.name.clone(),
                    expected: 0,
                    given: parts.len(),
                })
            };
        }
        if let Ok(key) = parse_key(name_or_key) {
            if let Some(entry) = self.get_by_key(&key) {
                return Ok(entry.clone());
            }
            if let Some(entry) = self.get_schema(&key) {
                return Ok(entry);
            }
        }
        // a concrete spelling such as `Map:0x<address>` resolves through its key
        if let Ok(shape) = KeyShape::parse(name_or_key) {
            if !shape.is_dynamic() && shape.key_type() != KeyType::Singleton && parts.is_empty() {
                let key = shape.encode(name_or_key, &[])?;
                if let Some(entry) = self.get_schema(&key) {
                    return Ok(entry.renamed(name_or_key, key));
                }
            }
        }
        Err(SchemaError::UnknownSchema(SmolStr::new(name_or_key)))
    }

    /// Iterate over entries in load order
    pub fn iter(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<SchemaEntry> for SchemaSet {
    fn extend<T: IntoIterator<Item = SchemaEntry>>(&mut self, iter: T) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

impl FromIterator<SchemaEntry> for SchemaSet {
    fn from_iter<T: IntoIterator<Item = SchemaEntry>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for SchemaSet {
    type Item = SchemaEntry;
    type IntoIter = std::vec::IntoIter<SchemaEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
