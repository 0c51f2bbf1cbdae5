//! Versioned event payload schemas.
//!
//! The registry is built once at startup and handed to the pipeline; nothing
//! reads schema files after that.

use std::path::{Path, PathBuf};

use serde_json::Value;

/// Versions accepted by this build, oldest first.
pub const SUPPORTED_VERSIONS: &[&str] = &["0.1.0"];

const BUILTIN: &[(&str, &str)] = &[("0.1.0", include_str!("schema-0.1.0.json"))];

#[derive(Debug)]
pub enum SchemaError {
    UnknownVersion(String),
    Io { path: PathBuf, source: std::io::Error },
    InvalidDocument { version: String, message: String },
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::UnknownVersion(version) => write!(f, "Unknown schema version: {version}"),
            SchemaError::Io { path, source } => {
                write!(f, "Failed to read schema {}: {source}", path.display())
            }
            SchemaError::InvalidDocument { version, message } => {
                write!(f, "Invalid schema document for version {version}: {message}")
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// A schema document together with its compiled draft-7 validator.
pub struct Schema {
    version: String,
    document: Value,
    validator: jsonschema::Validator,
}

impl Schema {
    pub fn compile(version: impl Into<String>, document: Value) -> Result<Self, SchemaError> {
        let version = version.into();
        let validator = jsonschema::draft7::options()
            .should_validate_formats(true)
            .build(&document)
            .map_err(|e| SchemaError::InvalidDocument {
                version: version.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            version,
            document,
            validator,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub(crate) fn validator(&self) -> &jsonschema::Validator {
        &self.validator
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema").field("version", &self.version).finish()
    }
}

pub struct SchemaRegistry {
    schemas: Vec<Schema>,
}

impl SchemaRegistry {
    /// Registry over explicit `(version, document)` pairs, kept in the given order.
    pub fn from_documents<I, V>(documents: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (V, Value)>,
        V: Into<String>,
    {
        let schemas = documents
            .into_iter()
            .map(|(version, document)| Schema::compile(version, document))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { schemas })
    }

    /// The documents compiled into the binary.
    pub fn builtin() -> Result<Self, SchemaError> {
        let documents = BUILTIN
            .iter()
            .map(|(version, raw)| {
                serde_json::from_str::<Value>(raw)
                    .map(|doc| (*version, doc))
                    .map_err(|e| SchemaError::InvalidDocument {
                        version: version.to_string(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_documents(documents)
    }

    /// Load `schema-<version>.json` for every supported version from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, SchemaError> {
        let mut documents = Vec::with_capacity(SUPPORTED_VERSIONS.len());
        for version in SUPPORTED_VERSIONS {
            let path = dir.join(format!("schema-{version}.json"));
            let raw = std::fs::read_to_string(&path).map_err(|source| SchemaError::Io {
                path: path.clone(),
                source,
            })?;
            let document =
                serde_json::from_str(&raw).map_err(|e| SchemaError::InvalidDocument {
                    version: version.to_string(),
                    message: e.to_string(),
                })?;
            documents.push((*version, document));
        }
        Self::from_documents(documents)
    }

    /// Exact-match lookup; no version ranges.
    pub fn get_schema(&self, version: &str) -> Result<&Schema, SchemaError> {
        self.schemas
            .iter()
            .find(|s| s.version == version)
            .ok_or_else(|| SchemaError::UnknownVersion(version.to_string()))
    }

    pub fn versions(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.version.as_str()).collect()
    }

    pub fn latest(&self) -> Option<&Schema> {
        self.schemas.last()
    }
}
