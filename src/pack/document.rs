use crate::error::{Error, Result};
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct JsonDocument {
    path: String,
    root: Map<String, Value>,
}

impl JsonDocument {
    pub fn new(path: impl Into<String>, root: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            root,
        }
    }

    pub fn empty(path: impl Into<String>) -> Self {
        Self::new(path, Map::new())
    }

    pub(crate) fn parse(path: &str, bytes: &[u8]) -> Result<Self> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(root)) => Ok(Self::new(path, root)),
            Ok(_) => Err(Error::malformed(path, "root is not an object")),
            Err(e) => Err(Error::malformed(path, e.to_string())),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.root
    }

    /// The array stored under `field`, if present.
    pub fn array(&self, field: &str) -> Result<Option<&Vec<Value>>> {
        match self.root.get(field) {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(_) => Err(Error::malformed(
                &self.path,
                format!("'{field}' is not an array"),
            )),
        }
    }

    /// The array stored under `field`, created empty when absent.
    pub fn array_mut(&mut self, field: &str) -> Result<&mut Vec<Value>> {
        let value = self
            .root
            .entry(field)
            .or_insert_with(|| Value::Array(Vec::new()));
        match value {
            Value::Array(items) => Ok(items),
            _ => Err(Error::malformed(
                &self.path,
                format!("'{field}' is not an array"),
            )),
        }
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.root)?)
    }
}
