use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::{IdentifierStore, LookupError};

/// Identifier store backed by a JSON object of `filename -> identifier`.
///
/// Values may be strings or numbers; numbers are rendered as decimal text.
#[derive(Debug, Default, Clone)]
pub struct JsonIdentifierStore {
    entries: HashMap<String, String>,
}

impl JsonIdentifierStore {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let mapping_error = |message: String| LookupError::Mapping {
            path: path.to_path_buf(),
            message,
        };

        let file = File::open(path).map_err(|e| mapping_error(e.to_string()))?;
        let raw: HashMap<String, Value> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| mapping_error(e.to_string()))?;

        let mut entries = HashMap::with_capacity(raw.len());
        for (filename, value) in raw {
            let identifier = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(mapping_error(format!(
                        "Unsupported value for {}: {}",
                        filename, other
                    )))
                }
            };
            entries.insert(filename, identifier);
        }

        info!("Loaded {} identifier mappings from {:?}", entries.len(), path);
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl IdentifierStore for JsonIdentifierStore {
    async fn lookup(&self, filename: &str) -> Result<Option<String>, LookupError> {
        let found = self.entries.get(filename).cloned();
        debug!(filename, found = found.is_some(), "Mapping lookup");
        Ok(found)
    }
}
