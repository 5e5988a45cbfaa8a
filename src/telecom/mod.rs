use crate::models::CarrierRecord;
use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Synchronous carrier-of-record lookup. A miss is a valid scoring input
/// (maximum ownership risk), not an error.
pub trait CarrierDirectory: Send + Sync {
    fn lookup(&self, mobile: &str) -> Option<CarrierRecord>;
}

/// Directory backed by a JSON file of mock carrier records, keyed by mobile
/// number. The file format is opaque to the risk engine.
pub struct MockCarrierDirectory {
    records: HashMap<String, CarrierRecord>,
}

impl MockCarrierDirectory {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open carrier data file {}", path.display()))?;
        let reader = BufReader::new(file);
        let records: HashMap<String, CarrierRecord> =
            serde_json::from_reader(reader).context("Malformed carrier data file")?;

        info!("Loaded {} carrier records", records.len());
        Ok(MockCarrierDirectory { records })
    }

    /// Load the directory, falling back to an empty one when the data file
    /// is absent. Every lookup then scores as "record not found".
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(
                "Carrier data file {} not found; all lookups will miss",
                path.display()
            );
            Ok(MockCarrierDirectory {
                records: HashMap::new(),
            })
        }
    }

    pub fn from_records(records: HashMap<String, CarrierRecord>) -> Self {
        MockCarrierDirectory { records }
    }
}

impl CarrierDirectory for MockCarrierDirectory {
    fn lookup(&self, mobile: &str) -> Option<CarrierRecord> {
        self.records.get(mobile).cloned()
    }
}
