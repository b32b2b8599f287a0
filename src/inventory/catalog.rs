//! Administrative tool catalog in TOML.
//!
//! Records are created and priced out-of-band; `toolrent seed` loads a file
//! like this into the store:
//!
//! ```toml
//! [[tools]]
//! name = "UnlockTool"
//! price = 20
//! duration_minutes = 30
//!
//! [[tools]]
//! name = "Drill"
//! [tools.rates]
//! "1" = 10
//! "2" = 18
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::store::SqliteToolStore;
use super::{normalize_id, Pricing, RateTier, StoreError, Tool, ToolStatus};

/// Errors from catalog parsing.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The file could not be read.
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid catalog TOML.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    /// A name normalizes to an empty id.
    #[error("tool name {0:?} has no letters or digits")]
    InvalidName(String),

    /// Two entries normalize to the same id.
    #[error("duplicate tool id {id:?} (from {name:?})")]
    Duplicate {
        /// Normalized id.
        id: String,
        /// Display name of the second entry.
        name: String,
    },

    /// A rate key is not a positive number of hours.
    #[error("tool {tool:?} has invalid rate duration {key:?}")]
    InvalidRate {
        /// Display name of the tool.
        tool: String,
        /// Offending rate key.
        key: String,
    },
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tools: Vec<CatalogEntry>,
}

/// One tool as written in the catalog file.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    /// Display name.
    pub name: String,
    /// Initial status, applied only when the record is new or `--reset-status` is given.
    pub status: Option<ToolStatus>,
    /// Flat price.
    pub price: Option<f64>,
    /// Flat rental duration in minutes.
    pub duration_minutes: Option<u32>,
    /// Hours → price tiers.
    #[serde(default)]
    pub rates: BTreeMap<String, f64>,
}

impl CatalogEntry {
    fn into_tool(self) -> Result<Tool, CatalogError> {
        if normalize_id(&self.name).is_empty() {
            return Err(CatalogError::InvalidName(self.name));
        }

        let pricing = if !self.rates.is_empty() {
            let mut tiers = Vec::with_capacity(self.rates.len());
            for (key, price) in &self.rates {
                match key.trim().parse::<f64>() {
                    Ok(hours) if hours.is_finite() && hours > 0.0 => {
                        tiers.push(RateTier {
                            hours,
                            price: *price,
                        });
                    }
                    _ => {
                        return Err(CatalogError::InvalidRate {
                            tool: self.name,
                            key: key.clone(),
                        })
                    }
                }
            }
            Pricing::tiered(tiers)
        } else if let Some(price) = self.price {
            Pricing::Flat {
                price,
                duration_minutes: self.duration_minutes,
            }
        } else {
            Pricing::Unpriced
        };

        Ok(Tool::new(
            self.name,
            self.status.unwrap_or(ToolStatus::Available),
            pricing,
        ))
    }
}

/// Parse catalog TOML into tool records.
pub fn parse_catalog(toml_str: &str) -> Result<Vec<Tool>, CatalogError> {
    let file: CatalogFile = toml::from_str(toml_str)?;

    let mut seen = HashSet::new();
    let mut tools = Vec::with_capacity(file.tools.len());
    for entry in file.tools {
        let tool = entry.into_tool()?;
        if !seen.insert(tool.id.clone()) {
            return Err(CatalogError::Duplicate {
                id: tool.id,
                name: tool.name,
            });
        }
        tools.push(tool);
    }
    Ok(tools)
}

/// Read and parse a catalog file.
pub fn load_catalog(path: &Path) -> Result<Vec<Tool>, CatalogError> {
    let contents = std::fs::read_to_string(path)?;
    parse_catalog(&contents)
}

/// Upsert every catalog record into the store. Returns the number written.
pub async fn seed(
    store: &SqliteToolStore,
    tools: &[Tool],
    overwrite_status: bool,
) -> Result<usize, StoreError> {
    for tool in tools {
        store.upsert(tool, overwrite_status).await?;
    }
    info!(count = tools.len(), overwrite_status, "catalog seeded");
    Ok(tools.len())
}
