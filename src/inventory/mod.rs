//! Tool inventory: records, the store seam, reply rendering, and the rental service.
//!
//! Every lookup goes through [`normalize_id`] so "UnLock-Tool", "unlock tool"
//! and "unlocktool" all land on the same record. Status changes go through
//! [`ToolStore::conditional_update`], which is a single compare-and-set at the
//! storage layer.

pub mod catalog;
pub mod render;
pub mod service;
pub mod store;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// Rental availability of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Free to rent.
    Available,
    /// Currently rented out.
    InUse,
}

impl ToolStatus {
    /// Returns the string representation stored in SQLite.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InUse => "in_use",
        }
    }

    /// Parse from a SQLite text value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a recognised status.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "available" => Ok(Self::Available),
            "in_use" => Ok(Self::InUse),
            other => Err(StoreError::InvalidRecord {
                field: "status",
                value: other.to_owned(),
            }),
        }
    }

    /// Human-facing label used in replies.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::InUse => "In Use",
        }
    }

    /// Status glyph shown next to the tool name.
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Available => "✅",
            Self::InUse => "❌",
        }
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One price tier: renting for `hours` costs `price`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateTier {
    /// Rental duration in hours.
    pub hours: f64,
    /// Price for that duration.
    pub price: f64,
}

/// How a tool is priced. Catalogs use either form.
#[derive(Debug, Clone, PartialEq)]
pub enum Pricing {
    /// A single price for a fixed duration.
    Flat {
        /// Price for one rental.
        price: f64,
        /// Rental length in minutes, if the catalog records one.
        duration_minutes: Option<u32>,
    },
    /// Duration tiers, sorted by ascending hours.
    Tiered(Vec<RateTier>),
    /// No pricing data recorded.
    Unpriced,
}

impl Pricing {
    /// Build tiered pricing, sorting tiers by ascending duration.
    ///
    /// An empty tier list yields [`Pricing::Unpriced`].
    pub fn tiered(tiers: impl IntoIterator<Item = RateTier>) -> Self {
        let mut tiers: Vec<RateTier> = tiers.into_iter().collect();
        if tiers.is_empty() {
            return Self::Unpriced;
        }
        tiers.sort_by(|a, b| a.hours.total_cmp(&b.hours));
        Self::Tiered(tiers)
    }
}

/// A rentable tool record.
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    /// Lookup key, always `normalize_id(name)`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Current availability.
    pub status: ToolStatus,
    /// Pricing data.
    pub pricing: Pricing,
}

impl Tool {
    /// Create a record whose id is derived from `name`.
    pub fn new(name: impl Into<String>, status: ToolStatus, pricing: Pricing) -> Self {
        let name = name.into();
        Self {
            id: normalize_id(&name),
            name,
            status,
            pricing,
        }
    }
}

/// Normalize a tool name into its lookup id.
///
/// Lowercases ASCII letters and drops every character outside `[A-Za-z0-9]`.
pub fn normalize_id(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from tool store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists for the id.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// The record's status did not match the expected value.
    #[error("precondition failed for {id}: status is not {expected}")]
    PreconditionFailed {
        /// Tool id.
        id: String,
        /// Status the update required.
        expected: ToolStatus,
    },

    /// The backing store could not be reached or the query failed.
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    /// A stored record could not be decoded.
    #[error("invalid {field} value: {value:?}")]
    InvalidRecord {
        /// Which field contained the bad value.
        field: &'static str,
        /// The unexpected value.
        value: String,
    },
}

// ---------------------------------------------------------------------------
// Store seam
// ---------------------------------------------------------------------------

/// Document store holding tool records.
#[async_trait]
pub trait ToolStore: Send + Sync {
    /// Fetch every tool record.
    async fn list_all(&self) -> Result<Vec<Tool>, StoreError>;

    /// Fetch one record by normalized id.
    async fn get_by_id(&self, id: &str) -> Result<Option<Tool>, StoreError>;

    /// Set `status` to `new` only if it currently equals `expected`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the id has no record,
    /// [`StoreError::PreconditionFailed`] if the status did not match.
    async fn conditional_update(
        &self,
        id: &str,
        expected: ToolStatus,
        new: ToolStatus,
    ) -> Result<(), StoreError>;
}
