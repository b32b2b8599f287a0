//! Inventory operations behind the chat commands.
//!
//! Each operation returns reply text. Not-found and lost-race outcomes are
//! ordinary replies; only store failures surface as [`InventoryError`].

use std::sync::Arc;

use tracing::{debug, info};

use super::render;
use super::{normalize_id, StoreError, Tool, ToolStatus, ToolStore};

/// Errors the boundary layer must turn into an apology reply.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// The store could not serve the request.
    #[error("tool store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
}

/// Outcome of a rent attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RentOutcome {
    /// Status moved from available to in use.
    Rented(Tool),
    /// Someone else holds the tool.
    AlreadyInUse(Tool),
    /// No record for the requested name.
    NotFound,
}

/// Outcome of a return attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnOutcome {
    /// Status moved from in use to available.
    Returned(Tool),
    /// The tool was not rented.
    NotRented(Tool),
    /// No record for the requested name.
    NotFound,
}

/// Reads and mutates tool records on behalf of the command router.
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn ToolStore>,
}

impl InventoryService {
    /// Create a service backed by the given store.
    pub fn new(store: Arc<dyn ToolStore>) -> Self {
        Self { store }
    }

    /// Render every tool with status and pricing.
    pub async fn list_tools(&self) -> Result<String, InventoryError> {
        let tools = self.store.list_all().await.map_err(unavailable)?;
        debug!(count = tools.len(), "listing tools");
        Ok(render::render_catalog(&tools))
    }

    /// Render status and pricing for one tool.
    pub async fn get_status(&self, name: &str) -> Result<String, InventoryError> {
        Ok(match self.lookup(name).await? {
            Some(tool) => render::render_tool(&tool),
            None => render::not_found(name),
        })
    }

    /// Rent a tool and render the outcome.
    pub async fn rent_tool(&self, name: &str) -> Result<String, InventoryError> {
        Ok(match self.rent(name).await? {
            RentOutcome::Rented(tool) => render::rented(&tool),
            RentOutcome::AlreadyInUse(tool) => render::already_in_use(&tool),
            RentOutcome::NotFound => render::not_found(name),
        })
    }

    /// Return a tool and render the outcome.
    pub async fn return_tool(&self, name: &str) -> Result<String, InventoryError> {
        Ok(match self.give_back(name).await? {
            ReturnOutcome::Returned(tool) => render::returned(&tool),
            ReturnOutcome::NotRented(tool) => render::not_rented(&tool),
            ReturnOutcome::NotFound => render::not_found(name),
        })
    }

    /// Move a tool from available to in use.
    ///
    /// The status flip is a single conditional update; a concurrent renter
    /// that loses the race gets [`RentOutcome::AlreadyInUse`].
    pub async fn rent(&self, name: &str) -> Result<RentOutcome, InventoryError> {
        let Some(tool) = self.lookup(name).await? else {
            return Ok(RentOutcome::NotFound);
        };
        if tool.status == ToolStatus::InUse {
            return Ok(RentOutcome::AlreadyInUse(tool));
        }

        match self
            .store
            .conditional_update(&tool.id, ToolStatus::Available, ToolStatus::InUse)
            .await
        {
            Ok(()) => {
                info!(id = %tool.id, "tool rented");
                Ok(RentOutcome::Rented(Tool {
                    status: ToolStatus::InUse,
                    ..tool
                }))
            }
            Err(StoreError::PreconditionFailed { .. }) => {
                debug!(id = %tool.id, "rent lost race");
                Ok(RentOutcome::AlreadyInUse(Tool {
                    status: ToolStatus::InUse,
                    ..tool
                }))
            }
            Err(StoreError::NotFound(_)) => Ok(RentOutcome::NotFound),
            Err(e) => Err(unavailable(e)),
        }
    }

    /// Move a tool from in use back to available.
    pub async fn give_back(&self, name: &str) -> Result<ReturnOutcome, InventoryError> {
        let Some(tool) = self.lookup(name).await? else {
            return Ok(ReturnOutcome::NotFound);
        };
        if tool.status == ToolStatus::Available {
            return Ok(ReturnOutcome::NotRented(tool));
        }

        match self
            .store
            .conditional_update(&tool.id, ToolStatus::InUse, ToolStatus::Available)
            .await
        {
            Ok(()) => {
                info!(id = %tool.id, "tool returned");
                Ok(ReturnOutcome::Returned(Tool {
                    status: ToolStatus::Available,
                    ..tool
                }))
            }
            Err(StoreError::PreconditionFailed { .. }) => {
                debug!(id = %tool.id, "return lost race");
                Ok(ReturnOutcome::NotRented(Tool {
                    status: ToolStatus::Available,
                    ..tool
                }))
            }
            Err(StoreError::NotFound(_)) => Ok(ReturnOutcome::NotFound),
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn lookup(&self, name: &str) -> Result<Option<Tool>, InventoryError> {
        let id = normalize_id(name);
        if id.is_empty() {
            return Ok(None);
        }
        self.store.get_by_id(&id).await.map_err(unavailable)
    }
}

fn unavailable(err: StoreError) -> InventoryError {
    InventoryError::StoreUnavailable(err)
}
