/// Public library interface for the Zenith Tracker MCP server
///
/// This module exports the server, the domain model and the tools so other
/// applications and tests can drive the tracker without going through
/// JSON-RPC.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

pub mod analytics;
pub mod domain;
pub mod mcp;
pub mod storage;
pub mod timer;
pub mod tools;

pub use domain::*;
pub use storage::{SharedSlotStore, SqliteStorage, StorageError, TrackerStorage};
pub use timer::{Clock, ManualClock, SystemClock, TimerAccumulator, TimerRecord};
pub use tools::ToolError;

/// Errors that can occur during server operation
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] storage::StorageError),

    #[error("Domain validation error: {0}")]
    Domain(#[from] domain::DomainError),

    #[error("Tool error: {0}")]
    Tool(#[from] tools::ToolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tracker server state shared by every tool call
///
/// Timers keep their own connection to the database so their shared slot
/// behaves the same whether another process or this one wrote it.
pub struct TrackerServer {
    storage: SqliteStorage,
    timers: TimerAccumulator<SqliteStorage>,
    clock: Arc<dyn Clock>,
}

impl TrackerServer {
    /// Open (and migrate) the database at `db_path` using the system clock
    pub async fn new(db_path: PathBuf) -> Result<Self, ServerError> {
        Self::with_clock(db_path, Arc::new(SystemClock))
    }

    pub fn with_clock(db_path: PathBuf, clock: Arc<dyn Clock>) -> Result<Self, ServerError> {
        tracing::info!("Initializing tracker server with database: {:?}", db_path);

        let storage = SqliteStorage::new(db_path.clone())?;
        let timers = TimerAccumulator::new(SqliteStorage::new(db_path)?, clock.clone());

        Ok(Self { storage, timers, clock })
    }

    /// Throwaway server backed by in-memory databases
    pub fn in_memory(clock: Arc<dyn Clock>) -> Result<Self, ServerError> {
        let storage = SqliteStorage::open_in_memory()?;
        let timers = TimerAccumulator::new(SqliteStorage::open_in_memory()?, clock.clone());
        Ok(Self { storage, timers, clock })
    }

    /// Run the MCP server over stdin/stdout until stdin closes
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Starting MCP server...");

        let habits = self.storage.list_habits(None)?;
        let running = self.timers.running()?;
        tracing::info!(
            "Server started successfully, found {} habits and {} running timers",
            habits.len(),
            running.len()
        );

        let mut mcp_server = mcp::McpServer::new(self);
        mcp_server.run().await?;

        Ok(())
    }

    /// Periodic housekeeping: save finished countdowns and pick up
    /// timer changes from other processes
    pub fn tick(&self) -> Result<Vec<tools::FinishedTimer>, ServerError> {
        let finished = tools::finalize_expired_timers(&self.storage, &self.timers, self.today())?;
        self.timers.poll_external()?;
        Ok(finished)
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn timers(&self) -> &TimerAccumulator<SqliteStorage> {
        &self.timers
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}
