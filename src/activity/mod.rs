//! Best-effort audit trail.
//!
//! Handlers hand an [`ActivityRecord`] to [`ActivityLog::record`], which only
//! enqueues it. A single background task drains the queue into
//! `activity_logs`. A full queue or a failed insert is logged and dropped; the
//! originating request never sees it.

pub mod repo;

use serde_json::Value;
use sqlx::SqlitePool;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};
use tracing::{debug, error, warn};

use crate::extract::ClientInfo;

pub const QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub user_id: Option<i64>,
    pub action: &'static str,
    pub resource_type: Option<&'static str>,
    pub resource_id: Option<i64>,
    pub details: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ActivityRecord {
    pub fn new(user_id: i64, action: &'static str) -> Self {
        Self {
            user_id: Some(user_id),
            action,
            resource_type: None,
            resource_id: None,
            details: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn resource(mut self, kind: &'static str, id: i64) -> Self {
        self.resource_type = Some(kind);
        self.resource_id = Some(id);
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn client(mut self, client: &ClientInfo) -> Self {
        self.ip_address = client.ip.clone();
        self.user_agent = client.user_agent.clone();
        self
    }
}

/// Cloneable handle onto the activity queue.
#[derive(Clone)]
pub struct ActivityLog {
    tx: mpsc::Sender<ActivityRecord>,
}

impl ActivityLog {
    /// Starts the writer task. It stops once every handle has been dropped
    /// and the queue is drained.
    pub fn spawn(db: SqlitePool) -> (Self, JoinHandle<()>) {
        Self::spawn_with_capacity(db, QUEUE_CAPACITY)
    }

    pub fn spawn_with_capacity(db: SqlitePool, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(run(db, rx));
        (Self { tx }, handle)
    }

    pub fn record(&self, record: ActivityRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(r)) => {
                warn!(action = r.action, user_id = ?r.user_id, "activity queue full; record dropped");
            }
            Err(TrySendError::Closed(r)) => {
                warn!(action = r.action, user_id = ?r.user_id, "activity writer stopped; record dropped");
            }
        }
    }
}

async fn run(db: SqlitePool, mut rx: mpsc::Receiver<ActivityRecord>) {
    while let Some(record) = rx.recv().await {
        if let Err(e) = repo::insert(&db, &record).await {
            error!(error = ?e, action = record.action, user_id = ?record.user_id, "failed to log activity");
        }
    }
    debug!("activity writer drained");
}
