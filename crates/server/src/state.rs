use crate::{config::Config, db::Database};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// A join code preserved across a login redirect. An unauthenticated join
/// attempt parks its normalized code here under a one-time resume token;
/// login/register consume it and finish the join.
#[derive(Debug, Clone)]
pub struct PendingJoinState {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub pending_joins: Arc<DashMap<String, PendingJoinState>>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config,
            pending_joins: Arc::new(DashMap::new()),
        }
    }
}
