//! HTTP front of the mission store.
//!
//! Reads share the store lock; `update-db` takes it exclusively for the
//! duration of its transaction. Store calls run on the blocking pool.

mod handlers;

use axum::{
    Router,
    routing::{get, post},
};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::Result;
use crate::store::{MissionStore, SqliteKv};

pub struct AppState {
    pub store: Arc<RwLock<MissionStore<SqliteKv>>>,
}

impl AppState {
    pub fn new(store: MissionStore<SqliteKv>) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    pub fn open(db: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(MissionStore::open_path(db)?))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/last-id", get(handlers::last_id))
        .route("/api/update-db", post(handlers::update_db))
        .route("/api/stats", get(handlers::stats))
        .with_state(state)
}

/// Listen address: `:port` binds every interface.
pub fn listen_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

/// Serves the store at `db` on `addr` until the process stops.
pub async fn serve(addr: &str, db: impl AsRef<Path>) -> Result<()> {
    let state = Arc::new(AppState::open(db.as_ref())?);
    let app = router(state);

    let bind_addr = listen_addr(addr);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, db = %db.as_ref().display(), "Mission server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
