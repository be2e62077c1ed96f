use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use super::AppState;
use crate::error::EcoError;
use crate::mission::Mission;
use crate::output::summary_html;
use crate::stats::{StatsBucket, Summary};
use crate::transport::TransportMode;

/// Store failures, answered as 500 with the error text.
pub struct ApiError(EcoError);

impl From<EcoError> for ApiError {
    fn from(e: EcoError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

#[derive(Serialize)]
pub struct LastId {
    pub id: i32,
}

pub async fn last_id(State(state): State<Arc<AppState>>) -> Json<LastId> {
    let store = state.store.read().await;
    Json(LastId {
        id: store.last_id(),
    })
}

pub async fn update_db(
    State(state): State<Arc<AppState>>,
    Json(missions): Json<Vec<Mission>>,
) -> Result<StatusCode, ApiError> {
    if missions.is_empty() {
        return Ok(StatusCode::OK);
    }

    let mut store = state.store.clone().write_owned().await;
    let (n, last_id) = blocking(move || {
        let n = store.store_batch(&missions)?;
        Ok((n, store.last_id()))
    })
    .await?;
    info!(missions = n, last_id, "Store updated");
    Ok(StatusCode::OK)
}

/// Runs synchronous store work off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EcoError::Invariant(format!("store task failed: {e}")))?
        .map_err(ApiError)
}

#[derive(Serialize)]
struct BucketView<'a> {
    #[serde(flatten)]
    bucket: &'a StatsBucket,
    /// Derived CO2 cost per mode, in kilograms.
    co2: BTreeMap<TransportMode, f64>,
}

impl<'a> From<&'a StatsBucket> for BucketView<'a> {
    fn from(bucket: &'a StatsBucket) -> Self {
        Self {
            bucket,
            co2: bucket.co2(),
        }
    }
}

#[derive(Serialize)]
struct SummaryView<'a> {
    start: Option<NaiveDate>,
    stop: Option<NaiveDate>,
    cities: &'a BTreeMap<String, usize>,
    countries: &'a BTreeMap<String, usize>,
    executed: BucketView<'a>,
    planned: BucketView<'a>,
    all: BucketView<'a>,
}

impl<'a> From<&'a Summary> for SummaryView<'a> {
    fn from(s: &'a Summary) -> Self {
        Self {
            start: s.start,
            stop: s.stop,
            cities: &s.cities,
            countries: &s.countries,
            executed: BucketView::from(&s.executed),
            planned: BucketView::from(&s.planned),
            all: BucketView::from(&s.all),
        }
    }
}

async fn current_summary(state: &AppState) -> Result<Summary, ApiError> {
    let store = state.store.clone().read_owned().await;
    blocking(move || store.summary(Utc::now())).await
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let summary = current_summary(&state).await?;
    Ok(Json(SummaryView::from(&summary)).into_response())
}

pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let summary = current_summary(&state).await?;
    Ok(Html(summary_html(&summary)))
}
