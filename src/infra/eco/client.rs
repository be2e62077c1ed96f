use reqwest::Url;
use serde::Deserialize;
use tracing::info;

use crate::error::{EcoError, Result};
use crate::fetch::{HttpClient, get_json, post_json};
use crate::mission::Mission;
use crate::stats::Summary;

#[derive(Deserialize)]
struct LastIdResponse {
    id: i32,
}

/// Client of the mission server's `/api` endpoints.
pub struct EcoClient<C> {
    http: C,
    base_url: Url,
}

impl<C: HttpClient> EcoClient<C> {
    /// `addr` is `host:port`, `:port` for localhost, or a full `http(s)://` URL.
    pub fn new(http: C, addr: &str) -> Result<Self> {
        Ok(Self {
            http,
            base_url: base_url(addr)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| EcoError::Configuration {
                message: format!("invalid endpoint {path}: {e}"),
            })
    }

    /// Highest mission id known to the server.
    #[tracing::instrument(skip(self), fields(server = %self.base_url))]
    pub async fn last_id(&self) -> Result<i32> {
        let resp: LastIdResponse = get_json(&self.http, self.endpoint("api/last-id")?).await?;
        Ok(resp.id)
    }

    /// Uploads a batch of missions; the server stores all of them or none.
    #[tracing::instrument(skip(self, missions), fields(server = %self.base_url, missions = missions.len()))]
    pub async fn update_db(&self, missions: &[Mission]) -> Result<()> {
        post_json(&self.http, self.endpoint("api/update-db")?, missions).await?;
        info!(missions = missions.len(), "Uploaded missions");
        Ok(())
    }

    pub async fn stats(&self) -> Result<Summary> {
        get_json(&self.http, self.endpoint("api/stats")?).await
    }
}

/// Normalizes a server address into a base URL.
pub fn base_url(addr: &str) -> Result<Url> {
    let addr = if addr.starts_with(':') {
        format!("localhost{addr}")
    } else {
        addr.to_string()
    };
    let addr = if addr.starts_with("http://") || addr.starts_with("https://") {
        addr
    } else {
        format!("http://{addr}")
    };
    let addr = if addr.ends_with('/') {
        addr
    } else {
        format!("{addr}/")
    };

    Url::parse(&addr).map_err(|e| EcoError::Configuration {
        message: format!("invalid server address {addr:?}: {e}"),
    })
}
