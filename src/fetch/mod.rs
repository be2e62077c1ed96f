mod basic;
mod client;
mod header;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use header::WithHeader;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{EcoError, Result};

/// Sends `req` and returns the response body, failing on non-2xx statuses.
pub async fn fetch_bytes<C: HttpClient>(client: &C, req: Request) -> Result<bytes::Bytes> {
    let url = req.url().to_string();
    let resp = client.execute(req).await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(EcoError::HttpStatus {
            url,
            status: status.as_u16(),
            body,
        });
    }

    Ok(resp.bytes().await?)
}

/// GETs `url` and decodes its JSON body.
pub async fn get_json<C: HttpClient, T: DeserializeOwned>(client: &C, url: Url) -> Result<T> {
    let bytes = fetch_bytes(client, Request::new(Method::GET, url)).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// POSTs `value` as JSON to `url` and returns the raw response body.
pub async fn post_json<C: HttpClient, T: Serialize + ?Sized>(
    client: &C,
    url: Url,
    value: &T,
) -> Result<bytes::Bytes> {
    let body = serde_json::to_vec(value)?;

    let mut req = Request::new(Method::POST, url);
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(body.into());

    fetch_bytes(client, req).await
}
