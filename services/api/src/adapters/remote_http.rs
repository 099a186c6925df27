//! services/api/src/adapters/remote_http.rs
//!
//! Fetches the remote household view over HTTP and implements the
//! `RemoteHouseSource` port. The response shape is normalized by the core, so
//! this adapter only deals with transport and status codes.

use std::time::Duration;

use async_trait::async_trait;
use hearth_core::ports::{PortError, PortResult, RemoteHouseSource};
use hearth_core::{houses_from_payload, RemoteHouse};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::debug;

/// A `reqwest` client bound to one remote endpoint.
#[derive(Clone)]
pub struct HttpRemoteHouses {
    client: reqwest::Client,
    url: Url,
}

impl HttpRemoteHouses {
    pub fn new(url: Url) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl RemoteHouseSource for HttpRemoteHouses {
    async fn fetch_houses(&self, room_key: &str) -> PortResult<Vec<RemoteHouse>> {
        let response = self
            .client
            .get(self.url.clone())
            .query(&[("room", room_key)])
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("remote houses request failed: {e}")))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(PortError::Unauthorized),
            StatusCode::NOT_FOUND => return Err(PortError::NotFound(self.url.to_string())),
            status if !status.is_success() => {
                return Err(PortError::Unexpected(format!(
                    "remote houses endpoint answered {status}"
                )))
            }
            _ => {}
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("remote houses body unreadable: {e}")))?;
        let houses = houses_from_payload(payload);
        debug!(count = houses.len(), "fetched remote houses");
        Ok(houses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn serve(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/houses")).unwrap()
    }

    #[tokio::test]
    async fn fetches_and_unwraps_the_houses_envelope() {
        let app = Router::new().route(
            "/houses",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let room = params.get("room").cloned().unwrap_or_default();
                Json(json!({ "houses": [{ "id": room, "inviteCode": "abcd2345", "members": [] }] }))
            }),
        );
        let source = HttpRemoteHouses::new(serve(app).await).unwrap();

        let houses = source.fetch_houses("room-1").await.unwrap();
        assert_eq!(houses.len(), 1);
        assert_eq!(houses[0].house_id().as_deref(), Some("room-1"));
        assert_eq!(houses[0].invite_code().as_deref(), Some("ABCD2345"));
    }

    #[tokio::test]
    async fn rejected_room_keys_are_unauthorized() {
        let app = Router::new().route("/houses", get(|| async { AxumStatus::FORBIDDEN }));
        let source = HttpRemoteHouses::new(serve(app).await).unwrap();
        let err = source.fetch_houses("nope").await.unwrap_err();
        assert!(matches!(err, PortError::Unauthorized));
    }
}
