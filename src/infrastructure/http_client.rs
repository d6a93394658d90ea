// HTTP implementation of the battery data client
use crate::application::data_client::BatteryDataClient;
use crate::application::errors::ApiError;
use crate::domain::battery::{BatterySummary, CycleSnapshot, CycleSummary, DeviceId};
use crate::infrastructure::envelope::{decode_cycle_list, decode_snapshot, decode_summary};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use std::time::Duration;

const SNAPSHOTS_PATH: &str = "/api/snapshots";

#[derive(Debug, Clone)]
pub struct HttpBatteryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBatteryClient {
    /// `timeout` bounds every request; there are no retries on top of it.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn snapshots_url(&self, suffix: &str) -> String {
        format!("{}{}{}", self.base_url, SNAPSHOTS_PATH, suffix)
    }

    fn device_url(&self, imei: &DeviceId, suffix: &str) -> String {
        self.snapshots_url(&format!("/{}{}", urlencoding::encode(imei.as_str()), suffix))
    }

    async fn get_body(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<u8>, ApiError> {
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::NOT_FOUND {
                tracing::warn!("GET {} returned 404: {}", url, body);
            } else {
                tracing::error!("GET {} failed with status {}: {}", url, status, body);
            }
            return Err(ApiError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        Ok(body.to_vec())
    }
}

/// Turn a 404 into the dedicated not-found error.
fn not_found_as(imei: &DeviceId, cycle: Option<u32>, error: ApiError) -> ApiError {
    match error {
        ApiError::Server { status: 404, .. } => ApiError::NotFound {
            imei: imei.clone(),
            cycle,
        },
        other => other,
    }
}

#[async_trait]
impl BatteryDataClient for HttpBatteryClient {
    async fn fetch_summary(&self, imei: Option<&DeviceId>) -> Result<Vec<BatterySummary>, ApiError> {
        let query: Vec<(&str, String)> = imei
            .map(|imei| ("imei", imei.to_string()))
            .into_iter()
            .collect();
        let body = self.get_body(&self.snapshots_url("/summary"), &query).await?;
        Ok(decode_summary(&body))
    }

    async fn fetch_cycle_list(
        &self,
        imei: &DeviceId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<CycleSummary>, ApiError> {
        let query = [
            ("imei", imei.to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        let body = self.get_body(&self.snapshots_url(""), &query).await?;
        Ok(decode_cycle_list(&body))
    }

    async fn fetch_latest_cycle(&self, imei: &DeviceId) -> Result<CycleSnapshot, ApiError> {
        let body = self
            .get_body(&self.device_url(imei, "/latest"), &[])
            .await
            .map_err(|e| not_found_as(imei, None, e))?;
        Ok(decode_snapshot(&body)?)
    }

    async fn fetch_cycle_detail(
        &self,
        imei: &DeviceId,
        cycle_number: u32,
    ) -> Result<CycleSnapshot, ApiError> {
        let url = self.device_url(imei, &format!("/cycles/{}", cycle_number));
        let body = self
            .get_body(&url, &[])
            .await
            .map_err(|e| not_found_as(imei, Some(cycle_number), e))?;
        Ok(decode_snapshot(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::battery::fixtures::snapshot;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode as AxumStatus;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    const IMEI: &str = "865044073967657";

    async fn cycles(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
        // Echo the paging parameters back through the cycle numbers.
        let limit: u32 = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(0);
        let offset: u32 = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
        let imei = params.get("imei").cloned().unwrap_or_default();
        Json(json!({
            "success": true,
            "data": [
                { "imei": imei, "cycle_number": limit },
                { "imei": imei, "cycle_number": offset + 1 }
            ],
            "count": 2
        }))
    }

    async fn detail(Path((imei, cycle)): Path<(String, u32)>) -> impl IntoResponse {
        match cycle {
            404 => (AxumStatus::NOT_FOUND, "no such cycle").into_response(),
            500 => (AxumStatus::INTERNAL_SERVER_ERROR, "database down").into_response(),
            7 => Json(json!({ "data": snapshot(&imei, 7) })).into_response(),
            _ => "<html>not json</html>".into_response(),
        }
    }

    async fn serve() -> HttpBatteryClient {
        let app = Router::new()
            .route("/api/snapshots", get(cycles))
            .route(
                "/api/snapshots/summary",
                get(|| async { Json(json!({ "batteries": [{ "imei": IMEI, "total_cycles": 3 }] })) }),
            )
            .route(
                "/api/snapshots/:imei/latest",
                get(|Path(imei): Path<String>| async move { Json(snapshot(&imei, 9)) }),
            )
            .route("/api/snapshots/:imei/cycles/:cycle", get(detail));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        HttpBatteryClient::new(&format!("http://{}/", addr), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_cycle_list_sends_paging() {
        let client = serve().await;
        let cycles = client
            .fetch_cycle_list(&DeviceId::new(IMEI), 1000, 20)
            .await
            .unwrap();

        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].cycle_number, 1000);
        assert_eq!(cycles[1].cycle_number, 21);
        assert_eq!(cycles[0].imei, DeviceId::new(IMEI));
    }

    #[tokio::test]
    async fn test_fetch_summary_normalizes_envelope() {
        let client = serve().await;
        let summary = client.fetch_summary(None).await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].total_cycles, 3);
    }

    #[tokio::test]
    async fn test_fetch_detail_and_latest() {
        let client = serve().await;
        let imei = DeviceId::new(IMEI);

        let detail = client.fetch_cycle_detail(&imei, 7).await.unwrap();
        assert_eq!(detail, snapshot(IMEI, 7));

        let latest = client.fetch_latest_cycle(&imei).await.unwrap();
        assert_eq!(latest.cycle_number, 9);
    }

    #[tokio::test]
    async fn test_fetch_detail_error_taxonomy() {
        let client = serve().await;
        let imei = DeviceId::new(IMEI);

        let not_found = client.fetch_cycle_detail(&imei, 404).await.unwrap_err();
        assert!(not_found.is_not_found());

        match client.fetch_cycle_detail(&imei, 500).await.unwrap_err() {
            ApiError::Server { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "database down");
            }
            other => panic!("expected server error, got {:?}", other),
        }

        assert!(matches!(
            client.fetch_cycle_detail(&imei, 3).await.unwrap_err(),
            ApiError::Decode(_)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            HttpBatteryClient::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
        let err = client.fetch_summary(None).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }));
    }
}
