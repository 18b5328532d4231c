use super::client::ApiClient;
use super::transport::ApiRequest;
use super::types::{MessageResponse, ScanResponse, ScanStatus};
use crate::error::Result;

/// Start a library scan. A full scan re-parses files that look unchanged.
pub async fn trigger_scan(client: &ApiClient, full: bool) -> Result<ScanResponse> {
    let mut request = ApiRequest::post("scan");
    if full {
        request = request.query("full_scan", true);
    }
    client.json(request).await
}

pub async fn scan_status(client: &ApiClient) -> Result<ScanStatus> {
    client.json(ApiRequest::get("scan/status")).await
}

pub async fn stop_scan(client: &ApiClient) -> Result<MessageResponse> {
    client.json(ApiRequest::post("scan/stop")).await
}
