use super::client::ApiClient;
use super::transport::ApiRequest;
use super::types::{AuthStatus, LoginResponse, SystemVersion};
use crate::error::Result;
use serde_json::json;

pub async fn version(client: &ApiClient) -> Result<SystemVersion> {
    client.json(ApiRequest::get("system/version")).await
}

pub async fn auth_status(client: &ApiClient) -> Result<AuthStatus> {
    client.json(ApiRequest::get("system/auth-status")).await
}

pub async fn login(client: &ApiClient, password: &str) -> Result<LoginResponse> {
    client
        .json(ApiRequest::post("system/login").json(json!({ "password": password })))
        .await
}
