use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::DatabaseError;

/// Thin PostgREST client. Every request carries the configured storage
/// timeout; an elapsed timeout surfaces as [`DatabaseError::Timeout`].
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Result<Self, DatabaseError> {
        let client = Client::builder()
            .timeout(config.storage_timeout())
            .build()
            .map_err(|e| DatabaseError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            service_key: config.supabase_service_key.clone(),
        })
    }

    fn get_headers(&self) -> Result<HeaderMap, DatabaseError> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&self.service_key)
            .map_err(|_| DatabaseError::Configuration("service key is not a valid header value".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.service_key))
            .map_err(|_| DatabaseError::Configuration("service key is not a valid header value".to_string()))?;

        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => DatabaseError::Auth(error_text),
                404 => DatabaseError::NotFound(error_text),
                code => DatabaseError::Api { status: code, message: error_text },
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Invoke a Postgres function exposed through `/rest/v1/rpc`.
    pub async fn rpc<T>(&self, function: &str, args: Value) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/rpc/{}", function);
        self.request(Method::POST, &path, Some(args)).await
    }

    /// Headers for an insert that replaces the row on primary-key collision.
    pub fn upsert_representation() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );
        headers
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
