//! REST implementation of the workspace client.
//!
//! Calls the Unity Catalog, SQL warehouse and statement execution endpoints
//! directly with a personal access token.

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{
    ApiError, CatalogInfo, ExecuteStatementRequest, ListTablesRequest, NamespaceService,
    ResultData, SchemaInfo, StatementResponse, StatementService, TableInfo, TablesPage,
    WarehouseInfo, WarehouseService,
};

const UNITY_CATALOG: &[&str] = &["api", "2.1", "unity-catalog"];
const SQL: &[&str] = &["api", "2.0", "sql"];

/// Databricks REST client.
#[derive(Debug, Clone)]
pub struct RestClient {
    base_url: Url,
    token: String,
    http_client: Client,
}

/// Error body returned by Databricks on non-success responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RestClient {
    /// Creates a new client with the given workspace URL and access token.
    ///
    /// Example `base_url`: `https://<your-workspace>.cloud.databricks.com`
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            token: token.to_string(),
            http_client,
        })
    }

    /// Builds an endpoint URL from path segments. Segments are percent-encoded.
    fn endpoint(&self, prefix: &[&str], segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(prefix)
            .extend(segments);
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        debug!(%method, path = url.path(), "Databricks API request");

        let mut request = self
            .http_client
            .request(method, url)
            .bearer_auth(&self.token)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    /// Turns a response into `T`, mapping non-success statuses to errors.
    async fn handle_response<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        let status = resp.status();
        let text_body = resp.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if !status.is_success() {
            return Err(Self::parse_error(status, &text_body));
        }

        serde_json::from_str(&text_body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn parse_error(status: StatusCode, body: &str) -> ApiError {
        let message = match serde_json::from_str::<ErrorBody>(body) {
            Ok(ErrorBody {
                error_code: Some(code),
                message: Some(message),
            }) => format!("{code}: {message}"),
            Ok(ErrorBody {
                message: Some(message),
                ..
            }) => message,
            _ => body.to_string(),
        };
        ApiError::Api {
            status: status.as_u16(),
            message,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let resp = self.send::<()>(Method::GET, url, query, None).await?;
        Self::handle_response(resp).await
    }

    /// Follows `next_page_token` until the listing is exhausted, collecting
    /// the array stored under `key` on every page.
    async fn list_all<T: DeserializeOwned>(
        &self,
        url: Url,
        key: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = query.to_vec();
            if let Some(token) = page_token.take() {
                params.push(("page_token", token));
            }

            let mut page: Value = self.get_json(url.clone(), &params).await?;
            if let Some(entries) = page.get_mut(key).map(Value::take) {
                if !entries.is_null() {
                    let entries: Vec<T> = serde_json::from_value(entries)
                        .map_err(|e| ApiError::Decode(e.to_string()))?;
                    items.extend(entries);
                }
            }

            match page.get("next_page_token").and_then(Value::as_str) {
                Some(token) if !token.is_empty() => page_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl NamespaceService for RestClient {
    async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>, ApiError> {
        let url = self.endpoint(UNITY_CATALOG, &["catalogs"])?;
        self.list_all(url, "catalogs", &[]).await
    }

    async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>, ApiError> {
        let url = self.endpoint(UNITY_CATALOG, &["schemas"])?;
        self.list_all(url, "schemas", &[("catalog_name", catalog.to_string())])
            .await
    }

    async fn list_tables(&self, request: &ListTablesRequest) -> Result<TablesPage, ApiError> {
        let url = self.endpoint(UNITY_CATALOG, &["tables"])?;
        let mut query = vec![
            ("catalog_name", request.catalog_name.clone()),
            ("schema_name", request.schema_name.clone()),
            ("omit_columns", request.omit_columns.to_string()),
            ("omit_properties", request.omit_properties.to_string()),
        ];
        if let Some(max_results) = request.max_results {
            query.push(("max_results", max_results.to_string()));
        }
        if let Some(token) = &request.page_token {
            query.push(("page_token", token.clone()));
        }

        self.get_json(url, &query).await
    }

    async fn get_table(&self, full_name: &str) -> Result<TableInfo, ApiError> {
        let url = self.endpoint(UNITY_CATALOG, &["tables", full_name])?;
        self.get_json(url, &[]).await
    }
}

#[async_trait]
impl WarehouseService for RestClient {
    async fn list_warehouses(&self) -> Result<Vec<WarehouseInfo>, ApiError> {
        let url = self.endpoint(SQL, &["warehouses"])?;
        self.list_all(url, "warehouses", &[]).await
    }
}

#[async_trait]
impl StatementService for RestClient {
    async fn execute_statement(
        &self,
        request: &ExecuteStatementRequest,
    ) -> Result<StatementResponse, ApiError> {
        let url = self.endpoint(SQL, &["statements"])?;
        let resp = self.send(Method::POST, url, &[], Some(request)).await?;
        Self::handle_response(resp).await
    }

    async fn get_statement(&self, statement_id: &str) -> Result<StatementResponse, ApiError> {
        let url = self.endpoint(SQL, &["statements", statement_id])?;
        self.get_json(url, &[]).await
    }

    async fn get_result_chunk(
        &self,
        statement_id: &str,
        chunk_index: u32,
    ) -> Result<ResultData, ApiError> {
        let index = chunk_index.to_string();
        let url = self.endpoint(
            SQL,
            &["statements", statement_id, "result", "chunks", &index],
        )?;
        self.get_json(url, &[]).await
    }

    async fn cancel_statement(&self, statement_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(SQL, &["statements", statement_id, "cancel"])?;
        let resp = self.send::<()>(Method::POST, url, &[], None).await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            return Err(Self::parse_error(status, &body));
        }

        // Cancel response is empty. Success means the request was accepted.
        Ok(())
    }
}
