use crate::backend::{BackendClient, BackendRequest, DataError, RequestBody};
use http::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Display;

/// Builder for one request against a REST resource (`{base}/rest/v1/{table}`), using the
/// `column=op.value` filter syntax.
#[must_use]
pub struct TableQuery<'a> {
    client: &'a BackendClient,
    table: &'static str,
    params: Vec<(String, String)>,
    order: Vec<String>,
    prefer: Vec<&'static str>,
}

impl<'a> TableQuery<'a> {
    pub(crate) const fn new(client: &'a BackendClient, table: &'static str) -> Self {
        Self {
            client,
            table,
            params: Vec::new(),
            order: Vec::new(),
            prefer: Vec::new(),
        }
    }

    /// Columns to return, including embedded resources like `vaults(id,name)`.
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Can be called repeatedly; earlier calls take precedence.
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{column}.{direction}"));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    /// Conflict target for [`TableQuery::upsert`].
    pub fn on_conflict(mut self, columns: &str) -> Self {
        self.params.push(("on_conflict".to_string(), columns.to_string()));
        self
    }

    /// GET the matching rows.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<T, DataError> {
        let body = self.send(Method::GET, RequestBody::Empty).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn insert<T: DeserializeOwned>(
        mut self,
        row: &impl Serialize,
    ) -> Result<Vec<T>, DataError> {
        self.prefer.push("return=representation");
        let body = self
            .send(Method::POST, RequestBody::Json(serde_json::to_value(row)?))
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Insert, or merge into the row that conflicts on the `on_conflict` columns.
    pub async fn upsert<T: DeserializeOwned>(
        mut self,
        row: &impl Serialize,
    ) -> Result<Vec<T>, DataError> {
        self.prefer.push("resolution=merge-duplicates");
        self.prefer.push("return=representation");
        let body = self
            .send(Method::POST, RequestBody::Json(serde_json::to_value(row)?))
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// PATCH the matching rows. Returns the updated rows.
    pub async fn update<T: DeserializeOwned>(
        mut self,
        changes: &impl Serialize,
    ) -> Result<Vec<T>, DataError> {
        self.prefer.push("return=representation");
        let body = self
            .send(Method::PATCH, RequestBody::Json(serde_json::to_value(changes)?))
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn delete(mut self) -> Result<(), DataError> {
        if !self.params.iter().any(|(key, _)| key != "select") {
            return Err(DataError::Validation(format!(
                "Refusing to delete from '{}' without a filter",
                self.table
            )));
        }
        self.prefer.push("return=minimal");
        self.send(Method::DELETE, RequestBody::Empty).await?;
        Ok(())
    }

    async fn send(self, method: Method, body: RequestBody) -> Result<Vec<u8>, DataError> {
        let mut url = self.client.endpoint(["rest", "v1", self.table])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.extend_pairs(&self.params);
            if !self.order.is_empty() {
                pairs.append_pair("order", &self.order.join(","));
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let mut headers = self.client.auth_headers();
        if !self.prefer.is_empty() {
            headers.push(("Prefer".to_string(), self.prefer.join(",")));
        }

        self.client
            .execute(BackendRequest {
                method,
                url,
                headers,
                body,
            })
            .await
    }
}
