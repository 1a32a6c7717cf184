//! REST table API: filtered select/insert/update/delete on named tables

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{BackendClient, Surface};
use crate::error::{BackendError, BackendResult};
use crate::models::Access;

/// A column filter understood by the REST API
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq(String, String),
    /// `column > value`
    Gt(String, String),
    /// `column IS true/false/null`
    Is(String, Option<bool>),
    /// `column IN (values)`
    In(String, Vec<String>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Filter::Eq(column.into(), value.to_string())
    }

    pub fn gt(column: impl Into<String>, value: impl ToString) -> Self {
        Filter::Gt(column.into(), value.to_string())
    }

    pub fn is(column: impl Into<String>, value: Option<bool>) -> Self {
        Filter::Is(column.into(), value)
    }

    pub fn is_in<I, T>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        Filter::In(
            column.into(),
            values.into_iter().map(|v| v.to_string()).collect(),
        )
    }

    /// Column the filter applies to
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::Gt(c, _) | Filter::Is(c, _) | Filter::In(c, _) => c,
        }
    }

    /// Render as a `(column, operator.value)` query pair
    pub fn to_query_pair(&self) -> (String, String) {
        let value = match self {
            Filter::Eq(_, v) => format!("eq.{}", v),
            Filter::Gt(_, v) => format!("gt.{}", v),
            Filter::Is(_, None) => "is.null".to_string(),
            Filter::Is(_, Some(b)) => format!("is.{}", b),
            Filter::In(_, values) => {
                let quoted: Vec<String> = values
                    .iter()
                    .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
                    .collect();
                format!("in.({})", quoted.join(","))
            }
        };
        (self.column().to_string(), value)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// A query against one table
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Option<(String, Order)>,
    pub limit: Option<usize>,
}

impl Query {
    /// Start a query on `table`
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Add a filter
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sort by a column
    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order = Some((column.into(), order));
        self
    }

    /// Limit the number of rows
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs for the REST API
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> =
            self.filters.iter().map(Filter::to_query_pair).collect();

        if let Some((column, order)) = &self.order {
            let dir = match order {
                Order::Asc => "asc",
                Order::Desc => "desc",
            };
            pairs.push(("order".to_string(), format!("{}.{}", column, dir)));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

/// Row operations against the hosted database
///
/// Rows travel as JSON objects; typed mapping happens in the caller's
/// repositories.
#[async_trait]
pub trait Database: Send + Sync {
    /// Fetch every row matching the query
    async fn select(&self, query: &Query, access: &Access) -> BackendResult<Vec<Value>>;

    /// Insert one row and return it as stored
    async fn insert(&self, table: &str, row: Value, access: &Access) -> BackendResult<Value>;

    /// Apply `patch` to matching rows and return the updated rows
    async fn update(&self, query: &Query, patch: Value, access: &Access)
        -> BackendResult<Vec<Value>>;

    /// Delete matching rows and return the deleted rows
    async fn delete(&self, query: &Query, access: &Access) -> BackendResult<Vec<Value>>;
}

impl BackendClient {
    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.config.rest_url(), table)
    }

    async fn rows(&self, response: reqwest::Response, table: &str) -> BackendResult<Vec<Value>> {
        let response = self.check(response, Surface::Rest, table).await?;
        match response.json::<Value>().await? {
            Value::Array(rows) => Ok(rows),
            other => Err(BackendError::InvalidResponse(format!(
                "expected an array of rows from {}, got {}",
                table,
                type_name(&other)
            ))),
        }
    }
}

// Mutations need at least one filter; an empty filter list would hit the whole table.
fn require_filters(query: &Query) -> BackendResult<()> {
    if query.filters.is_empty() {
        return Err(BackendError::Configuration(format!(
            "refusing unfiltered mutation on {}",
            query.table
        )));
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl Database for BackendClient {
    async fn select(&self, query: &Query, access: &Access) -> BackendResult<Vec<Value>> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        pairs.extend(query.to_query_pairs());

        let response = self
            .http_client
            .get(self.table_url(&query.table))
            .headers(self.access_headers(access)?)
            .query(&pairs)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.rows(response, &query.table).await
    }

    async fn insert(&self, table: &str, row: Value, access: &Access) -> BackendResult<Value> {
        let response = self
            .http_client
            .post(self.table_url(table))
            .headers(self.access_headers(access)?)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.rows(response, table)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidResponse(format!("insert into {} returned no row", table)))
    }

    async fn update(
        &self,
        query: &Query,
        patch: Value,
        access: &Access,
    ) -> BackendResult<Vec<Value>> {
        require_filters(query)?;

        let response = self
            .http_client
            .patch(self.table_url(&query.table))
            .headers(self.access_headers(access)?)
            .header("Prefer", "return=representation")
            .query(&query.to_query_pairs())
            .json(&patch)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.rows(response, &query.table).await
    }

    async fn delete(&self, query: &Query, access: &Access) -> BackendResult<Vec<Value>> {
        require_filters(query)?;

        let response = self
            .http_client
            .delete(self.table_url(&query.table))
            .headers(self.access_headers(access)?)
            .header("Prefer", "return=representation")
            .query(&query.to_query_pairs())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.rows(response, &query.table).await
    }
}
