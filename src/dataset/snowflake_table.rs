//! Snowflake Company Table
//!
//! Runs the filtered scan on the warehouse through the SQL REST API and
//! streams the result set back one partition at a time.

use crate::config::{WarehouseConfig, DEFAULT_USER_AGENT};
use crate::dataset::table::{CompanyRow, CompanyTable, FilterCriteria, RowSource, RowStream};
use crate::error::{LookupError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

// SQL API: POST /api/v2/statements with a JSON body
// Headers: Authorization (Bearer), X-Snowflake-Authorization-Token-Type

const MAX_POLLS: usize = 600;

/// Snowflake-backed company table
pub struct SnowflakeTable {
    conn: Arc<Connection>,
    poll_interval: Duration,
}

struct Connection {
    config: WarehouseConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: String,
    database: &'a str,
    schema: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    bindings: BTreeMap<String, Binding>,
}

#[derive(Debug, Serialize)]
struct Binding {
    #[serde(rename = "type")]
    kind: &'static str,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSet {
    statement_handle: String,
    result_set_meta_data: Option<ResultSetMetaData>,
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    #[serde(default)]
    num_rows: u64,
    #[serde(default)]
    row_type: Vec<RowType>,
    #[serde(default)]
    partition_info: Vec<PartitionInfo>,
}

#[derive(Debug, Deserialize)]
struct RowType {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartitionInfo {
    #[serde(default)]
    row_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryStatus {
    statement_handle: Option<String>,
    statement_status_url: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PartitionData {
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

impl SnowflakeTable {
    pub fn new(config: WarehouseConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .tcp_keepalive(Duration::from_secs(60))
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| LookupError::Remote(format!("Failed to create HTTP client for Snowflake: {}", e)))?;

        info!(
            "Snowflake table handle bound to {}.{}.{}",
            config.database, config.schema, config.table
        );

        Ok(Self {
            conn: Arc::new(Connection { config, client }),
            poll_interval: Duration::from_millis(500),
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn statement(&self) -> String {
        format!(
            "SELECT NAME, WEBSITE, LINKEDIN_URL, FOUNDED FROM {} \
             WHERE industry = ? AND size = ? AND locality = ? AND region = ?",
            self.conn.config.table
        )
    }

    fn request_body(&self, criteria: &FilterCriteria) -> StatementRequest<'_> {
        let config = &self.conn.config;
        let bindings = criteria
            .predicates()
            .iter()
            .enumerate()
            .map(|(idx, (_, value))| {
                (
                    (idx + 1).to_string(),
                    Binding {
                        kind: "TEXT",
                        value: value.to_string(),
                    },
                )
            })
            .collect();

        StatementRequest {
            statement: self.statement(),
            database: &config.database,
            schema: &config.schema,
            warehouse: config.warehouse.as_deref(),
            role: config.role.as_deref(),
            bindings,
        }
    }

    /// Submit the statement and wait for the first partition
    async fn submit(&self, body: &StatementRequest<'_>) -> Result<ResultSet> {
        let url = self.conn.url("/api/v2/statements");
        let mut response = self
            .conn
            .authorized(self.conn.client.post(&url))
            .json(body)
            .send()
            .await
            .map_err(|e| LookupError::Remote(format!("Failed to submit Snowflake statement: {}", e)))?;

        let mut polls = 0;
        while response.status() == StatusCode::ACCEPTED {
            polls += 1;
            if polls > MAX_POLLS {
                return Err(LookupError::Remote(format!(
                    "Snowflake statement still running after {} polls",
                    MAX_POLLS
                )));
            }

            let pending: QueryStatus = response
                .json()
                .await
                .map_err(|e| LookupError::Remote(format!("Failed to parse Snowflake status: {}", e)))?;
            let status_url = pending
                .statement_status_url
                .or_else(|| pending.statement_handle.map(|h| format!("/api/v2/statements/{}", h)))
                .ok_or_else(|| LookupError::Remote("Snowflake returned no statement handle".to_string()))?;
            debug!(
                "Snowflake statement in progress ({}), polling {}",
                pending.message.unwrap_or_default(),
                status_url
            );

            tokio::time::sleep(self.poll_interval).await;
            response = self
                .conn
                .authorized(self.conn.client.get(self.conn.url(&status_url)))
                .send()
                .await
                .map_err(|e| LookupError::Remote(format!("Failed to poll Snowflake statement: {}", e)))?;
        }

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LookupError::Remote(format!(
                "Snowflake statement failed with status {}: {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| LookupError::Remote(format!("Failed to parse Snowflake result set: {}", e)))
    }
}

impl Connection {
    fn url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.config.base_url, path)
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.token)
            .header("X-Snowflake-Authorization-Token-Type", &self.config.token_type)
            .header("Accept", "application/json")
    }
}

#[async_trait]
impl CompanyTable for SnowflakeTable {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    async fn filter(&self, criteria: &FilterCriteria) -> Result<RowStream> {
        let body = self.request_body(criteria);
        info!("Executing company query on Snowflake for {:?}", criteria);

        let result = self.submit(&body).await?;
        let meta = result.result_set_meta_data.unwrap_or_default();
        let columns = ColumnMap::from_row_type(&meta.row_type)?;
        info!(
            "Snowflake statement {} matched {} rows in {} partitions",
            result.statement_handle,
            meta.num_rows,
            meta.partition_info.len().max(1)
        );

        Ok(RowStream::new(Box::new(PartitionSource {
            conn: Arc::clone(&self.conn),
            handle: result.statement_handle,
            columns,
            first: Some(result.data),
            next_partition: 1,
            partition_rows: meta.partition_info.iter().map(|p| p.row_count).collect(),
        })))
    }
}

/// Positions of the projected columns in a result row
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    name: usize,
    website: Option<usize>,
    linkedin_url: Option<usize>,
    founded: Option<usize>,
}

impl ColumnMap {
    fn from_row_type(row_type: &[RowType]) -> Result<Self> {
        let find = |wanted: &str| row_type.iter().position(|c| c.name.eq_ignore_ascii_case(wanted));
        Ok(Self {
            name: find("NAME")
                .ok_or_else(|| LookupError::Remote("Snowflake result has no NAME column".to_string()))?,
            website: find("WEBSITE"),
            linkedin_url: find("LINKEDIN_URL"),
            founded: find("FOUNDED"),
        })
    }

    fn to_row(&self, raw: Vec<Option<String>>) -> CompanyRow {
        let get = |idx: Option<usize>| idx.and_then(|i| raw.get(i).cloned().flatten());
        CompanyRow {
            name: get(Some(self.name)).unwrap_or_default(),
            website: get(self.website),
            linkedin_url: get(self.linkedin_url),
            founded: get(self.founded),
        }
    }
}

/// Hands out partition 0 from the submit response, then fetches the rest on demand.
struct PartitionSource {
    conn: Arc<Connection>,
    handle: String,
    columns: ColumnMap,
    first: Option<Vec<Vec<Option<String>>>>,
    next_partition: usize,
    /// expected row count per partition, from the result set metadata
    partition_rows: Vec<u64>,
}

impl PartitionSource {
    async fn fetch_partition(&self, partition: usize) -> Result<Vec<Vec<Option<String>>>> {
        let url = self.conn.url(&format!("/api/v2/statements/{}", self.handle));
        let response = self
            .conn
            .authorized(self.conn.client.get(&url))
            .query(&[("partition", partition)])
            .send()
            .await
            .map_err(|e| LookupError::Remote(format!("Failed to fetch Snowflake partition {}: {}", partition, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LookupError::Remote(format!(
                "Snowflake partition {} failed with status {}: {}",
                partition, status, text
            )));
        }

        let body: PartitionData = response
            .json()
            .await
            .map_err(|e| LookupError::Remote(format!("Failed to parse Snowflake partition {}: {}", partition, e)))?;
        Ok(body.data)
    }
}

#[async_trait]
impl RowSource for PartitionSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<CompanyRow>>> {
        let raw = match self.first.take() {
            Some(data) => data,
            None if self.next_partition < self.partition_rows.len() => {
                let partition = self.next_partition;
                self.next_partition += 1;
                debug!(
                    "Fetching Snowflake partition {}/{} ({} rows)",
                    partition + 1,
                    self.partition_rows.len(),
                    self.partition_rows[partition]
                );
                self.fetch_partition(partition).await?
            }
            None => return Ok(None),
        };

        let columns = self.columns;
        Ok(Some(raw.into_iter().map(|r| columns.to_row(r)).collect()))
    }
}
