//! Company Table Trait - the contract every dataset backend implements
//!
//! A backend receives four equality filters and hands back a `RowStream`.
//! Rows are pulled from the backend in batches as the stream is consumed,
//! so a large result set is never held in memory at once.

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;

/// Equality filters for one query. Industry, locality and region are stored
/// lower-cased to match the dataset's storage; size is kept as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub industry: String,
    pub size: String,
    pub locality: String,
    pub region: String,
}

impl FilterCriteria {
    pub fn new(industry: &str, size: &str, locality: &str, region: &str) -> Self {
        Self {
            industry: industry.to_lowercase(),
            size: size.to_string(),
            locality: locality.to_lowercase(),
            region: region.to_lowercase(),
        }
    }

    /// (column, value) pairs, all of which must match.
    pub fn predicates(&self) -> [(&'static str, &str); 4] {
        [
            ("industry", self.industry.as_str()),
            ("size", self.size.as_str()),
            ("locality", self.locality.as_str()),
            ("region", self.region.as_str()),
        ]
    }
}

/// Read-only projection of a company record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyRow {
    pub name: String,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    pub founded: Option<String>,
}

/// Produces rows one batch at a time. `Ok(None)` means exhausted.
#[async_trait]
pub trait RowSource: Send {
    async fn next_batch(&mut self) -> Result<Option<Vec<CompanyRow>>>;
}

/// Forward-only, single-pass sequence of matching rows.
///
/// Once `next` returns `None` (or an error) the stream stays exhausted.
pub struct RowStream {
    source: Option<Box<dyn RowSource>>,
    buffer: VecDeque<CompanyRow>,
}

impl RowStream {
    pub fn new(source: Box<dyn RowSource>) -> Self {
        Self {
            source: Some(source),
            buffer: VecDeque::new(),
        }
    }

    /// Stream over rows that are already in memory.
    pub fn from_rows(rows: Vec<CompanyRow>) -> Self {
        Self {
            source: None,
            buffer: rows.into(),
        }
    }

    pub async fn next(&mut self) -> Option<Result<CompanyRow>> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Some(Ok(row));
            }
            let source = self.source.as_mut()?;
            match source.next_batch().await {
                Ok(Some(batch)) => self.buffer.extend(batch),
                Ok(None) => {
                    self.source = None;
                    return None;
                }
                Err(e) => {
                    self.source = None;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// A filterable view over the company dataset.
#[async_trait]
pub trait CompanyTable: Send + Sync {
    /// Backend name for logs (e.g., "snowflake", "polars")
    fn name(&self) -> &'static str;

    /// Start a query; rows are fetched as the returned stream is consumed
    async fn filter(&self, criteria: &FilterCriteria) -> Result<RowStream>;
}
