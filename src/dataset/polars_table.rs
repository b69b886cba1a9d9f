//! Polars Company Table
//!
//! Reads a CSV or Parquet extract of the company dataset. Used for offline
//! runs against a local file; the warehouse backend is the default.

use crate::dataset::table::{CompanyRow, CompanyTable, FilterCriteria, RowSource, RowStream};
use crate::error::{LookupError, Result};
use async_trait::async_trait;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_BATCH_SIZE: usize = 1000;

/// Output columns, in the warehouse's naming.
const NAME: &str = "NAME";
const WEBSITE: &str = "WEBSITE";
const LINKEDIN_URL: &str = "LINKEDIN_URL";
const FOUNDED: &str = "FOUNDED";

pub struct PolarsTable {
    frame: LazyFrame,
    /// lower-cased column name -> column name as it appears in the frame
    columns: HashMap<String, String>,
    batch_size: usize,
}

impl PolarsTable {
    /// Open a `.csv` or `.parquet` extract
    pub fn open(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let frame = match extension.as_str() {
            "csv" => LazyCsvReader::new(path)
                .with_has_header(true)
                .finish()
                .map_err(|e| LookupError::Polars(format!("Failed to load CSV {}: {}", path.display(), e)))?,
            "parquet" => LazyFrame::scan_parquet(path, ScanArgsParquet::default())
                .map_err(|e| LookupError::Polars(format!("Failed to load Parquet {}: {}", path.display(), e)))?,
            _ => {
                return Err(LookupError::Config(format!(
                    "Unsupported dataset file (expected .csv or .parquet): {}",
                    path.display()
                )))
            }
        };

        info!("Opened local company dataset {}", path.display());
        Self::from_frame(frame)
    }

    pub fn from_frame(frame: LazyFrame) -> Result<Self> {
        let schema = frame.schema()?;
        let columns = schema
            .iter_names()
            .map(|name| (name.to_lowercase(), name.to_string()))
            .collect();

        Ok(Self {
            frame,
            columns,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn column(&self, name: &str) -> Option<&str> {
        self.columns.get(&name.to_lowercase()).map(String::as_str)
    }

    fn required_column(&self, name: &str) -> Result<&str> {
        self.column(name)
            .ok_or_else(|| LookupError::Polars(format!("Dataset has no '{}' column", name)))
    }
}

#[async_trait]
impl CompanyTable for PolarsTable {
    fn name(&self) -> &'static str {
        "polars"
    }

    async fn filter(&self, criteria: &FilterCriteria) -> Result<RowStream> {
        let mut predicate: Option<Expr> = None;
        for (column, value) in criteria.predicates() {
            let expr = col(self.required_column(column)?)
                .cast(DataType::String)
                .eq(lit(value));
            predicate = Some(match predicate {
                Some(acc) => acc.and(expr),
                None => expr,
            });
        }

        let mut projection = vec![col(self.required_column(NAME)?).cast(DataType::String).alias(NAME)];
        for optional in [WEBSITE, LINKEDIN_URL, FOUNDED] {
            if let Some(actual) = self.column(optional) {
                projection.push(col(actual).cast(DataType::String).alias(optional));
            }
        }

        let mut plan = self.frame.clone();
        if let Some(predicate) = predicate {
            plan = plan.filter(predicate);
        }
        let plan = plan.select(projection);
        debug!("Polars query plan built for {:?}", criteria);

        Ok(RowStream::new(Box::new(PolarsRowSource {
            plan: Some(plan),
            matched: None,
            offset: 0,
            batch_size: self.batch_size,
        })))
    }
}

/// Runs the filtered plan once, on the first batch, then hands out slices of
/// the matched frame.
struct PolarsRowSource {
    /// taken when the plan is collected
    plan: Option<LazyFrame>,
    matched: Option<DataFrame>,
    offset: usize,
    batch_size: usize,
}

#[async_trait]
impl RowSource for PolarsRowSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<CompanyRow>>> {
        if self.matched.is_none() {
            let Some(plan) = self.plan.take() else {
                return Ok(None);
            };
            let df = plan.collect()?;
            debug!("Local dataset matched {} rows", df.height());
            self.matched = Some(df);
        }
        let Some(matched) = self.matched.as_ref() else {
            return Ok(None);
        };

        if self.offset >= matched.height() {
            return Ok(None);
        }
        let batch = matched.slice(self.offset as i64, self.batch_size);
        self.offset += batch.height();
        debug!("Sliced {} rows from local dataset (offset {})", batch.height(), self.offset);

        frame_to_rows(&batch).map(Some)
    }
}

fn frame_to_rows(df: &DataFrame) -> Result<Vec<CompanyRow>> {
    let names = string_column(df, NAME)?;
    let websites = string_column(df, WEBSITE)?;
    let linkedin = string_column(df, LINKEDIN_URL)?;
    let founded = string_column(df, FOUNDED)?;

    Ok((0..df.height())
        .map(|idx| CompanyRow {
            name: cell(names, idx).unwrap_or_default(),
            website: cell(websites, idx),
            linkedin_url: cell(linkedin, idx),
            founded: cell(founded, idx),
        })
        .collect())
}

fn string_column<'a>(df: &'a DataFrame, name: &str) -> Result<Option<&'a StringChunked>> {
    match df.column(name) {
        Ok(series) => Ok(Some(series.str()?)),
        Err(_) => Ok(None),
    }
}

fn cell(column: Option<&StringChunked>, idx: usize) -> Option<String> {
    column.and_then(|c| c.get(idx)).map(str::to_string)
}
