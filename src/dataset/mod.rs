//! Dataset Module - filtered scans over the company dataset
//!
//! - `CompanyTable` trait for pluggable backends
//! - `RowStream` lazy, single-pass row sequence
//! - Backends: Snowflake (remote warehouse) and Polars (local extract)

pub mod table;

pub mod polars_table;
pub mod snowflake_table;

pub use polars_table::PolarsTable;
pub use snowflake_table::SnowflakeTable;
pub use table::{CompanyRow, CompanyTable, FilterCriteria, RowSource, RowStream};

use crate::error::Result;
use crate::session::SessionContext;
use tracing::info;

/// Run the four-way equality filter against the session's table handle.
///
/// No row limit is applied; the stream can be arbitrarily long.
pub async fn query(
    session: &SessionContext,
    industry: &str,
    size: &str,
    locality: &str,
    region: &str,
) -> Result<RowStream> {
    let table = session.table()?;
    let criteria = FilterCriteria::new(industry, size, locality, region);
    info!("Querying {} table: {:?}", table.name(), criteria);
    table.filter(&criteria).await
}
