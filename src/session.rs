//! Per-session state
//!
//! Holds the dataset table handle and the geocoder (both built once and then
//! only read), plus the last resolved address and coordinates.

use crate::config::{AppConfig, DatasetConfig};
use crate::dataset::{CompanyTable, PolarsTable, SnowflakeTable};
use crate::error::{LookupError, Result};
use crate::geocode::{Geocoder, NominatimGeocoder};
use std::sync::Arc;
use tracing::info;

/// Builds the connections a new session needs.
pub trait SessionConnector: Send + Sync {
    fn connect_table(&self) -> Result<Arc<dyn CompanyTable>>;
    fn connect_geocoder(&self) -> Result<Arc<dyn Geocoder>>;
}

/// Connector driven by `AppConfig`
pub struct ConfiguredConnector {
    config: AppConfig,
}

impl ConfiguredConnector {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }
}

impl SessionConnector for ConfiguredConnector {
    fn connect_table(&self) -> Result<Arc<dyn CompanyTable>> {
        match &self.config.dataset {
            DatasetConfig::Warehouse(warehouse) => Ok(Arc::new(SnowflakeTable::new(warehouse.clone())?)),
            DatasetConfig::Local(path) => Ok(Arc::new(PolarsTable::open(path)?)),
        }
    }

    fn connect_geocoder(&self) -> Result<Arc<dyn Geocoder>> {
        Ok(Arc::new(NominatimGeocoder::new(&self.config.geocoder)?))
    }
}

#[derive(Default)]
pub struct SessionContext {
    table: Option<Arc<dyn CompanyTable>>,
    geocoder: Option<Arc<dyn Geocoder>>,
    address: Option<String>,
    coordinates: Option<(f64, f64)>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build whichever connections are missing; existing ones are kept.
    pub fn ensure_initialized(&mut self, connector: &dyn SessionConnector) -> Result<()> {
        if self.table.is_none() {
            let table = connector.connect_table()?;
            info!("Session table handle created ({})", table.name());
            self.table = Some(table);
        }
        if self.geocoder.is_none() {
            self.geocoder = Some(connector.connect_geocoder()?);
            info!("Session geocoder created");
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.table.is_some() && self.geocoder.is_some()
    }

    pub fn table(&self) -> Result<Arc<dyn CompanyTable>> {
        self.table
            .clone()
            .ok_or_else(|| LookupError::Config("session has no table handle".to_string()))
    }

    pub fn geocoder(&self) -> Result<Arc<dyn Geocoder>> {
        self.geocoder
            .clone()
            .ok_or_else(|| LookupError::Config("session has no geocoder".to_string()))
    }

    pub fn record_location(&mut self, address: String, coordinates: (f64, f64)) {
        self.address = Some(address);
        self.coordinates = Some(coordinates);
    }

    /// Full address of the last successful geocode
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// (latitude, longitude) of the last successful geocode
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.coordinates
    }
}
