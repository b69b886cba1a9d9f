pub mod config;
pub mod controller;
pub mod dataset;
pub mod error;
pub mod geocode;
pub mod reference;
pub mod render;
pub mod session;

pub use controller::{FormController, FormInput, FormState, SubmissionOutcome};
pub use error::{LookupError, Notice, Result};
pub use session::{ConfiguredConnector, SessionConnector, SessionContext};
