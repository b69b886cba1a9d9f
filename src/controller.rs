//! Form controller
//!
//! Handles one submit event at a time: validate the address, resolve it,
//! query the dataset and render the rows. Every submission starts from
//! `Idle` and returns there, so a session can submit any number of times.

use crate::dataset;
use crate::error::{LookupError, Notice, Result};
use crate::geocode;
use crate::render::{self, Presenter};
use crate::session::{SessionConnector, SessionContext};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_ADDRESS: &str = "98109";

/// Zero-based index of the preselected size bucket.
pub const DEFAULT_SIZE_INDEX: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Idle,
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormInput {
    pub address: String,
    pub industry: String,
    pub size: String,
}

impl FormInput {
    /// Initial form values: the placeholder address, the first industry and
    /// the fourth size bucket (or the last one if there are fewer).
    pub fn with_defaults(industries: &[String], sizes: &[String]) -> Self {
        let size = sizes
            .get(DEFAULT_SIZE_INDEX)
            .or_else(|| sizes.last())
            .cloned()
            .unwrap_or_default();
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            industry: industries.first().cloned().unwrap_or_default(),
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Rows were rendered (zero rows still counts; the renderer showed its notice).
    Rendered { rows: usize },
    /// Processing stopped and the notice was shown.
    Rejected(Notice),
}

pub struct FormController {
    connector: Arc<dyn SessionConnector>,
    state: FormState,
}

impl FormController {
    pub fn new(connector: Arc<dyn SessionConnector>) -> Self {
        Self {
            connector,
            state: FormState::Idle,
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    /// Create the session's connections if they do not exist yet.
    pub fn start_session(&self, session: &mut SessionContext) -> Result<()> {
        session.ensure_initialized(self.connector.as_ref())
    }

    /// Handle a submit event.
    ///
    /// Recoverable failures are shown as notices and reported as
    /// `Rejected`; only configuration errors come back as `Err`.
    pub async fn submit(
        &mut self,
        session: &mut SessionContext,
        form: &FormInput,
        out: &mut dyn Presenter,
    ) -> Result<SubmissionOutcome> {
        self.state = FormState::Submitted;
        let result = self.process(session, form, out).await;
        self.state = FormState::Idle;

        match result {
            Ok(rows) => Ok(SubmissionOutcome::Rendered { rows }),
            Err(err) => match err.notice() {
                Some(notice) => {
                    warn!("Submission stopped: {}", err);
                    out.error(notice.message());
                    Ok(SubmissionOutcome::Rejected(notice))
                }
                None => Err(err),
            },
        }
    }

    async fn process(
        &self,
        session: &mut SessionContext,
        form: &FormInput,
        out: &mut dyn Presenter,
    ) -> Result<usize> {
        let address = form.address.trim();
        if address.is_empty() {
            return Err(LookupError::Validation("address is blank".to_string()));
        }

        self.start_session(session)?;
        debug!("Submitting {:?}", form);

        let place = geocode::resolve(session, address).await?;
        let rows = dataset::query(session, &form.industry, &form.size, &place.city, &place.state).await?;
        render::render(rows, out).await
    }
}
