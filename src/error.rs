use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for LookupError {
    fn from(err: polars::error::PolarsError) -> Self {
        LookupError::Polars(err.to_string())
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        LookupError::Remote(err.to_string())
    }
}

/// A message shown to the user in place of a result list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    EnterAddress,
    AddressNotFound,
    ServiceUnavailable,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::EnterAddress => "Please enter an address!",
            Notice::AddressNotFound => "Address not found!",
            Notice::ServiceUnavailable => "Service unavailable, please try again later.",
        }
    }
}

impl LookupError {
    /// Notice for errors a submission can recover from.
    ///
    /// Resource and configuration errors have no notice: they are fatal and
    /// belong to startup, not to a single submission.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            LookupError::Validation(_) => Some(Notice::EnterAddress),
            LookupError::Resolution(_) => Some(Notice::AddressNotFound),
            LookupError::Remote(_)
            | LookupError::Polars(_)
            | LookupError::Json(_)
            | LookupError::Io(_) => Some(Notice::ServiceUnavailable),
            LookupError::Resource(_) | LookupError::Config(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LookupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_mapping() {
        assert_eq!(
            LookupError::Validation("blank".into()).notice(),
            Some(Notice::EnterAddress)
        );
        assert_eq!(
            LookupError::Resolution("nowhere".into()).notice(),
            Some(Notice::AddressNotFound)
        );
        assert_eq!(
            LookupError::Remote("503".into()).notice(),
            Some(Notice::ServiceUnavailable)
        );
        assert_eq!(LookupError::Resource("industry.txt".into()).notice(), None);
        assert_eq!(LookupError::Config("SNOWFLAKE_ACCOUNT".into()).notice(), None);
    }

    #[test]
    fn test_http_error_is_remote() {
        let err = reqwest::Client::new().get("not a url").build().unwrap_err();
        let lookup: LookupError = err.into();
        assert!(matches!(lookup, LookupError::Remote(_)));
        assert_eq!(lookup.notice(), Some(Notice::ServiceUnavailable));
    }
}
