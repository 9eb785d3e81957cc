use derive_more::{Display, Error};

/// Errors raised by the genomic data model.
///
/// Fallible operations return [`eyre::Result`]; the concrete category can be recovered with
/// `report.downcast_ref::<ModelError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ModelError {
    /// The caller passed a value that can never be valid (negative coordinate, unknown tag,
    /// mismatched array widths, ...).
    #[display("Invalid argument: {message}")]
    InvalidArgument { message: String },
    /// The operation is valid in general but not for the current state of the object.
    #[display("Invalid state: {message}")]
    InvalidState { message: String },
}

impl ModelError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    /// Check whether a report carries a [`ModelError`] matching the predicate.
    pub fn matches(report: &eyre::Report, predicate: impl Fn(&ModelError) -> bool) -> bool {
        report.downcast_ref::<ModelError>().is_some_and(predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_display() {
        assert_eq!(
            ModelError::invalid_argument("negative start").to_string(),
            "Invalid argument: negative start"
        );
        assert_eq!(
            ModelError::invalid_state("index already set").to_string(),
            "Invalid state: index already set"
        );
    }

    #[test]
    fn test_model_error_downcast() {
        let report: eyre::Report = ModelError::invalid_state("boom").into();
        assert!(ModelError::matches(&report, ModelError::is_invalid_state));
        assert!(!ModelError::matches(&report, ModelError::is_invalid_argument));
        assert!(!ModelError::matches(
            &eyre::eyre!("plain"),
            ModelError::is_invalid_state
        ));
    }
}
