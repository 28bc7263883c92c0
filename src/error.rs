use derive_more::{Display, Error};

/// Why a single row was not applied. Never aborts a batch.
#[derive(Debug, Display, Error)]
pub enum RowError {
    #[error(ignore)]
    #[display("Missing identifying field {field}")]
    MissingIdentifyingField { field: &'static str },
    #[error(ignore)]
    #[display("Invalid value {value:?} in {field}")]
    InvalidField { field: &'static str, value: String },
    #[error(ignore)]
    #[display("Unable to resolve {reference}: {error:#}")]
    ReferenceResolutionFailure {
        reference: String,
        error: anyhow::Error,
    },
    #[error(ignore)]
    #[display("Unable to persist {entity}: {error:#}")]
    PersistenceFailure {
        entity: &'static str,
        error: anyhow::Error,
    },
    #[error(ignore)]
    #[display("Unknown SKU {sku}")]
    UnknownSku { sku: String },
    #[display("Import cancelled before this row")]
    Cancelled,
}

impl RowError {
    pub fn persistence(entity: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |error| RowError::PersistenceFailure { entity, error }
    }

    pub fn resolution<S: ToString>(reference: S) -> impl FnOnce(anyhow::Error) -> Self {
        move |error| RowError::ReferenceResolutionFailure {
            reference: reference.to_string(),
            error,
        }
    }

    /// The row may succeed if resubmitted unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RowError::ReferenceResolutionFailure { .. }
                | RowError::PersistenceFailure { .. }
                | RowError::Cancelled
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RowError::MissingIdentifyingField { .. } => "missing_identifying_field",
            RowError::InvalidField { .. } => "invalid_field",
            RowError::ReferenceResolutionFailure { .. } => "reference_resolution_failure",
            RowError::PersistenceFailure { .. } => "persistence_failure",
            RowError::UnknownSku { .. } => "unknown_sku",
            RowError::Cancelled => "cancelled",
        }
    }
}
