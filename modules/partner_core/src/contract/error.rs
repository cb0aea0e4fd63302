use thiserror::Error;

use crate::domain::error::{AuthError, DataError, DomainError, NetworkError};

/// Errors that are safe to show to consumers of the public API.
/// Every variant carries a message fit for a user-facing alert.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PartnerDeskError {
    #[error("{message}")]
    Auth { message: String },

    #[error("{message}")]
    Data { message: String },

    #[error("{message}")]
    Network { message: String },

    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<(String, String)>,
    },

    #[error("An update is already in progress")]
    Busy,

    #[error("Please sign in first")]
    SignedOut,
}

impl PartnerDeskError {
    /// Failures worth offering a retry for.
    pub fn is_transient(&self) -> bool {
        matches!(self, PartnerDeskError::Network { .. } | PartnerDeskError::Busy)
    }
}

impl From<DomainError> for PartnerDeskError {
    fn from(domain_error: DomainError) -> Self {
        match domain_error {
            DomainError::Auth(AuthError::NotSignedIn) => Self::SignedOut,
            DomainError::Auth(AuthError::Network(e)) | DomainError::Network(e) => Self::from(e),
            DomainError::Auth(e) => Self::Auth {
                message: e.to_string(),
            },
            DomainError::Data(DataError::MutationInFlight { .. }) => Self::Busy,
            DomainError::Data(DataError::Network(e)) => Self::from(e),
            DomainError::Data(e) => Self::Data {
                message: e.to_string(),
            },
            DomainError::Validation(errors) => {
                let fields: Vec<(String, String)> = errors
                    .iter()
                    .map(|(field, e)| (field.clone(), e.to_string()))
                    .collect();
                let message = DomainError::Validation(errors).to_string();
                Self::Validation { message, fields }
            }
        }
    }
}

impl From<NetworkError> for PartnerDeskError {
    fn from(e: NetworkError) -> Self {
        Self::Network {
            message: e.to_string(),
        }
    }
}

impl From<AuthError> for PartnerDeskError {
    fn from(e: AuthError) -> Self {
        DomainError::from(e).into()
    }
}

impl From<DataError> for PartnerDeskError {
    fn from(e: DataError) -> Self {
        DomainError::from(e).into()
    }
}
