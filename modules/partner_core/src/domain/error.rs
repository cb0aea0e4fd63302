use thiserror::Error;
use uuid::Uuid;

/// Failures of the remote authentication API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with email '{email}' already exists")]
    DuplicateAccount { email: String },

    #[error("Password is too weak: {reason}")]
    WeakPassword { reason: String },

    #[error("Email address has not been confirmed yet")]
    EmailNotConfirmed,

    #[error("No user is signed in")]
    NotSignedIn,

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Authentication failed: {message}")]
    Unexpected { message: String },
}

impl AuthError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }
}

/// Failures of the remote storage tables.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("An update for reservation {id} is already in progress")]
    MutationInFlight { id: Uuid },

    #[error("No active business selected")]
    NoActiveBusiness,

    #[error("Malformed {entity} row: {message}")]
    Malformed {
        entity: &'static str,
        message: String,
    },

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Remote storage error: {message}")]
    Remote { message: String },

    #[error("Local storage error: {message}")]
    Local { message: String },
}

impl DataError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    pub fn local(message: impl Into<String>) -> Self {
        Self::Local {
            message: message.into(),
        }
    }

    pub fn malformed(entity: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed {
            entity,
            message: message.into(),
        }
    }
}

/// Transport-level failures (remote unreachable, bad status, bad payload).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Service unreachable: {message}")]
    Unreachable { message: String },

    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not decode response: {message}")]
    Decode { message: String },
}

impl NetworkError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Client-side form rule violations, checked before anything is submitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password must be at least {min} characters long")]
    PasswordTooShort { min: usize },

    #[error("Invalid phone number")]
    InvalidPhone,

    #[error("Invalid website address")]
    InvalidWebsite,

    #[error("{field} must be a whole number")]
    NotNumeric { field: String },

    #[error("Invalid time, expected HH:MM")]
    InvalidTime,
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        Self::Required {
            field: field.into(),
        }
    }
}

/// Every failure a domain operation can report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<(String, ValidationError)>),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, error: ValidationError) -> Self {
        Self::Validation(vec![(field.into(), error)])
    }
}

impl From<ValidationError> for DomainError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(vec![(String::new(), error)])
    }
}

fn summarize(errors: &[(String, ValidationError)]) -> String {
    errors
        .iter()
        .map(|(field, e)| {
            if field.is_empty() {
                e.to_string()
            } else {
                format!("{field}: {e}")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
