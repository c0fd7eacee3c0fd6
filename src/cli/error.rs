//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::{DomainError, Rejection};
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Usage(String),

    #[error("change rejected: {0}")]
    Rejected(Rejection),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::Domain(e).into()
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => exitcode::USAGE,
            CliError::Rejected(_) => exitcode::DATAERR,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Application(e) => match e {
                    ApplicationError::OptimisticConflict { .. } => exitcode::TEMPFAIL,
                    ApplicationError::NotFound(_) => exitcode::NOINPUT,
                    ApplicationError::AlreadyExists(_) => exitcode::CANTCREAT,
                    ApplicationError::Store { .. } => exitcode::IOERR,
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                    ApplicationError::Domain(DomainError::NodeNotFound(_)) => exitcode::NOINPUT,
                    ApplicationError::Domain(_)
                    | ApplicationError::InvalidLevels { .. }
                    | ApplicationError::InvalidDomainStruct(_)
                    | ApplicationError::Serialization { .. } => exitcode::DATAERR,
                },
            },
        }
    }
}
