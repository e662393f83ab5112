use derive_more::Display;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Display)]
pub struct UnknownError(BoxedError);

impl std::error::Error for UnknownError {}

impl UnknownError {
    pub fn new(err: BoxedError) -> Self {
        Self(err)
    }
}

impl From<sqlx::error::Error> for UnknownError {
    fn from(err: sqlx::error::Error) -> Self {
        Self::new(err.into())
    }
}

impl From<tokio::task::JoinError> for UnknownError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::new(err.into())
    }
}

pub mod app {
    use derive_more::Display;
    use salvo::{http::StatusCode, writer::Json, Piece};

    use super::{
        http::{BadRequest, ErrorResponse},
        persistence::PersistenceError,
        resource::{ConflictError, NotFoundError, ValidationError},
        service::DispatchError,
    };

    #[derive(Debug, Display)]
    pub enum ApplicationError {
        BadRequest(BadRequest),
        Validation(ValidationError),
        NotFound(NotFoundError),
        Conflict(ConflictError),
        Persistence(PersistenceError),
        Dispatch(DispatchError),
    }

    impl std::error::Error for ApplicationError {}

    impl ApplicationError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                ApplicationError::BadRequest(_) | ApplicationError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
                ApplicationError::NotFound(_) => StatusCode::NOT_FOUND,
                ApplicationError::Conflict(_) => StatusCode::CONFLICT,
                ApplicationError::Dispatch(DispatchError::Timeout(_)) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                ApplicationError::Persistence(_) | ApplicationError::Dispatch(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }
    }

    impl From<BadRequest> for ApplicationError {
        fn from(err: BadRequest) -> Self {
            Self::BadRequest(err)
        }
    }

    impl From<ValidationError> for ApplicationError {
        fn from(err: ValidationError) -> Self {
            Self::Validation(err)
        }
    }

    impl From<NotFoundError> for ApplicationError {
        fn from(err: NotFoundError) -> Self {
            Self::NotFound(err)
        }
    }

    impl From<ConflictError> for ApplicationError {
        fn from(err: ConflictError) -> Self {
            Self::Conflict(err)
        }
    }

    impl From<PersistenceError> for ApplicationError {
        fn from(err: PersistenceError) -> Self {
            Self::Persistence(err)
        }
    }

    impl From<DispatchError> for ApplicationError {
        fn from(err: DispatchError) -> Self {
            Self::Dispatch(err)
        }
    }

    impl Piece for ApplicationError {
        fn render(self, res: &mut salvo::Response) {
            let status = self.status_code();
            if status.is_server_error() {
                tracing::error!(error = %self, "request failed");
            } else {
                tracing::debug!(error = %self, "request rejected");
            }
            res.set_status_code(status);
            res.render(Json(ErrorResponse::new(&self)));
        }
    }
}

pub mod service {
    use derive_more::Display;

    use crate::error::UnknownError;

    #[derive(Debug, Display)]
    pub enum DispatchError {
        #[display(fmt = "Dispatched operation timed out in {_0:?}")]
        Timeout(Option<std::time::Duration>),
        #[display(fmt = "IO error dispatching {_0}")]
        IO(std::io::Error),
        #[display(fmt = "Unknown dispatch error {_0}")]
        Unknown(UnknownError),
    }

    impl std::error::Error for DispatchError {}

    impl From<tokio::task::JoinError> for DispatchError {
        fn from(err: tokio::task::JoinError) -> Self {
            Self::Unknown(err.into())
        }
    }
}

pub mod persistence {
    use std::io;

    use derive_more::Display;

    use super::{service::DispatchError, UnknownError};

    pub type SqlState = String;

    /// SQLSTATE raised by postgres on a unique constraint violation.
    pub const UNIQUE_VIOLATION: &str = "23505";

    #[derive(Debug, Display)]
    pub enum PersistenceError {
        #[display(fmt = "database persistence error: SQLSTATE {_0:?}")]
        Database(Option<SqlState>),
        #[display(fmt = "persistence layer connection error: {_0}")]
        Connection(DispatchError),
        #[display(fmt = "PersistenceError data not found")]
        NotFound,
        #[display(fmt = "PersistenceError conflicting data")]
        Conflict,
        #[display(fmt = "PersistenceError decoding data: {_0}")]
        DecodeData(String),
        #[display(fmt = "PersistenceError data migration: {_0}")]
        DataMigration(String),
        #[display(fmt = "unknown persistence error: {_0}")]
        Unknown(UnknownError),
    }

    impl std::error::Error for PersistenceError {}

    type SqlxError = sqlx::error::Error;

    impl From<SqlxError> for PersistenceError {
        fn from(err: SqlxError) -> Self {
            match err {
                SqlxError::Configuration(_) => {
                    Self::Connection(DispatchError::IO(io::ErrorKind::InvalidInput.into()))
                }
                SqlxError::Database(db) => match db.code() {
                    Some(code) if code == UNIQUE_VIOLATION => Self::Conflict,
                    code => Self::Database(code.map(|code| code.into())),
                },
                SqlxError::Io(io) => Self::Connection(DispatchError::IO(io)),
                SqlxError::Tls(_) => {
                    Self::Connection(DispatchError::IO(io::ErrorKind::ConnectionRefused.into()))
                }
                SqlxError::Protocol(msg) => Self::Connection(DispatchError::IO(io::Error::new(
                    io::ErrorKind::InvalidData,
                    msg,
                ))),
                SqlxError::RowNotFound => Self::NotFound,
                SqlxError::ColumnNotFound(column) => {
                    Self::DecodeData(format!("column {column} not found"))
                }
                SqlxError::TypeNotFound { .. }
                | SqlxError::ColumnIndexOutOfBounds { .. }
                | SqlxError::ColumnDecode { .. }
                | SqlxError::Decode(_) => Self::DecodeData(err.to_string()),
                SqlxError::PoolTimedOut => Self::Connection(DispatchError::Timeout(None)),
                SqlxError::PoolClosed => {
                    Self::Connection(DispatchError::IO(io::ErrorKind::NotConnected.into()))
                }
                SqlxError::WorkerCrashed => {
                    tracing::error!("FATAL: sqlx background worker error, {err}");
                    Self::Unknown(err.into())
                }
                SqlxError::Migrate(migrate) => Self::DataMigration(migrate.to_string()),
                _ => PersistenceError::Unknown(err.into()),
            }
        }
    }

    impl From<sqlx::migrate::MigrateError> for PersistenceError {
        fn from(err: sqlx::migrate::MigrateError) -> Self {
            Self::DataMigration(err.to_string())
        }
    }
}

pub mod resource {
    use derive_more::{Display, Error};
    use uuid::Uuid;

    use crate::base::ResourceID;

    #[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
    pub enum ValidationErrorKind {
        /// Not enough properties in an object.
        #[display(fmt = "expected at least {_0} field(s)")]
        MinProperties(u64),
        /// When a required property is missing.
        #[display(fmt = "value is required")]
        Required,
        /// Minimum inclusive string length.
        #[display(fmt = "expected at least {_0} character(s)")]
        MinLength(u64),
        /// When the input doesn't match to a pattern.
        #[display(fmt = "expected format {_0}")]
        Pattern(String),
        /// The input value doesn't match one or multiple required types.
        #[display(fmt = "invalid type")]
        InvalidType,
    }

    impl std::error::Error for ValidationErrorKind {}

    #[derive(Debug, Error, Clone, PartialEq, Eq)]
    pub struct ValidationError {
        /// Name of the resource
        pub resource_type: &'static str,
        /// Invalid resource fields
        pub fields: Vec<ValidationFieldError>,
    }

    impl ValidationError {
        pub fn from_resource<R>(fields: Vec<ValidationFieldError>) -> Self
        where
            R: ResourceID,
        {
            Self {
                resource_type: R::resource_id(),
                fields,
            }
        }

        #[cfg(test)]
        pub fn has_field(&self, path: &str) -> bool {
            self.fields.iter().any(|field| field.path == path)
        }
    }

    impl std::fmt::Display for ValidationError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "Invalid resource {}", self.resource_type)?;
            for (i, field) in self.fields.iter().enumerate() {
                let sep = if i == 0 { ": " } else { "; " };
                write!(f, "{sep}{field}")?;
            }
            Ok(())
        }
    }

    #[derive(Debug, Error, Clone, PartialEq, Eq)]
    pub struct ValidationFieldError {
        /// Resource field path with invalid value
        pub path: String,
        /// Displayed invalid value
        pub value: String,
        /// Value type id
        pub type_id: &'static str,
        /// Kinds of validation errors
        pub kinds: Vec<ValidationErrorKind>,
    }

    impl ValidationFieldError {
        pub fn from_resource<T>(
            value: String,
            path: String,
            kinds: Vec<ValidationErrorKind>,
        ) -> Self
        where
            T: ResourceID,
        {
            Self {
                path,
                type_id: T::resource_id(),
                value,
                kinds,
            }
        }
    }

    impl std::fmt::Display for ValidationFieldError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "field '{}' from {:?}", self.path, self.value)?;
            for (i, kind) in self.kinds.iter().enumerate() {
                let sep = if i == 0 { ", " } else { " and " };
                write!(f, "{sep}{kind}")?;
            }
            Ok(())
        }
    }

    #[derive(Debug, Display, Clone, Error, PartialEq, Eq)]
    #[display(fmt = "Conflicting resource {resource_type} of id {resource_id}")]
    pub struct ConflictError {
        /// Resource id
        pub resource_id: Uuid,
        /// Name of the resource
        pub resource_type: &'static str,
    }

    impl ConflictError {
        pub fn from_resource<R: ResourceID>(resource_id: Uuid) -> Self {
            Self {
                resource_id,
                resource_type: R::resource_id(),
            }
        }
    }

    #[derive(Debug, Display, Clone, Error, PartialEq, Eq)]
    #[display(fmt = "Resource {resource_type} of id {resource_id:?} not found")]
    pub struct NotFoundError {
        /// Requested id, as received
        pub resource_id: String,
        /// Name of the resource
        pub resource_type: &'static str,
    }

    impl NotFoundError {
        pub fn from_resource<R: ResourceID>(resource_id: impl ToString) -> Self {
            Self {
                resource_id: resource_id.to_string(),
                resource_type: R::resource_id(),
            }
        }
    }
}

pub mod http {
    use derive_more::Display;
    use salvo::http::ParseError;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Display, Clone, Serialize, Deserialize)]
    pub enum BadRequest {
        #[display(fmt = "invalid request content: {_0}")]
        InvalidContent(String),
    }

    impl std::error::Error for BadRequest {}

    /// Body of every error response.
    #[derive(Debug, Display, Clone, Serialize, Deserialize)]
    #[display(fmt = "Response error: {errors}")]
    pub struct ErrorResponse {
        pub errors: String,
    }

    impl ErrorResponse {
        pub fn new<E: std::fmt::Display>(err: &E) -> Self {
            Self {
                errors: err.to_string(),
            }
        }
    }

    impl From<ParseError> for BadRequest {
        fn from(err: ParseError) -> Self {
            BadRequest::InvalidContent(err.to_string())
        }
    }
}
