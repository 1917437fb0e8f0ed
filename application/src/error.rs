//! [`Error`]-related definitions.

use std::{collections::BTreeMap, fmt};

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::typed_header::TypedHeaderRejection;
use derive_more::Error as StdError;
use itertools::Itertools as _;
use service::infra::database;
use tracerr::{Trace, Traced};

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_string(),
                            fields: ::std::collections::BTreeMap::new(),
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// REST API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,

    /// Messages describing invalid request fields, if any.
    pub fields: BTreeMap<&'static str, Vec<String>>,
}

impl Error {
    /// Create a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            fields: BTreeMap::new(),
            backtrace: None,
        }
    }

    /// Creates a new [`Error`] representing a malformed request.
    #[must_use]
    pub fn bad_request(msg: &impl ToString) -> Self {
        Self {
            code: "BAD_REQUEST",
            status_code: http::StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            fields: BTreeMap::new(),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
            fields: _,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("{trace}"))),
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let error = if self.status_code.is_server_error() {
            tracing::error!("{self}");
            serde_json::Value::from("Internal server error")
        } else if self.fields.is_empty() {
            serde_json::Value::from(self.message)
        } else {
            serde_json::json!(self.fields)
        };

        (
            self.status_code,
            Json(serde_json::json!({
                "code": self.code,
                "error": error,
            })),
        )
            .into_response()
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Collector of invalid request fields.
///
/// Converts into a `400 Bad Request` [`Error`] listing every invalid field.
#[derive(Clone, Debug, Default)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    /// Message of a missing required field.
    const REQUIRED: &'static str = "is required";

    /// Records the provided `message` for the `field`.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    /// Indicates whether no invalid fields have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks the parsed `value` of a required `field`.
    ///
    /// The outer [`None`] means the field is missing, the inner one means it
    /// failed to parse, in which case the `message` is recorded.
    pub fn required<T>(
        &mut self,
        field: &'static str,
        value: Option<Option<T>>,
        message: &str,
    ) -> Option<T> {
        match value {
            Some(Some(v)) => Some(v),
            Some(None) => {
                self.add(field, message);
                None
            }
            None => {
                self.add(field, Self::REQUIRED);
                None
            }
        }
    }

    /// Checks the parsed `value` of an optional `field`.
    ///
    /// Both a missing field and the one failed to parse result in [`None`],
    /// recording the `message` in the latter case.
    pub fn optional<T>(
        &mut self,
        field: &'static str,
        value: Option<Option<T>>,
        message: &str,
    ) -> Option<T> {
        match value {
            Some(Some(v)) => Some(v),
            Some(None) => {
                self.add(field, message);
                None
            }
            None => None,
        }
    }

    /// Returns the `value` if no invalid fields have been recorded.
    ///
    /// # Errors
    ///
    /// If any invalid field has been recorded.
    pub fn or_value<T>(self, value: T) -> Result<T, Error> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self.into())
        }
    }
}

impl From<FieldErrors> for Error {
    fn from(errors: FieldErrors) -> Self {
        Self {
            code: "INVALID_FIELDS",
            status_code: http::StatusCode::BAD_REQUEST,
            message: "Request contains invalid fields".to_owned(),
            fields: errors.0,
            backtrace: None,
        }
    }
}

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError + fmt::Display> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }

    fn as_error(&self) -> Error {
        let mut error = self.as_ref().as_error();
        error.backtrace = Some(self.trace().clone());
        error
    }
}

impl AsError for TypedHeaderRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(self))
    }
}

impl AsError for JsonRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(&self.body_text()))
    }
}

impl AsError for PathRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(&self.body_text()))
    }
}

impl AsError for QueryRejection {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request(&self.body_text()))
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse as _;

    use super::{Error, FieldErrors};

    async fn body(error: Error) -> (http::StatusCode, serde_json::Value) {
        let resp = error.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn collects_field_errors() {
        let mut errors = FieldErrors::default();

        assert_eq!(errors.required("name", Some(Some(1)), "bad"), Some(1));
        assert_eq!(errors.optional::<i32>("year", None, "bad"), None);
        assert!(errors.is_empty());

        assert_eq!(errors.required::<i32>("name", None, "bad"), None);
        assert_eq!(errors.optional::<i32>("year", Some(None), "bad"), None);
        assert!(!errors.is_empty());

        let error = Error::from(errors);
        assert_eq!(error.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(error.fields["name"], ["is required"]);
        assert_eq!(error.fields["year"], ["bad"]);
    }

    #[tokio::test]
    async fn renders_field_errors_as_map() {
        let mut errors = FieldErrors::default();
        errors.add("email", "must be a valid email");

        let (status, json) = body(errors.into()).await;

        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(
            json["error"],
            serde_json::json!({"email": ["must be a valid email"]}),
        );
    }

    #[tokio::test]
    async fn hides_internal_details() {
        let (status, json) =
            body(Error::internal(&"connection refused")).await;

        assert_eq!(status, http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "INTERNAL_SERVER_ERROR");
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn renders_message() {
        let (status, json) = body(Error::bad_request(&"broken JSON")).await;

        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "broken JSON");
    }
}
