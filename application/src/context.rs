//! [`Context`]-related definitions.

use axum::{async_trait, extract::FromRequestParts, RequestPartsExt as _};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use common::DateTime;
use service::{
    command::{self, Command as _},
    domain::user::{self, session},
};

use crate::{define_error, AsError, Error, Service};

/// Context of an authenticated request.
///
/// Extracting it rejects the request with `401 Unauthorized` unless a valid
/// bearer token is provided.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// Current [`Session`].
    session: Session,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub const fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the current [`Session`] of this [`Context`].
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Returns ID of the [`user::User`] performing the request.
    #[must_use]
    pub const fn user_id(&self) -> user::Id {
        self.session.user_id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Service` extension"))?;

        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|e| {
                if e.is_missing() {
                    AuthError::AuthorizationRequired.into()
                } else {
                    e.into_error()
                }
            })?;

        #[expect(unsafe_code, reason = "specified in correct header")]
        let token =
            unsafe { session::Token::new_unchecked(bearer.token().to_owned()) };
        let session = service
            .execute(command::AuthorizeUserSession {
                token: token.clone(),
            })
            .await
            .map(|s| Session {
                user_id: s.user_id,
                token,
                expires_at: s.expires_at.coerce(),
            })
            .map_err(AsError::into_error)?;

        Ok(Self { service, session })
    }
}

/// User session.
#[derive(Clone, Debug)]
pub struct Session {
    /// ID of the [`user::User`] associated with this [`Session`].
    pub user_id: user::Id,

    /// Authentication token.
    pub token: session::Token,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: DateTime,
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::InvalidToken(_) => Some(AuthError::InvalidToken.into()),
            Self::UserNotExists(_) => Some(AuthError::UnknownUser.into()),
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,

        #[code = "INVALID_TOKEN"]
        #[status = UNAUTHORIZED]
        #[message = "Invalid or expired authorization token"]
        InvalidToken,

        #[code = "UNKNOWN_USER"]
        #[status = UNAUTHORIZED]
        #[message = "Token belongs to an unknown user"]
        UnknownUser,
    }
}
