//! [`User`] definitions.

pub mod session;

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};

use super::macros::is_trimmed_within;

pub use self::session::Session;

/// Platform user, acting on behalf of a [`Company`] it owns.
///
/// [`User`]s are provisioned by an external identity provider, this service
/// only resolves them.
///
/// [`Company`]: crate::domain::Company
#[derive(Clone, Debug)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`Name`] of this [`User`].
    pub name: Name,

    /// [`DateTime`] when this [`User`] was created.
    pub created_at: CreationDateTime,
}

define_id! {
    #[doc = "ID of a [`User`]."]
    Id
}

define_text! {
    #[doc = "Name of a [`User`]."]
    Name,
    check = |s| is_trimmed_within(s, 150),
}

/// [`DateTime`] when a [`User`] was created.
pub type CreationDateTime = DateTimeOf<(User, unit::Creation)>;
