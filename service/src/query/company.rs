//! [`Query`] collection related to a single [`Company`].

use common::operations::By;

#[cfg(doc)]
use crate::{domain::User, Query};
use crate::domain::{user, Company};

use super::DatabaseQuery;

/// Queries a [`Company`] owned by the [`User`] with the provided
/// [`user::Id`].
pub type ByOwner = DatabaseQuery<By<Option<Company>, user::Id>>;
