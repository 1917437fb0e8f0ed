//! [`Query`] collection related to a single [`Leasing`].

use common::operations::By;

use crate::domain::{leasing, Leasing};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Leasing`] by its [`leasing::Id`].
pub type ById = DatabaseQuery<By<Option<Leasing>, leasing::Id>>;
