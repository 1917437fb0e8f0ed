//! [`Query`] collection related to the multiple [`Car`]s.

use std::collections::HashMap;

use common::operations::By;

use crate::{
    domain::{car, Car},
    read,
};
#[cfg(doc)]
use crate::{domain::Company, Query};

use super::DatabaseQuery;

/// Queries [`Car`]s by their [`car::Id`]s.
///
/// Missing [`Car`]s are omitted from the result.
pub type ByIds = DatabaseQuery<By<HashMap<car::Id, Car>, Vec<car::Id>>>;

/// Queries a list of a [`Company`]'s [`Car`]s.
pub type List =
    DatabaseQuery<By<read::car::list::Page, read::car::list::Selector>>;
