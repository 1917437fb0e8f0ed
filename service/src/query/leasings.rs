//! [`Query`] collection related to the multiple [`Leasing`]s.

use std::collections::HashMap;

use common::operations::By;

use crate::{
    domain::{leasing, Leasing},
    read,
};
#[cfg(doc)]
use crate::{domain::Company, Query};

use super::DatabaseQuery;

/// Queries [`Leasing`]s by their [`leasing::Id`]s.
///
/// Missing [`Leasing`]s are omitted from the result.
pub type ByIds =
    DatabaseQuery<By<HashMap<leasing::Id, Leasing>, Vec<leasing::Id>>>;

/// Queries a list of a [`Company`]'s [`Leasing`]s.
pub type List =
    DatabaseQuery<By<read::leasing::list::Page, read::leasing::list::Selector>>;
