//! [`Query`] collection related to the multiple [`Customer`]s.

use std::collections::HashMap;

use common::operations::By;

use crate::{
    domain::{customer, Customer},
    read,
};
#[cfg(doc)]
use crate::{domain::Company, Query};

use super::DatabaseQuery;

/// Queries [`Customer`]s by their [`customer::Id`]s.
///
/// Missing [`Customer`]s are omitted from the result.
pub type ByIds =
    DatabaseQuery<By<HashMap<customer::Id, Customer>, Vec<customer::Id>>>;

/// Queries a list of a [`Company`]'s [`Customer`]s.
pub type List = DatabaseQuery<
    By<read::customer::list::Page, read::customer::list::Selector>,
>;
