//! [`Query`] collection related to the multiple [`Transaction`]s.

use std::collections::HashMap;

use common::operations::By;

use crate::{
    domain::{transaction, Transaction},
    read,
};
#[cfg(doc)]
use crate::{domain::Company, Query};

use super::DatabaseQuery;

/// Queries [`Transaction`]s by their [`transaction::Id`]s.
///
/// Missing [`Transaction`]s are omitted from the result.
pub type ByIds = DatabaseQuery<
    By<HashMap<transaction::Id, Transaction>, Vec<transaction::Id>>,
>;

/// Queries a list of a [`Company`]'s [`Transaction`]s.
pub type List = DatabaseQuery<
    By<read::transaction::list::Page, read::transaction::list::Selector>,
>;
