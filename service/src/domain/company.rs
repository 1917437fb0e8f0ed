//! [`Company`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};

use crate::domain::user;
#[cfg(doc)]
use crate::domain::User;

use super::macros::is_trimmed_within;

/// Tenant boundary owning cars, customers, transactions and leases.
#[derive(Clone, Debug)]
pub struct Company {
    /// ID of this [`Company`].
    pub id: Id,

    /// Unique [`Name`] of this [`Company`].
    pub name: Name,

    /// [`Address`] of this [`Company`].
    pub address: Option<Address>,

    /// ID of the [`User`] owning this [`Company`].
    pub owner_id: user::Id,

    /// IDs of the [`User`]s being members of this [`Company`].
    ///
    /// Always contains the owner.
    pub member_ids: Vec<user::Id>,

    /// [`DateTime`] when this [`Company`] was created.
    pub created_at: CreationDateTime,
}

impl Company {
    /// Creates a new [`Company`] owned by the provided [`User`].
    #[must_use]
    pub fn new(
        name: Name,
        address: Option<Address>,
        owner_id: user::Id,
    ) -> Self {
        Self {
            id: Id::new(),
            name,
            address,
            owner_id,
            member_ids: vec![owner_id],
            created_at: DateTimeOf::now(),
        }
    }
}

define_id! {
    #[doc = "ID of a [`Company`]."]
    Id
}

define_text! {
    #[doc = "Name of a [`Company`]."]
    Name,
    check = |s| is_trimmed_within(s, 100),
}

define_text! {
    #[doc = "Postal address of a [`Company`]."]
    Address,
    check = |s| is_trimmed_within(s, 1024),
}

/// [`DateTime`] when a [`Company`] was created.
pub type CreationDateTime = DateTimeOf<(Company, unit::Creation)>;
