//! [`Car`] read model definition.
//!
//! [`Car`]: crate::domain::Car

pub mod list {
    //! [`Car`]s list definitions.

    use common::define_pagination;

    use crate::domain::{car, company};
    #[cfg(doc)]
    use crate::domain::{Car, Company};

    define_pagination!(Node, Filter);

    /// Node of a [`Page`], newest [`Car`]s go first.
    pub type Node = car::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug)]
    pub struct Filter {
        /// ID of the [`Company`] the listed [`Car`]s belong to.
        pub company_id: company::Id,
    }
}
