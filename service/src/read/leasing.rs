//! [`Leasing`] read model definition.
//!
//! [`Leasing`]: crate::domain::Leasing

pub mod list {
    //! [`Leasing`]s list definitions.

    use common::define_pagination;

    use crate::domain::{company, leasing};
    #[cfg(doc)]
    use crate::domain::{Company, Leasing};

    define_pagination!(Node, Filter);

    /// Node of a [`Page`], newest [`Leasing`]s go first.
    pub type Node = leasing::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug)]
    pub struct Filter {
        /// ID of the [`Company`] the listed [`Leasing`]s belong to.
        pub company_id: company::Id,
    }
}
