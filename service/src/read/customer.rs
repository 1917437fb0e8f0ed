//! [`Customer`] read model definition.
//!
//! [`Customer`]: crate::domain::Customer

pub mod list {
    //! [`Customer`]s list definitions.

    use common::define_pagination;

    use crate::domain::{company, customer};
    #[cfg(doc)]
    use crate::domain::{Company, Customer};

    define_pagination!(Node, Filter);

    /// Node of a [`Page`], newest [`Customer`]s go first.
    pub type Node = customer::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug)]
    pub struct Filter {
        /// ID of the [`Company`] the listed [`Customer`]s belong to.
        pub company_id: company::Id,
    }
}
