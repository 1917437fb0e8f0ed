//! [`Transaction`] read model definition.
//!
//! [`Transaction`]: crate::domain::Transaction

pub mod list {
    //! [`Transaction`]s list definitions.

    use common::define_pagination;

    use crate::domain::{company, transaction};
    #[cfg(doc)]
    use crate::domain::{Company, Transaction};

    define_pagination!(Node, Filter);

    /// Node of a [`Page`], newest [`Transaction`]s go first.
    pub type Node = transaction::Id;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug)]
    pub struct Filter {
        /// ID of the [`Company`] the listed [`Transaction`]s belong to.
        pub company_id: company::Id,
    }
}
