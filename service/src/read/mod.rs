//! Read entities definitions.

pub mod car;
pub mod customer;
pub mod leasing;
pub mod transaction;
