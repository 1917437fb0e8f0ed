//! Domain definitions.

#[macro_use]
mod macros;

pub mod car;
pub mod company;
pub mod customer;
pub mod leasing;
pub mod transaction;
pub mod user;

pub use self::{
    car::Car, company::Company, customer::Customer, leasing::Leasing,
    transaction::Transaction, user::User,
};
