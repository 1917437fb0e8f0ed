//! [`Command`] definition.

pub mod authorize_user_session;
pub mod create_car;
pub mod create_company;
pub mod create_customer;
pub mod delete_car;
pub mod delete_customer;
pub mod delete_leasing;
pub mod delete_transaction;
pub mod lease_car;
pub mod record_lease;
pub mod record_sale;
pub mod sell_car;
pub mod update_car;
pub mod update_company;
pub mod update_customer;
pub mod update_leasing;
pub mod update_transaction;

#[cfg(test)]
mod tests;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession, create_car::CreateCar,
    create_company::CreateCompany, create_customer::CreateCustomer,
    delete_car::DeleteCar, delete_customer::DeleteCustomer,
    delete_leasing::DeleteLeasing, delete_transaction::DeleteTransaction,
    lease_car::LeaseCar, record_lease::RecordLease, record_sale::RecordSale,
    sell_car::SellCar, update_car::UpdateCar, update_company::UpdateCompany,
    update_customer::UpdateCustomer, update_leasing::UpdateLeasing,
    update_transaction::UpdateTransaction,
};
