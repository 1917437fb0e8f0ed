//! [`Transaction`] definitions.

use std::sync::LazyLock;

#[cfg(doc)]
use common::DateTime;
use common::{unit, Date, DateTimeOf, Money};
use rand::Rng as _;
use regex::Regex;

#[cfg(doc)]
use crate::domain::{Car, Customer};
use crate::domain::{car, company, customer};

/// Sale of a single [`Car`] unit to a [`Customer`].
#[derive(Clone, Debug)]
pub struct Transaction {
    /// ID of this [`Transaction`].
    pub id: Id,

    /// ID of the [`Company`] this [`Transaction`] belongs to.
    ///
    /// [`Company`]: crate::domain::Company
    pub company_id: company::Id,

    /// ID of the [`Customer`] who bought the [`Car`].
    pub customer_id: customer::Id,

    /// ID of the sold [`Car`].
    pub car_id: car::Id,

    /// Sale price.
    pub amount: Money,

    /// [`Date`] of the sale.
    pub date: Date,

    /// [`Receipt`] number of this [`Transaction`].
    ///
    /// Never changes once the [`Transaction`] is recorded.
    pub receipt: Receipt,

    /// [`DateTime`] when this [`Transaction`] was recorded.
    pub created_at: CreationDateTime,
}

define_id! {
    #[doc = "ID of a [`Transaction`]."]
    Id
}

define_text! {
    #[doc = "Receipt number of a [`Transaction`] in the `R-Nr-NNNNNN` format."]
    Receipt,
    check = |s| {
        /// Regular expression checking [`Receipt`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^R-Nr-[0-9]{6}$").expect("valid regex")
        });

        REGEX.is_match(s)
    },
}

impl Receipt {
    /// Generates a new random [`Receipt`].
    ///
    /// Uniqueness is not guaranteed here, the storage rejects duplicates.
    #[must_use]
    pub fn generate() -> Self {
        let n = rand::rng().random_range(0..1_000_000);

        #[expect(unsafe_code, reason = "invariants are preserved")]
        let receipt = unsafe { Self::new_unchecked(format!("R-Nr-{n:06}")) };
        receipt
    }
}

/// [`DateTime`] when a [`Transaction`] was recorded.
pub type CreationDateTime = DateTimeOf<(Transaction, unit::Creation)>;

#[cfg(test)]
mod tests {
    use super::Receipt;

    #[test]
    fn generates_valid_receipts() {
        for _ in 0..100 {
            let receipt = Receipt::generate().to_string();
            assert!(Receipt::new(receipt.as_str()).is_some(), "{receipt}");
            assert_eq!(receipt.len(), 11);
        }
    }

    #[test]
    fn validates_format() {
        assert!(Receipt::new("R-Nr-000042").is_some());
        assert!(Receipt::new("R-Nr-42").is_none());
        assert!(Receipt::new("R-Nr-1234567").is_none());
        assert!(Receipt::new("r-nr-123456").is_none());
        assert!(Receipt::new(" R-Nr-123456").is_none());
        assert!(Receipt::new("R-Nr-١٢٣٤٥٦").is_none());
    }
}
