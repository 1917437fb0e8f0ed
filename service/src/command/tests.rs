use std::{
    future::Future, num::NonZeroU32, pin::pin, str::FromStr as _,
    time::Duration,
};

use common::{
    operations::{By, Commit, Lock, Select, Transact, Update},
    Date, Money, Quantity,
};
use jsonwebtoken::DecodingKey;
use tokio::time;

use crate::{
    domain::{car, company, customer, user, Car, Company, Customer},
    infra::Memory,
    query, read, Config, Service,
};

use super::{
    create_car, record_lease, record_sale, sell_car, update_leasing, Command,
    CreateCar, CreateCompany, CreateCustomer, DeleteCar, RecordLease,
    RecordSale, SellCar, UpdateLeasing,
};

fn service() -> Service<Memory> {
    Service::new(
        Config {
            jwt_decoding_key: DecodingKey::from_secret(b"secret"),
        },
        Memory::new(),
    )
}

fn date(day: u8) -> Date {
    Date::from_calendar(2024, 1, day).unwrap()
}

fn qty(n: i32) -> Quantity {
    Quantity::new(n).unwrap()
}

async fn company(svc: &Service<Memory>, name: &str) -> Company {
    svc.execute(CreateCompany {
        initiator_id: user::Id::new(),
        name: company::Name::new(name).unwrap(),
        address: None,
    })
    .await
    .unwrap()
}

async fn car(svc: &Service<Memory>, owner: user::Id, total: i32) -> Car {
    svc.execute(CreateCar {
        initiator_id: owner,
        brand: Some(car::Brand::new("Toyota").unwrap()),
        model: Some(car::Model::new("Corolla").unwrap()),
        year: None,
        color: None,
        engine: None,
        more_info: None,
        total_available: qty(total),
    })
    .await
    .unwrap()
}

async fn customer(svc: &Service<Memory>, owner: user::Id) -> Customer {
    svc.execute(CreateCustomer {
        initiator_id: owner,
        name: customer::Name::new("Jane Doe").unwrap(),
        email: customer::Email::new("jane@example.com").unwrap(),
        phone: customer::Phone::new("+1 555 123 4567").unwrap(),
        address: customer::Address::new("1 Main St").unwrap(),
    })
    .await
    .unwrap()
}

async fn reload_car(svc: &Service<Memory>, id: car::Id) -> Option<Car> {
    svc.execute(query::car::ById::by(id)).await.unwrap()
}

async fn reload_customer(
    svc: &Service<Memory>,
    id: customer::Id,
) -> Option<Customer> {
    svc.execute(query::customer::ById::by(id)).await.unwrap()
}

/// Opens a transaction selling `n` units of the [`Car`] with the provided
/// `id` without committing it, so the row lock stays held.
async fn sell_uncommitted(
    svc: &Service<Memory>,
    id: car::Id,
    n: u32,
) -> Memory {
    let tx = svc.database().execute(Transact).await.unwrap();
    tx.execute(Lock(By::<Car, _>::new(id))).await.unwrap();
    let mut car = tx
        .execute(Select(By::<Option<Car>, _>::new(id)))
        .await
        .unwrap()
        .unwrap();
    car.stock.sell(NonZeroU32::new(n).unwrap()).unwrap();
    tx.execute(Update(car)).await.unwrap();
    tx
}

/// Awaits the provided `fut`, asserting it stays blocked until the provided
/// `tx` commits.
async fn after_commit<F: Future>(tx: Memory, fut: F) -> F::Output {
    let mut fut = pin!(fut);
    assert!(
        time::timeout(Duration::from_millis(50), &mut fut)
            .await
            .is_err(),
        "completed while the car row is locked",
    );

    tx.execute(Commit).await.unwrap();
    time::timeout(Duration::from_secs(1), fut).await.unwrap()
}

#[tokio::test]
async fn sells_leases_and_returns_car() {
    let svc = service();
    let acme = company(&svc, "Acme").await;
    let car = car(&svc, acme.owner_id, 5).await;
    let jane = customer(&svc, acme.owner_id).await;
    let march = |day| Date::from_calendar(2024, 3, day).unwrap();

    drop(
        svc.execute(RecordSale {
            initiator_id: acme.owner_id,
            customer_id: jane.id,
            car_id: car.id,
            amount: Money::from_str("15000.00").unwrap(),
            date: march(1),
        })
        .await
        .unwrap(),
    );
    let sold = reload_car(&svc, car.id).await.unwrap().stock;
    assert_eq!(sold.total_available(), qty(4));
    assert_eq!(sold.sold_count(), qty(1));
    let buyer = reload_customer(&svc, jane.id).await.unwrap();
    assert_eq!(buyer.purchases.count(), qty(1));

    let lease = svc
        .execute(RecordLease {
            initiator_id: acme.owner_id,
            customer_id: jane.id,
            car_id: car.id,
            start_date: march(1),
            end_date: march(5),
        })
        .await
        .unwrap();
    assert_eq!(lease.amount().to_string(), "100.00");
    let leased = reload_car(&svc, car.id).await.unwrap().stock;
    assert_eq!(leased.total_available(), qty(3));
    assert_eq!(leased.in_lease(), Some(qty(1)));

    let returned = svc
        .execute(UpdateLeasing {
            initiator_id: acme.owner_id,
            leasing_id: lease.id,
            start_date: None,
            end_date: None,
            returned: Some(true),
        })
        .await
        .unwrap();
    assert!(returned.is_returned());
    let back = reload_car(&svc, car.id).await.unwrap().stock;
    assert_eq!(back.total_available(), qty(4));
    assert_eq!(back.in_lease(), Some(Quantity::ZERO));
    assert_eq!(back.sold_count(), qty(1));
}

#[tokio::test]
async fn sells_and_leases_end_to_end() {
    let svc = service();
    let acme = company(&svc, "Acme").await;
    let car = car(&svc, acme.owner_id, 2).await;
    let jane = customer(&svc, acme.owner_id).await;

    let sale = svc
        .execute(RecordSale {
            initiator_id: acme.owner_id,
            customer_id: jane.id,
            car_id: car.id,
            amount: Money::from_cents(1_500_000),
            date: date(1),
        })
        .await
        .unwrap();
    assert_eq!(sale.company_id, acme.id);
    assert!(sale.receipt.to_string().starts_with("R-Nr-"));

    let lease = svc
        .execute(RecordLease {
            initiator_id: acme.owner_id,
            customer_id: jane.id,
            car_id: car.id,
            start_date: date(1),
            end_date: date(10),
        })
        .await
        .unwrap();
    assert_eq!(lease.amount(), Money::from_cents(20_000));

    let car = reload_car(&svc, car.id).await.unwrap();
    assert_eq!(car.stock.total_available(), Quantity::ZERO);
    assert_eq!(car.stock.sold_count(), qty(1));
    assert_eq!(car.stock.in_lease(), Some(qty(1)));
    assert!(!car.stock.in_stock());

    let jane = reload_customer(&svc, jane.id).await.unwrap();
    assert_eq!(jane.purchases.count(), qty(1));
    assert_eq!(jane.purchases.summary().to_string(), "Toyota Corolla");
    assert_eq!(jane.leases.count(), qty(1));
    assert_eq!(jane.leases.summary().to_string(), "Toyota Corolla");

    let err = svc
        .execute(RecordSale {
            initiator_id: acme.owner_id,
            customer_id: jane.id,
            car_id: car.id,
            amount: Money::from_cents(100),
            date: date(2),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        record_sale::ExecutionError::Stock {
            source: car::StockError::Insufficient { .. },
            ..
        },
    ));
}

#[tokio::test]
async fn insufficient_stock_persists_nothing() {
    let svc = service();
    let acme = company(&svc, "Acme").await;
    let car = car(&svc, acme.owner_id, 0).await;
    let jane = customer(&svc, acme.owner_id).await;

    let err = svc
        .execute(RecordLease {
            initiator_id: acme.owner_id,
            customer_id: jane.id,
            car_id: car.id,
            start_date: date(1),
            end_date: date(2),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        record_lease::ExecutionError::Stock { .. },
    ));

    let leasings = svc
        .database()
        .execute(Select(By::<read::leasing::list::Page, _>::new(
            read::leasing::list::Selector {
                arguments: read::leasing::list::Arguments::default(),
                filter: read::leasing::list::Filter {
                    company_id: acme.id,
                },
            },
        )))
        .await
        .unwrap();
    assert_eq!(leasings.total_count, 0);

    let jane = reload_customer(&svc, jane.id).await.unwrap();
    assert_eq!(jane.leases.count(), Quantity::ZERO);
    assert_eq!(reload_car(&svc, car.id).await.unwrap().stock.in_lease(), None);
}

#[tokio::test]
async fn rejects_reversed_lease_dates() {
    let svc = service();
    let acme = company(&svc, "Acme").await;
    let car = car(&svc, acme.owner_id, 1).await;
    let jane = customer(&svc, acme.owner_id).await;

    let err = svc
        .execute(RecordLease {
            initiator_id: acme.owner_id,
            customer_id: jane.id,
            car_id: car.id,
            start_date: date(5),
            end_date: date(4),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        record_lease::ExecutionError::InvalidDateRange { .. },
    ));
    assert_eq!(
        reload_car(&svc, car.id).await.unwrap().stock.total_available(),
        qty(1),
    );
}

#[tokio::test]
async fn concurrent_sales_never_oversell() {
    let svc = service();
    let acme = company(&svc, "Acme").await;
    let car = car(&svc, acme.owner_id, 5).await;

    let concurrent = sell_uncommitted(&svc, car.id, 3).await;
    let err = after_commit(
        concurrent,
        svc.execute(SellCar {
            initiator_id: acme.owner_id,
            car_id: car.id,
            quantity: NonZeroU32::new(3).unwrap(),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        sell_car::ExecutionError::Stock {
            source: car::StockError::Insufficient { .. },
            ..
        },
    ));

    let car = reload_car(&svc, car.id).await.unwrap();
    assert_eq!(car.stock.total_available(), qty(2));
    assert_eq!(car.stock.sold_count(), qty(1));
}

#[tokio::test]
async fn concurrent_sale_records_never_oversell() {
    let svc = service();
    let acme = company(&svc, "Acme").await;
    let car = car(&svc, acme.owner_id, 1).await;
    let jane = customer(&svc, acme.owner_id).await;

    let concurrent = sell_uncommitted(&svc, car.id, 1).await;
    let err = after_commit(
        concurrent,
        svc.execute(RecordSale {
            initiator_id: acme.owner_id,
            customer_id: jane.id,
            car_id: car.id,
            amount: Money::from_cents(1_500_000),
            date: date(1),
        }),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        record_sale::ExecutionError::Stock {
            source: car::StockError::Insufficient { .. },
            ..
        },
    ));

    let car = reload_car(&svc, car.id).await.unwrap();
    assert_eq!(car.stock.total_available(), Quantity::ZERO);
    assert_eq!(car.stock.sold_count(), qty(1));
    let jane = reload_customer(&svc, jane.id).await.unwrap();
    assert_eq!(jane.purchases.count(), Quantity::ZERO);
}

#[tokio::test]
async fn isolates_companies() {
    let svc = service();
    let acme = company(&svc, "Acme").await;
    let rival = company(&svc, "Rival").await;
    let car = car(&svc, acme.owner_id, 1).await;

    let err = svc
        .execute(SellCar {
            initiator_id: rival.owner_id,
            car_id: car.id,
            quantity: NonZeroU32::MIN,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        sell_car::ExecutionError::CarNotExists(id) if *id == car.id,
    ));

    let err = svc
        .execute(CreateCar {
            initiator_id: user::Id::new(),
            brand: None,
            model: None,
            year: None,
            color: None,
            engine: None,
            more_info: None,
            total_available: Quantity::ZERO,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        create_car::ExecutionError::NotCompanyOwner(_),
    ));
}

#[tokio::test]
async fn toggling_returned_restores_stock() {
    let svc = service();
    let acme = company(&svc, "Acme").await;
    let car = car(&svc, acme.owner_id, 1).await;
    let jane = customer(&svc, acme.owner_id).await;

    let lease = svc
        .execute(RecordLease {
            initiator_id: acme.owner_id,
            customer_id: jane.id,
            car_id: car.id,
            start_date: date(1),
            end_date: date(1),
        })
        .await
        .unwrap();
    let leased = reload_car(&svc, car.id).await.unwrap();

    let returned = svc
        .execute(UpdateLeasing {
            initiator_id: acme.owner_id,
            leasing_id: lease.id,
            start_date: None,
            end_date: Some(date(3)),
            returned: Some(true),
        })
        .await
        .unwrap();
    assert!(returned.is_returned());
    assert_eq!(returned.amount(), Money::from_cents(6_000));
    let back = reload_car(&svc, car.id).await.unwrap();
    assert_eq!(back.stock.total_available(), qty(1));
    assert_eq!(back.stock.in_lease(), Some(Quantity::ZERO));
    assert!(back.stock.in_stock());

    // Same flag again changes nothing.
    drop(
        svc.execute(UpdateLeasing {
            initiator_id: acme.owner_id,
            leasing_id: lease.id,
            start_date: None,
            end_date: None,
            returned: Some(true),
        })
        .await
        .unwrap(),
    );
    assert_eq!(
        reload_car(&svc, car.id).await.unwrap().stock,
        back.stock,
    );

    let active = svc
        .execute(UpdateLeasing {
            initiator_id: acme.owner_id,
            leasing_id: lease.id,
            start_date: None,
            end_date: None,
            returned: Some(false),
        })
        .await
        .unwrap();
    assert!(!active.is_returned());
    assert_eq!(reload_car(&svc, car.id).await.unwrap().stock, leased.stock);

    let err = svc
        .execute(UpdateLeasing {
            initiator_id: acme.owner_id,
            leasing_id: lease.id,
            start_date: Some(date(5)),
            end_date: None,
            returned: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        update_leasing::ExecutionError::InvalidDateRange { .. },
    ));
}

#[tokio::test]
async fn deleting_car_cascades() {
    let svc = service();
    let acme = company(&svc, "Acme").await;
    let car = car(&svc, acme.owner_id, 3).await;
    let jane = customer(&svc, acme.owner_id).await;

    let sale = svc
        .execute(RecordSale {
            initiator_id: acme.owner_id,
            customer_id: jane.id,
            car_id: car.id,
            amount: Money::from_cents(100),
            date: date(1),
        })
        .await
        .unwrap();

    drop(
        svc.execute(DeleteCar {
            initiator_id: acme.owner_id,
            car_id: car.id,
        })
        .await
        .unwrap(),
    );

    assert!(reload_car(&svc, car.id).await.is_none());
    let transactions = svc
        .database()
        .execute(Select(By::<read::transaction::list::Page, _>::new(
            read::transaction::list::Selector {
                arguments: read::transaction::list::Arguments::default(),
                filter: read::transaction::list::Filter {
                    company_id: acme.id,
                },
            },
        )))
        .await
        .unwrap();
    assert!(!transactions.items.contains(&sale.id));

    // Aggregates are an audit trail and survive the deletion.
    let jane = reload_customer(&svc, jane.id).await.unwrap();
    assert_eq!(jane.purchases.count(), qty(1));
}
