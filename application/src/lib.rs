//! Application provides API for interacting with the [`Service`].

#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod api;
pub mod args;
pub mod config;
mod context;
pub mod error;

// Used in binary.
use axum_client_ip as _;
use refinery as _;
use tower_http as _;
use tracing_subscriber as _;

pub use self::{
    args::Args,
    config::Config,
    context::{Context, Session},
    error::{AsError, Error},
};

/// [`Service`] with filled infrastructure dependencies.
///
/// [`Service`]: service::Service
pub type Service = service::Service<service::infra::Postgres>;

#[cfg(test)]
mod tests {
    use axum::{body::Body, Extension};
    use service::infra::Postgres;
    use tower::ServiceExt as _;

    use crate::{api, config, Service};

    fn app() -> axum::Router {
        let postgres =
            Postgres::new(&config::Postgres::default().into()).unwrap();
        let service =
            Service::new(config::Service::default().into(), postgres);

        api::router().layer(Extension(service))
    }

    #[tokio::test]
    async fn requires_authorization() {
        let resp = app()
            .oneshot(
                http::Request::get("/api/cars")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_malformed_token() {
        let resp = app()
            .oneshot(
                http::Request::get("/api/companies")
                    .header(http::header::AUTHORIZATION, "Bearer nonsense")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn responds_not_found_on_unknown_route() {
        let resp = app()
            .oneshot(
                http::Request::get("/api/unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
    }
}
