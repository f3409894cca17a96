use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::handlers::{self, AppState};

/// Marketing pages served from the static directory under their own names.
pub const PAGES: [&str; 7] = [
    "index.html",
    "about.html",
    "services.html",
    "contact.html",
    "privacy.html",
    "terms.html",
    "thankyou.html",
];

/// Builds the full application router.
///
/// Anything not matched by a page or API route is looked up in the static
/// directory; paths that are not there get the home page (status 200).
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();
    let home = static_dir.join("index.html");

    let mut pages: Router<Arc<AppState>> =
        Router::new().route_service("/", ServeFile::new(&home));
    for page in PAGES {
        pages = pages.route_service(
            &format!("/{}", page),
            ServeFile::new(static_dir.join(page)),
        );
    }

    let api_routes = Router::new()
        .route("/submit", post(handlers::submit_form))
        .route("/api/submit", post(handlers::api_submit))
        .route("/api/calculate-emi", post(handlers::calculate_emi))
        .route("/admin/leads", get(handlers::list_leads))
        .layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(state.config.max_body_bytes)),
        );

    let assets = ServeDir::new(&static_dir).fallback(ServeFile::new(&home));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .merge(pages)
        .fallback_service(assets)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
