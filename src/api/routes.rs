use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{handlers, state::AppState};
use crate::domain::ConfigEntityKind;

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router: Router<AppState> = Router::new()
        .route("/health", get(handlers::health_handler))
        // Telemetry endpoints
        .route("/api/system/status", get(handlers::get_system_status))
        .route("/api/trades/recent", get(handlers::get_recent_trades))
        .route("/api/performance", get(handlers::get_performance));

    // Config endpoints, one collection per entity kind
    for kind in ConfigEntityKind::ALL {
        let path = format!("/api{}", kind.path());
        let collection = get(move |state: State<AppState>| handlers::list_records(state, kind));

        if kind.is_singleton() {
            router = router.route(
                &path,
                collection.put(move |state: State<AppState>, headers: HeaderMap, body: Bytes| {
                    handlers::upsert_record(state, headers, kind, body)
                }),
            );
        } else {
            router = router
                .route(
                    &path,
                    collection.post(
                        move |state: State<AppState>, headers: HeaderMap, body: Bytes| {
                            handlers::upsert_record(state, headers, kind, body)
                        },
                    ),
                )
                .route(
                    &format!("{}/:key", path),
                    get(move |state: State<AppState>, key: Path<String>| {
                        handlers::get_record(state, kind, key)
                    })
                    .put(
                        move |state: State<AppState>,
                              headers: HeaderMap,
                              key: Path<String>,
                              body: Bytes| {
                            handlers::replace_record(state, headers, kind, key, body)
                        },
                    ),
                );
        }
    }

    router
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(cors)
}
