use axum::routing::{get, post, put};
use axum::Router;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{self, attendees, auth, events};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let event_routes = Router::new()
        .route("/create", post(events::create_event))
        .route("/my-events", get(events::list_my_events))
        .route(
            "/:id",
            get(events::get_event_by_slug)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/:id/duplicate", post(events::duplicate_event))
        .route("/:id/attendees", get(events::list_attendees))
        .route("/:id/export-csv", get(events::export_attendees_csv))
        .route(
            "/:id/attendees/:attendee_id",
            put(events::update_attendee).delete(events::delete_attendee),
        );

    // RSVP creation is the abuse magnet, so it alone carries the
    // per-client quota.
    let mut rsvp_route = Router::new().route("/rsvp", post(attendees::create_rsvp));
    if state.config.rate_limit_enabled {
        let governor_conf = Box::new(
            GovernorConfigBuilder::default()
                .per_second(state.config.rsvp_rate_per_second)
                .burst_size(state.config.rsvp_burst)
                .finish()
                .expect("invalid rate-limit configuration"),
        );
        rsvp_route = rsvp_route.route_layer(GovernorLayer {
            config: Box::leak(governor_conf),
        });
    }

    let attendee_routes = rsvp_route
        .route("/find", get(attendees::find_attendee))
        .route("/modify", put(attendees::modify_rsvp))
        .route("/cancel", post(attendees::cancel_rsvp));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/events", event_routes)
        .nest("/api/attendees", attendee_routes)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
