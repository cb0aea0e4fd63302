//! The hosted-backend adapters against a mock HTTP server.

use std::sync::Arc;

use futures::StreamExt;
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
use uuid::Uuid;

use partner_core::domain::error::{AuthError, DataError};
use partner_core::domain::events::AuthEvent;
use partner_core::domain::ports::{AuthBackend, BusinessesTable, Geocoder, ReservationsTable};
use partner_core::infra::backend::RestBackend;
use partner_core::infra::geocoding::MapboxGeocoder;
use partner_core::infra::http::TracedClient;
use partner_core::model::{BusinessVertical, GeoPoint, ReservationStatus};

const ANON: &str = "anon-key";
const USER_ID: &str = "0b7a2f7e-8c1f-4f57-a2c3-38f3c3f3d6a1";

fn backend(server: &MockServer) -> Arc<RestBackend> {
    RestBackend::new(
        TracedClient::default(),
        Url::parse(&server.base_url()).unwrap(),
        ANON,
    )
}

fn grant(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "user": {
            "id": USER_ID,
            "email": "owner@example.com",
            "user_metadata": { "name": "Iva" }
        }
    })
}

async fn signed_in(server: &MockServer, access: &str, refresh: &str) -> Arc<RestBackend> {
    let token = server.mock(|when, then| {
        when.method(POST)
            .path("/auth/v1/token")
            .query_param("grant_type", "password")
            .header("apikey", ANON);
        then.status(200).json_body(grant(access, refresh));
    });
    let backend = backend(server);
    backend
        .sign_in("owner@example.com", "secret123")
        .await
        .unwrap();
    token.assert();
    backend
}

#[tokio::test]
async fn sign_in_adopts_the_session_and_announces_it() {
    let server = MockServer::start();
    let backend = backend(&server);
    let mut events = backend.auth_events();
    server.mock(|when, then| {
        when.method(POST)
            .path("/auth/v1/token")
            .query_param("grant_type", "password");
        then.status(200).json_body(grant("tok-1", "ref-1"));
    });

    let session = backend
        .sign_in("owner@example.com", "secret123")
        .await
        .unwrap();

    assert_eq!(session.user_id.to_string(), USER_ID);
    assert_eq!(session.display_name(), Some("Iva"));
    assert_eq!(backend.current_session().await, Some(session.clone()));
    assert_eq!(events.next().await, Some(AuthEvent::SignedIn(session)));
}

#[tokio::test]
async fn auth_failures_map_onto_the_taxonomy() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/auth/v1/token");
        then.status(400)
            .json_body(json!({ "error_code": "invalid_credentials", "msg": "Invalid login credentials" }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/auth/v1/signup");
        then.status(422)
            .json_body(json!({ "error_code": "user_already_exists", "msg": "User already registered" }));
    });
    let backend = backend(&server);

    let sign_in = backend.sign_in("owner@example.com", "wrong-pass").await;
    assert_eq!(sign_in, Err(AuthError::InvalidCredentials));

    let sign_up = backend
        .sign_up("owner@example.com", "secret123", "Iva")
        .await;
    assert_eq!(
        sign_up,
        Err(AuthError::DuplicateAccount {
            email: "owner@example.com".to_string()
        })
    );
    assert_eq!(backend.current_session().await, None);
}

#[tokio::test]
async fn pending_confirmation_sign_up_returns_the_bare_user() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/auth/v1/signup");
        then.status(200).json_body(json!({
            "id": USER_ID,
            "email": "new@example.com",
            "user_metadata": { "name": "Marko" }
        }));
    });
    let backend = backend(&server);

    let created = backend
        .sign_up("new@example.com", "secret123", "Marko")
        .await
        .unwrap();

    assert_eq!(created.email, "new@example.com");
    assert_eq!(backend.current_session().await, None);
}

#[tokio::test]
async fn reset_password_passes_the_redirect() {
    let server = MockServer::start();
    let recover = server.mock(|when, then| {
        when.method(POST)
            .path("/auth/v1/recover")
            .query_param("redirect_to", "partnerapp://reset-password");
        then.status(200).json_body(json!({}));
    });
    let backend = backend(&server);

    backend
        .reset_password("owner@example.com", "partnerapp://reset-password")
        .await
        .unwrap();

    recover.assert();
}

#[tokio::test]
async fn sign_out_forgets_tokens_even_when_the_server_fails() {
    let server = MockServer::start();
    let backend = signed_in(&server, "tok-1", "ref-1").await;
    let mut events = backend.auth_events();
    server.mock(|when, then| {
        when.method(POST).path("/auth/v1/logout");
        then.status(500).body("boom");
    });

    let result = backend.sign_out().await;

    assert!(matches!(result, Err(AuthError::Network(_))));
    assert_eq!(backend.current_session().await, None);
    assert_eq!(events.next().await, Some(AuthEvent::SignedOut));
}

#[tokio::test]
async fn profile_lookup_sends_user_token_and_maps_the_row() {
    let server = MockServer::start();
    let backend = signed_in(&server, "tok-1", "ref-1").await;
    let business_id = Uuid::new_v4();
    let lookup = server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/businesses")
            .query_param("user_id", format!("eq.{USER_ID}"))
            .query_param("type", "eq.accommodation")
            .header("authorization", "Bearer tok-1")
            .header("accept", "application/vnd.pgrst.object+json");
        then.status(200).json_body(json!({
            "id": business_id,
            "user_id": USER_ID,
            "type": "accommodation",
            "name": "Vila Maslina",
            "address": "Obala 3",
            "phone_number": "0912345678",
            "num_rooms": 8,
            "location": "SRID=4326;POINT(15.2 45.1)"
        }));
    });

    let profile = backend
        .find_for_user(USER_ID.parse().unwrap(), BusinessVertical::Accommodation)
        .await
        .unwrap()
        .unwrap();

    lookup.assert();
    assert_eq!(profile.id, business_id);
    assert_eq!(profile.details.num_rooms(), Some(8));
    assert_eq!(profile.location, Some(GeoPoint { lat: 45.1, lng: 15.2 }));
}

#[tokio::test]
async fn no_rows_is_an_absent_profile() {
    let server = MockServer::start();
    let backend = signed_in(&server, "tok-1", "ref-1").await;
    server.mock(|when, then| {
        when.method(GET).path("/rest/v1/businesses");
        then.status(406).json_body(json!({
            "code": "PGRST116",
            "details": "The result contains 0 rows",
            "message": "JSON object requested, multiple (or no) rows returned"
        }));
    });

    let found = backend
        .find_for_user(USER_ID.parse().unwrap(), BusinessVertical::Fitness)
        .await;

    assert_eq!(found, Ok(None));
}

#[tokio::test]
async fn rejected_token_is_refreshed_once() {
    let server = MockServer::start();
    let backend = signed_in(&server, "stale", "ref-1").await;
    let mut events = backend.auth_events();
    let business_id = Uuid::new_v4();

    let rejected = server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/reservations")
            .header("authorization", "Bearer stale");
        then.status(401).json_body(json!({ "message": "JWT expired" }));
    });
    let refresh = server.mock(|when, then| {
        when.method(POST)
            .path("/auth/v1/token")
            .query_param("grant_type", "refresh_token");
        then.status(200).json_body(grant("fresh", "ref-2"));
    });
    let accepted = server.mock(|when, then| {
        when.method(GET)
            .path("/rest/v1/reservations")
            .query_param("business_id", format!("eq.{business_id}"))
            .query_param("order", "reservation_date.asc")
            .header("authorization", "Bearer fresh");
        then.status(200).json_body(json!([
            {
                "id": Uuid::new_v4(),
                "business_id": business_id,
                "status": "pending",
                "client_name": "Ana",
                "reservation_date": "2024-06-10",
                "reservation_time": "19:30:00"
            },
            {
                "id": Uuid::new_v4(),
                "business_id": business_id,
                "status": "pending",
                "client_name": "No date"
            },
            {
                "id": Uuid::new_v4(),
                "business_id": business_id,
                "status": "cancelled",
                "client_name": "Marko",
                "reservation_date": "2024-06-11"
            }
        ]));
    });

    let items = backend
        .list_for_business(business_id, BusinessVertical::Restaurant)
        .await
        .unwrap();

    rejected.assert();
    refresh.assert();
    accepted.assert();
    // the row without a date is skipped
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].status, ReservationStatus::Canceled);
    assert!(matches!(
        events.next().await,
        Some(AuthEvent::TokenRefreshed(_))
    ));
}

#[tokio::test]
async fn failed_refresh_signs_out() {
    let server = MockServer::start();
    let backend = signed_in(&server, "stale", "ref-1").await;
    server.mock(|when, then| {
        when.method(GET).path("/rest/v1/reservations");
        then.status(401).json_body(json!({ "message": "JWT expired" }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/auth/v1/token")
            .query_param("grant_type", "refresh_token");
        then.status(400)
            .json_body(json!({ "error": "invalid_grant", "error_description": "Refresh token revoked" }));
    });

    let result = backend
        .list_for_business(Uuid::new_v4(), BusinessVertical::Fitness)
        .await;

    assert!(matches!(result, Err(DataError::Network(_))));
    assert_eq!(backend.current_session().await, None);
}

#[tokio::test]
async fn status_update_patches_one_row() {
    let server = MockServer::start();
    let backend = signed_in(&server, "tok-1", "ref-1").await;
    let id = Uuid::new_v4();
    let patch = server.mock(|when, then| {
        when.method(PATCH)
            .path("/rest/v1/reservations")
            .query_param("id", format!("eq.{id}"))
            .header("prefer", "return=representation")
            .json_body(json!({ "status": "confirmed" }));
        then.status(200).json_body(json!([{ "id": id }]));
    });

    backend
        .update_status(id, ReservationStatus::Confirmed)
        .await
        .unwrap();

    patch.assert();
}

#[tokio::test]
async fn status_update_of_an_unknown_reservation_is_not_found() {
    let server = MockServer::start();
    let backend = signed_in(&server, "tok-1", "ref-1").await;
    let id = Uuid::new_v4();
    let patch = server.mock(|when, then| {
        when.method(PATCH)
            .path("/rest/v1/reservations")
            .query_param("id", format!("eq.{id}"));
        then.status(200).json_body(json!([]));
    });

    let result = backend
        .update_status(id, ReservationStatus::Canceled)
        .await;

    patch.assert();
    assert_eq!(
        result,
        Err(DataError::NotFound {
            entity: "reservation",
            id
        })
    );
}

#[tokio::test]
async fn mapbox_returns_the_first_place_name() {
    let server = MockServer::start();
    let reverse = server.mock(|when, then| {
        when.method(GET)
            .path("/geocoding/v5/mapbox.places/15.55,45.49.json")
            .query_param("access_token", "pk.test");
        then.status(200).json_body(json!({
            "features": [
                { "place_name": "Karlovac, Karlovac County, Croatia" },
                { "place_name": "Croatia" }
            ]
        }));
    });
    let base = Url::parse(&format!(
        "{}/geocoding/v5/mapbox.places",
        server.base_url()
    ))
    .unwrap();
    let geocoder = MapboxGeocoder::new(TracedClient::default(), base, "pk.test");

    let name = geocoder
        .reverse(GeoPoint {
            lat: 45.49,
            lng: 15.55,
        })
        .await
        .unwrap();

    reverse.assert();
    assert_eq!(name.as_deref(), Some("Karlovac, Karlovac County, Croatia"));
}

#[tokio::test]
async fn mapbox_without_token_stays_offline() {
    let geocoder = MapboxGeocoder::new(
        TracedClient::default(),
        Url::parse("http://127.0.0.1:9/unused").unwrap(),
        "",
    );

    let name = geocoder
        .reverse(GeoPoint { lat: 45.1, lng: 15.2 })
        .await
        .unwrap();

    assert_eq!(name, None);
}
