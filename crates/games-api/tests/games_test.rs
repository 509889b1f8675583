//! End-to-end tests through the full router, projecting published events
//! with the consumer dispatch to observe eventual consistency.

mod common;

use axum::http::StatusCode;
use games_catalog::application::projection::{ProjectionOutcome, apply_message};
use serde_json::json;
use uuid::Uuid;

use common::{build_test_app, empty_request, json_request, send};

#[tokio::test]
async fn test_health_reports_ok() {
    // Arrange
    let app = build_test_app();

    // Act
    let (status, _, json) = send(&app.router, empty_request("GET", "/health")).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "games-api");
}

#[tokio::test]
async fn test_correlation_id_flows_from_header_to_bus() {
    // Arrange
    let app = build_test_app();
    let correlation_id = Uuid::new_v4();
    let mut request = json_request(
        "POST",
        "/api/v1/games",
        &json!({
            "title": "Chrono Trigger",
            "price": 59.9,
            "launch_year": 1995,
            "developer": "Square",
            "genre": "RPG",
        }),
    );
    request.headers_mut().insert(
        "x-correlation-id",
        correlation_id.to_string().parse().unwrap(),
    );

    // Act
    let (status, headers, json) = send(&app.router, request).await;

    // Assert
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(headers["x-correlation-id"], correlation_id.to_string().as_str());
    assert_eq!(json["correlation_id"], correlation_id.to_string());
    let published = app.publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].correlation_id, correlation_id);
    assert_eq!(published[0].subject, "Created");
}

#[tokio::test]
async fn test_created_game_becomes_visible_once_projected() {
    // Arrange
    let app = build_test_app();
    let (_, _, created) = send(
        &app.router,
        json_request(
            "POST",
            "/api/v1/games",
            &json!({
                "title": "Chrono Trigger",
                "price": 59.9,
                "launch_year": 1995,
                "developer": "Square",
                "genre": "rpg",
            }),
        ),
    )
    .await;
    let game_id = created["game_id"].as_str().unwrap().to_owned();
    let uri = format!("/api/v1/games/{game_id}");

    let (before, _, _) = send(&app.router, empty_request("GET", &uri)).await;

    // Act
    for message in app.publisher.published() {
        let outcome = apply_message(&message, app.read_store.as_ref()).await.unwrap();
        assert_eq!(outcome, ProjectionOutcome::Applied);
    }
    let (after, _, json) = send(&app.router, empty_request("GET", &uri)).await;

    // Assert
    assert_eq!(before, StatusCode::NOT_FOUND);
    assert_eq!(after, StatusCode::OK);
    assert_eq!(json["title"], "Chrono Trigger");
    assert_eq!(json["version"], 0);
}

#[tokio::test]
async fn test_unknown_route_id_is_rejected() {
    let app = build_test_app();

    let (status, _, _) = send(&app.router, empty_request("GET", "/api/v1/games/not-a-uuid")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
