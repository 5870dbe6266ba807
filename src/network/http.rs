//! HTTP routes for creating sessions and reading their history.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::game::rules::RulesEngine;
use crate::game::session::{ColorPreference, Seats};
use crate::game::session_store::SessionStore;
use crate::HubError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub player1: String,
    #[serde(default)]
    pub player2: String,
    #[serde(default)]
    pub preferred_color: ColorPreference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedGame {
    pub id: String,
}

pub fn routes<E: RulesEngine>() -> Router<Arc<SessionStore<E>>> {
    Router::new()
        .route("/health", get(health))
        .route("/game", post(create_game::<E>))
        .route("/game/{id}", get(game_history::<E>))
}

async fn health() -> &'static str {
    "OK"
}

async fn create_game<E: RulesEngine>(
    State(store): State<Arc<SessionStore<E>>>,
    Json(request): Json<CreateGameRequest>,
) -> Result<Json<CreatedGame>, ApiError> {
    let seats = Seats::assign(
        request.player1,
        request.player2,
        request.preferred_color,
        rand::random::<bool>,
    );
    let id = store.create(seats).await?;
    Ok(Json(CreatedGame { id }))
}

async fn game_history<E: RulesEngine>(
    State(store): State<Arc<SessionStore<E>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(store.history(&id).await?))
}

#[derive(Debug)]
pub struct ApiError(HubError);

impl From<HubError> for ApiError {
    fn from(error: HubError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.0.should_log() {
            tracing::error!(error = %self.0, "HTTP request failed");
        }
        let body = serde_json::json!({ "message": self.0.user_friendly_message() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::game::session_store::SnapshotFile;
    use crate::tests::tally_engine::TallyEngine;

    async fn store_at(path: std::path::PathBuf) -> Arc<SessionStore<TallyEngine>> {
        Arc::new(
            SessionStore::load(Arc::new(TallyEngine::default()), SnapshotFile::new(path))
                .await
                .unwrap(),
        )
    }

    fn post_game(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/game")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_create_game_seats_preferred_colour() {
        let dir = TempDir::new().unwrap();
        let store = store_at(dir.path().join("games.json")).await;
        let app = routes().with_state(store.clone());

        let response = app
            .oneshot(post_game(serde_json::json!({
                "player1": "A",
                "player2": "B",
                "preferredColor": "w"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let created: CreatedGame = serde_json::from_value(json_body(response).await).unwrap();
        let handle = store.get(&created.id).unwrap();
        let session = handle.lock().await;
        assert_eq!(session.white, "A");
        assert_eq!(session.black, "B");
    }

    #[tokio::test]
    async fn test_create_game_rejects_unknown_colour() {
        let dir = TempDir::new().unwrap();
        let store = store_at(dir.path().join("games.json")).await;
        let app = routes().with_state(store.clone());

        let response = app
            .oneshot(post_game(serde_json::json!({
                "player1": "A",
                "player2": "B",
                "preferredColor": "green"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_create_game_reports_persistence_failure() {
        let dir = TempDir::new().unwrap();
        let store = store_at(dir.path().join("missing").join("games.json")).await;
        let app = routes().with_state(store.clone());

        let response = app
            .oneshot(post_game(serde_json::json!({ "player1": "A", "player2": "ai" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert!(body["message"].is_string());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_history_lists_boards_oldest_first() {
        let dir = TempDir::new().unwrap();
        let store = store_at(dir.path().join("games.json")).await;
        let id = store
            .create(Seats {
                white: "A".to_string(),
                black: "B".to_string(),
            })
            .await
            .unwrap();
        {
            let handle = store.get(&id).unwrap();
            let mut session = handle.lock().await;
            let next = store.engine().apply_move(&session.position, "w1").unwrap();
            store.advance(&mut session, next).await.unwrap();
        }
        let app = routes().with_state(store);

        let response = app.oneshot(get(&format!("/game/{}", id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!(["tally:", "tally:w1"])
        );
    }

    #[tokio::test]
    async fn test_history_of_unknown_game_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store_at(dir.path().join("games.json")).await;
        let app = routes().with_state(store);

        let response = app.oneshot(get("/game/nope")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "message": "Game not found" })
        );
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = TempDir::new().unwrap();
        let store = store_at(dir.path().join("games.json")).await;
        let app = routes().with_state(store);

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }
}
