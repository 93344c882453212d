use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    auth::{
        dto::{CredentialsRequest, MessageResponse, TokenResponse},
        error::AuthError,
        repo_types::Account,
        services::with_deadline,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/getusers", get(list_users))
}

fn parse_body(
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<CredentialsRequest, AuthError> {
    payload.map(|Json(body)| body).map_err(|e| {
        warn!(error = %e, "malformed request body");
        AuthError::Validation("Invalid request payload".into())
    })
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AuthError> {
    let body = parse_body(payload)?;

    let id = with_deadline(
        state.config.request_timeout,
        state.auth.signup(&body.email, &body.password),
    )
    .await?;

    info!(account_id = %id, "account created");
    debug!(account_id = %id, email = %body.email, "signup email");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User created successfully".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AuthError> {
    let body = parse_body(payload)?;

    let token = with_deadline(
        state.config.request_timeout,
        state.auth.login(&body.email, &body.password),
    )
    .await?;

    info!("account logged in");
    debug!(email = %body.email, "login email");
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<Account>>, AuthError> {
    let accounts = with_deadline(state.config.request_timeout, state.auth.list_all()).await?;
    Ok(Json(accounts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn server() -> TestServer {
        TestServer::new(build_app(AppState::fake())).unwrap()
    }

    #[tokio::test]
    async fn signup_returns_created() {
        let server = server();

        let response = server
            .post("/api/signup")
            .json(&json!({ "email": "a@x.com", "password": "pw" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: MessageResponse = response.json();
        assert_eq!(body.message, "User created successfully");
    }

    #[tokio::test]
    async fn duplicate_signup_is_conflict() {
        let server = server();
        let payload = json!({ "email": "a@x.com", "password": "pw" });

        server.post("/api/signup").json(&payload).await;
        let response = server.post("/api/signup").json(&payload).await;

        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["error"], "User already exists");
    }

    #[tokio::test]
    async fn signup_with_empty_email_is_bad_request() {
        let response = server()
            .post("/api/signup")
            .json(&json!({ "email": "", "password": "pw" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let server = server();

        let response = server.post("/api/signup").text("invalid json").await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post("/api/login")
            .json(&json!({ "email": "a@x.com" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_returns_token_after_signup() {
        let server = server();
        let payload = json!({ "email": "a@x.com", "password": "pw" });
        server.post("/api/signup").json(&payload).await;

        let response = server.post("/api/login").json(&payload).await;

        response.assert_status_ok();
        let body: TokenResponse = response.json();
        assert!(!body.token.is_empty());
    }

    #[tokio::test]
    async fn login_failures_are_unauthorized_and_alike() {
        let server = server();
        server
            .post("/api/signup")
            .json(&json!({ "email": "a@x.com", "password": "pw" }))
            .await;

        let wrong_password = server
            .post("/api/login")
            .json(&json!({ "email": "a@x.com", "password": "wrong" }))
            .await;
        let unknown = server
            .post("/api/login")
            .json(&json!({ "email": "nobody@x.com", "password": "pw" }))
            .await;

        wrong_password.assert_status(StatusCode::UNAUTHORIZED);
        unknown.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.text(), unknown.text());
    }

    #[tokio::test]
    async fn getusers_never_exposes_hashes() {
        let server = server();

        let empty: Vec<Value> = server.get("/api/getusers").await.json();
        assert!(empty.is_empty());

        server
            .post("/api/signup")
            .json(&json!({ "email": "a@x.com", "password": "pw" }))
            .await;

        let response = server.get("/api/getusers").await;
        response.assert_status_ok();
        let users: Vec<Value> = response.json();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["email"], "a@x.com");
        assert!(users[0].get("password_hash").is_none());
        assert!(users[0].get("password").is_none());
    }
}
