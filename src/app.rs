use std::net::SocketAddr;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;
use crate::{admin, auth, reports};

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(reports::router())
                .merge(admin::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use time::{Duration, OffsetDateTime};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::{
        jwt::JwtKeys,
        repo_types::{NewUser, Role},
    };
    use crate::clock::{Clock, ManualClock};

    struct Harness {
        app: Router,
        state: AppState,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new(OffsetDateTime::now_utc()));
        let state = AppState::fake(clock.clone());
        Harness {
            app: build_app(state.clone()),
            state,
            clock,
        }
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn anonymous(app: &Router, city: &str) -> (String, String) {
        let (status, body) = call(
            app,
            "POST",
            "/api/auth/anonymous",
            None,
            Some(json!({ "city": city })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn staff(h: &Harness, role: Role) -> (String, String) {
        let user = h
            .state
            .store
            .create_user(
                NewUser {
                    role,
                    email: None,
                    password_hash: None,
                    city: "Warszawa".into(),
                },
                h.clock.now(),
            )
            .await
            .unwrap();
        let token = JwtKeys::from_ref(&h.state).sign(&user).unwrap();
        (token, user.id.to_string())
    }

    fn metro_centrum() -> Value {
        json!({
            "type": "policja",
            "location": "Metro Centrum",
            "lat": 52.2297,
            "lng": 21.0122
        })
    }

    #[tokio::test]
    async fn health_is_ok() {
        let h = harness();
        let (status, body) = call(&h.app, "GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn warszawa_report_lifecycle() {
        let h = harness();
        let (token_a, id_a) = anonymous(&h.app, "Warszawa").await;
        let (token_b, _) = anonymous(&h.app, "Warszawa").await;

        let (status, body) =
            call(&h.app, "POST", "/api/reports", Some(&token_a), Some(metro_centrum())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["report"]["confirmationCount"], 0);
        assert_eq!(body["report"]["city"], "Warszawa");
        assert_eq!(body["report"]["type"], "policja");
        let report_id = body["report"]["id"].as_str().unwrap().to_string();

        let confirm = format!("/api/reports/{report_id}/confirm");
        let (status, _) = call(&h.app, "POST", &confirm, Some(&token_b), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&h.app, "POST", &confirm, Some(&token_b), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, me) = call(&h.app, "GET", "/api/auth/me", Some(&token_a), None).await;
        assert_eq!(me["user"]["id"], id_a.as_str());
        assert_eq!(me["user"]["rating"], 1);

        let (status, body) = call(
            &h.app,
            "GET",
            "/api/reports?city=Warszawa&sinceMinutes=60",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reports"][0]["confirmationCount"], 1);

        h.clock.advance(Duration::minutes(61));
        let (_, body) = call(
            &h.app,
            "GET",
            "/api/reports?city=Warszawa&sinceMinutes=60",
            None,
            None,
        )
        .await;
        assert_eq!(body["reports"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn listing_defaults_to_the_callers_city() {
        let h = harness();
        let (token, _) = anonymous(&h.app, "Gdańsk").await;
        call(&h.app, "POST", "/api/reports", Some(&token), Some(metro_centrum())).await;

        let (status, body) = call(&h.app, "GET", "/api/reports", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reports"].as_array().unwrap().len(), 1);

        let (status, _) = call(&h.app, "GET", "/api/reports", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_nearby_report_is_429() {
        let h = harness();
        let (token_a, _) = anonymous(&h.app, "Warszawa").await;
        let (token_b, _) = anonymous(&h.app, "Warszawa").await;

        let (status, _) =
            call(&h.app, "POST", "/api/reports", Some(&token_a), Some(metro_centrum())).await;
        assert_eq!(status, StatusCode::CREATED);

        let mut nearby = metro_centrum();
        nearby["lat"] = json!(52.2300);
        let (status, _) = call(&h.app, "POST", "/api/reports", Some(&token_b), Some(nearby)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn malformed_report_body_is_400() {
        let h = harness();
        let (token, _) = anonymous(&h.app, "Warszawa").await;
        let (status, _) = call(
            &h.app,
            "POST",
            "/api/reports",
            Some(&token),
            Some(json!({ "type": "straz", "location": "x", "lat": 1.0, "lng": 2.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &h.app,
            "POST",
            "/api/reports",
            Some(&token),
            Some(json!({ "type": "kontrola", "location": "x", "lat": "north", "lng": 2.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn banned_token_cannot_mutate() {
        let h = harness();
        let (token, id) = anonymous(&h.app, "Warszawa").await;
        let id = id.parse().unwrap();
        h.state.store.set_banned(id, true).await.unwrap();

        let (status, _) =
            call(&h.app, "POST", "/api/reports", Some(&token), Some(metro_centrum())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&h.app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn banned_token_cannot_confirm() {
        let h = harness();
        let (token_a, _) = anonymous(&h.app, "Warszawa").await;
        let (token_b, id_b) = anonymous(&h.app, "Warszawa").await;
        let (_, body) =
            call(&h.app, "POST", "/api/reports", Some(&token_a), Some(metro_centrum())).await;
        let report_id = body["report"]["id"].as_str().unwrap().to_string();

        h.state.store.set_banned(id_b.parse().unwrap(), true).await.unwrap();
        let confirm = format!("/api/reports/{report_id}/confirm");
        let (status, _) = call(&h.app, "POST", &confirm, Some(&token_b), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, me) = call(&h.app, "GET", "/api/auth/me", Some(&token_a), None).await;
        assert_eq!(me["user"]["rating"], 0);
    }

    #[tokio::test]
    async fn banned_moderator_cannot_moderate() {
        let h = harness();
        let (token_mod, id_mod) = staff(&h, Role::Moderator).await;
        let (token_a, id_a) = anonymous(&h.app, "Warszawa").await;
        let (_, body) =
            call(&h.app, "POST", "/api/reports", Some(&token_a), Some(metro_centrum())).await;
        let report_id = body["report"]["id"].as_str().unwrap().to_string();

        h.state.store.set_banned(id_mod.parse().unwrap(), true).await.unwrap();

        let uri = format!("/api/admin/reports/{report_id}");
        let (status, _) = call(&h.app, "DELETE", &uri, Some(&token_mod), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let uri = format!("/api/admin/users/{id_a}/ban");
        let (status, _) = call(
            &h.app,
            "POST",
            &uri,
            Some(&token_mod),
            Some(json!({ "banned": true })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&h.app, "GET", "/api/admin/overview", Some(&token_mod), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, body) = call(&h.app, "GET", "/api/reports", Some(&token_a), None).await;
        assert_eq!(body["reports"].as_array().unwrap().len(), 1);
        let target = h.state.store.find_user(id_a.parse().unwrap()).await.unwrap().unwrap();
        assert!(!target.banned);
    }

    #[tokio::test]
    async fn malformed_bodies_are_validation_errors() {
        let h = harness();
        let (owner_token, _) = staff(&h, Role::Owner).await;
        let (_, id) = anonymous(&h.app, "Warszawa").await;

        let (status, _) = call(
            &h.app,
            "POST",
            "/api/auth/anonymous",
            None,
            Some(json!({ "city": 5 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &h.app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": ["a@b.pl"], "password": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let ban = format!("/api/admin/users/{id}/ban");
        let (status, body) = call(&h.app, "POST", &ban, Some(&owner_token), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, Value::String("banned is required".into()));

        let (status, _) = call(
            &h.app,
            "POST",
            &ban,
            Some(&owner_token),
            Some(json!({ "banned": "yes" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let role = format!("/api/admin/users/{id}/role");
        let (status, _) = call(
            &h.app,
            "POST",
            &role,
            Some(&owner_token),
            Some(json!({ "role": 7 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = call(&h.app, "POST", &role, Some(&owner_token), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &h.app,
            "POST",
            &ban,
            Some(&owner_token),
            Some(json!({ "banned": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn deleted_user_token_is_rejected() {
        let h = harness();
        let (token, id) = anonymous(&h.app, "Warszawa").await;
        h.state.store.delete_user(id.parse().unwrap()).await.unwrap();

        let (status, _) = call(&h.app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn creation_is_rate_limited_per_caller() {
        let h = harness();
        let (token, _) = anonymous(&h.app, "Warszawa").await;

        for i in 0..10 {
            let mut body = metro_centrum();
            body["lat"] = json!(50.0 + i as f64);
            let (status, _) = call(&h.app, "POST", "/api/reports", Some(&token), Some(body)).await;
            assert_eq!(status, StatusCode::CREATED);
        }
        let mut body = metro_centrum();
        body["lat"] = json!(70.0);
        let (status, _) = call(&h.app, "POST", "/api/reports", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn admin_routes_require_staff() {
        let h = harness();
        let (token, _) = anonymous(&h.app, "Warszawa").await;
        let (status, _) = call(&h.app, "GET", "/api/admin/overview", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&h.app, "GET", "/api/admin/overview", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
