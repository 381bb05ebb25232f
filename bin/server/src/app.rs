//! Application router.

use axum::{Router, routing::get};
use social_login_identity::Provider;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{AppState, SocialUser, routes};

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/", get(routes::index))
        // Provider login
        .route("/login", get(routes::login_page))
        .route("/login/{provider}", get(routes::login))
        .route("/login/{provider}/callback", get(routes::callback))
        // Authority checks
        .route("/facebook", get(routes::facebook))
        .route("/google", get(routes::google))
        .route("/kakao", get(routes::kakao))
        .route("/me", get(routes::me))
        .route("/logout", get(routes::logout));

    for provider in Provider::ALL {
        router = router.route(
            &format!("/{provider}/complete"),
            get(move |user: SocialUser| routes::complete(provider, user)),
        );
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use social_login_identity::{
        AuthenticationContext, Identity, InMemoryIdentityStore, InMemorySessionStore, Provider,
        SessionId, SessionStore, session::store_authentication,
    };
    use tower::ServiceExt;

    struct Harness {
        state: Arc<AppState>,
        identities: Arc<InMemoryIdentityStore>,
        sessions: Arc<InMemorySessionStore>,
    }

    impl Harness {
        fn new() -> Self {
            let identities = Arc::new(InMemoryIdentityStore::new());
            let sessions = Arc::new(InMemorySessionStore::new());
            let state = Arc::new(AppState::new(
                identities.clone(),
                sessions.clone(),
                Vec::new(),
                SessionConfig::default(),
            ));
            Self {
                state,
                identities,
                sessions,
            }
        }

        async fn login(&self, session: &str, authentication: AuthenticationContext) {
            store_authentication(
                self.sessions.as_ref(),
                &SessionId::from(session),
                &authentication,
            )
            .await
            .expect("store authentication");
        }

        async fn get(&self, uri: &str, session: Option<&str>) -> axum::response::Response {
            let mut request = Request::builder().uri(uri);
            if let Some(session) = session {
                request = request.header(header::COOKIE, format!("session={session}"));
            }
            router(self.state.clone())
                .oneshot(request.body(Body::empty()).expect("request"))
                .await
                .expect("response")
        }
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    fn google_login() -> AuthenticationContext {
        AuthenticationContext::for_provider(
            Provider::Google,
            json!({"name": "Ann", "email": "ann@x.com", "id": "42"}),
        )
    }

    fn location(response: &axum::response::Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn me_resolves_and_returns_identity() {
        let harness = Harness::new();
        harness.login("s1", google_login()).await;

        let response = harness.get("/me", Some("s1")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let identity: Identity =
            serde_json::from_str(&body_string(response).await).expect("identity json");
        assert_eq!(identity.email(), "ann@x.com");
        assert_eq!(harness.identities.len().await, 1);
    }

    #[tokio::test]
    async fn me_without_session_redirects_to_login() {
        let harness = Harness::new();

        let response = harness.get("/me", None).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn complete_redirects_home_after_resolving() {
        let harness = Harness::new();
        harness.login("s1", google_login()).await;

        let response = harness.get("/google/complete", Some("s1")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        assert!(
            harness
                .state
                .resolver
                .cache()
                .lookup(&SessionId::from("s1"))
                .await
                .is_some()
        );
    }

    #[tokio::test]
    async fn authority_routes_check_role_claim() {
        let harness = Harness::new();
        harness.login("s1", google_login()).await;

        let allowed = harness.get("/google", Some("s1")).await;
        assert_eq!(allowed.status(), StatusCode::OK);
        assert_eq!(body_string(allowed).await, "google");

        let denied = harness.get("/kakao", Some("s1")).await;
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn repaired_authorities_are_written_back_to_the_session() {
        let harness = Harness::new();
        harness.login("s1", google_login()).await;
        harness.get("/me", Some("s1")).await;

        // Same email through Kakao on another session: Google owns the record.
        harness
            .login(
                "s2",
                AuthenticationContext::for_provider(
                    Provider::Kakao,
                    json!({"properties": {"nickname": "Ann K"}, "kaccount_email": "ann@x.com", "id": 7}),
                ),
            )
            .await;
        let response = harness.get("/kakao/complete", Some("s2")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(harness.get("/github/complete", Some("s2")).await.status(), StatusCode::NOT_FOUND);

        assert_eq!(harness.get("/google", Some("s2")).await.status(), StatusCode::OK);
        assert_eq!(
            harness.get("/kakao", Some("s2")).await.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(harness.identities.len().await, 1);
    }

    #[tokio::test]
    async fn unresolvable_session_is_sent_to_login() {
        let harness = Harness::new();
        harness
            .login(
                "s1",
                AuthenticationContext::for_provider(Provider::Kakao, json!({"id": "7"})),
            )
            .await;

        let response = harness.get("/me", Some("s1")).await;

        assert_eq!(location(&response), "/login");
        assert!(harness.identities.is_empty().await);
    }

    #[tokio::test]
    async fn unconfigured_provider_login_is_not_found() {
        let harness = Harness::new();

        assert_eq!(
            harness.get("/login/github", None).await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            harness.get("/login/google", None).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn callback_without_login_state_is_rejected() {
        let harness = Harness::new();
        let registration = social_login_identity::ProviderRegistration::builder(
            Provider::Google,
            "client".to_string(),
            "secret".to_string(),
            "http://localhost:3000/login/google/callback".to_string(),
        )
        .build()
        .expect("registration");
        let client = crate::auth::ProviderClient::new(&registration, reqwest::Client::new())
            .expect("client");
        let state = Arc::new(AppState::new(
            harness.identities.clone(),
            harness.sessions.clone(),
            vec![client],
            SessionConfig::default(),
        ));

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/login/google/callback?code=abc&state=xyz")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_page_lists_configured_providers_only() {
        let harness = Harness::new();

        let body = body_string(harness.get("/login", None).await).await;

        assert!(body.contains("Sign in"));
        assert!(!body.contains("/login/google"));
    }

    #[tokio::test]
    async fn logout_invalidates_session() {
        let harness = Harness::new();
        harness.login("s1", google_login()).await;
        harness.get("/me", Some("s1")).await;

        let response = harness.get("/logout", Some("s1")).await;

        assert_eq!(location(&response), "/");
        assert!(harness.sessions.is_empty().await);
        let stored: Option<Value> = harness
            .sessions
            .get_attribute(&SessionId::from("s1"), "identity")
            .await;
        assert!(stored.is_none());
    }
}
