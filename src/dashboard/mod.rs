//! Home screen data: balance summary, profile and recent activity

use crate::api::{cliente, AccountSummary, ApiClient, ApiError, Movement, MovementQuery, Profile};

pub const RECENT_ACTIVITY_LIMIT: u32 = 5;

#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub summary: AccountSummary,
    pub profile: Profile,
    pub recent: Vec<Movement>,
    /// Set when at least one part fell back to placeholder data.
    pub degraded: bool,
    pub warning: Option<String>,
}

impl Dashboard {
    pub fn balance(&self) -> f64 {
        self.summary.saldo_actual
    }
}

fn fallback<T>(
    part: &str,
    result: Result<T, ApiError>,
    default: T,
    failed: &mut bool,
) -> Result<T, ApiError> {
    match result {
        Ok(value) => Ok(value),
        Err(ApiError::AuthExpired) => Err(ApiError::AuthExpired),
        Err(e) => {
            log::error!("Dashboard {} failed: {}", part, e);
            *failed = true;
            Ok(default)
        }
    }
}

/// Load the three dashboard parts concurrently. Failures other than an
/// expired session are replaced with placeholders and flagged.
pub async fn load(client: &ApiClient, client_id: i64) -> Result<Dashboard, ApiError> {
    let recent_query = MovementQuery::recent(RECENT_ACTIVITY_LIMIT);
    let (summary, profile, recent) = tokio::join!(
        cliente::get_summary(client),
        cliente::get_profile(client),
        cliente::list_movements(client, &recent_query),
    );

    let mut degraded = false;
    let placeholder = Profile {
        id: client_id,
        nombre: "Usuario".to_string(),
        ..Profile::default()
    };
    let summary = fallback("summary", summary, AccountSummary::default(), &mut degraded)?;
    let profile = fallback("profile", profile, placeholder, &mut degraded)?;
    let recent = fallback(
        "recent movements",
        recent.map(|page| page.movements),
        Vec::new(),
        &mut degraded,
    )?;

    if degraded {
        log::warn!("Dashboard loaded with fallback data");
    }

    Ok(Dashboard {
        summary,
        profile,
        recent,
        degraded,
        warning: degraded
            .then(|| "The server is having problems. Showing limited data.".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::retry::RetryPolicy;
    use crate::api::test_server;
    use crate::storage::TokenStorage;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::time::Duration;

    fn client(base_url: &str) -> ApiClient {
        let storage = TokenStorage::in_memory();
        storage.save_token("jwt").unwrap();
        ApiClient::new(
            base_url,
            Duration::from_secs(5),
            RetryPolicy::new(2, Duration::from_millis(1)),
            storage,
        )
        .unwrap()
    }

    fn profile_route() -> axum::routing::MethodRouter {
        get(|| async { Json(json!({ "success": true, "data": { "id": 8, "nombre": "Ana" } })) })
    }

    #[tokio::test]
    async fn test_full_dashboard() {
        let router = Router::new()
            .route(
                "/api/auth-cliente/resumen",
                get(|| async { Json(json!({ "success": true, "data": { "saldoActual": "99.5" } })) }),
            )
            .route("/api/auth-cliente/me", profile_route())
            .route(
                "/api/auth-cliente/movimientos",
                get(|| async {
                    Json(json!({ "success": true, "data": [
                        { "id": 1, "monto": 10, "fecha": "2024-02-01", "tipoMovimiento": { "nombre": "Consumo" } }
                    ] }))
                }),
            );
        let api = client(&test_server::spawn(router).await);

        let dashboard = load(&api, 8).await.unwrap();

        assert!(!dashboard.degraded);
        assert_eq!(dashboard.warning, None);
        assert_eq!(dashboard.balance(), 99.5);
        assert_eq!(dashboard.profile.nombre, "Ana");
        assert_eq!(dashboard.recent.len(), 1);
    }

    #[tokio::test]
    async fn test_partial_failure_degrades() {
        let router = Router::new()
            .route(
                "/api/auth-cliente/resumen",
                get(|| async {
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "success": false })))
                }),
            )
            .route("/api/auth-cliente/me", profile_route());
        let api = client(&test_server::spawn(router).await);

        let dashboard = load(&api, 8).await.unwrap();

        assert!(dashboard.degraded);
        assert!(dashboard.warning.is_some());
        assert_eq!(dashboard.balance(), 0.0);
        assert_eq!(dashboard.profile.nombre, "Ana");
        assert!(dashboard.recent.is_empty());
    }

    #[tokio::test]
    async fn test_expired_session_propagates() {
        let router = Router::new().fallback(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "message": "Token expirado" })),
            )
        });
        let api = client(&test_server::spawn(router).await);

        let err = load(&api, 8).await.unwrap_err();

        assert!(err.is_auth_expired());
        assert!(!api.storage().has_stored_session());
    }
}
