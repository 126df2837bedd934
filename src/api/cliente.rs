//! Endpoints of the authenticated client ("cliente") API.

use super::client::{ApiClient, FilePart, RequestOptions};
use super::{
    AccountSummary, ApiError, ConnectionStatus, ConsumedProduct, InvoicePage, InvoiceQuery,
    InvoicesData, LoginData, LoginRequest, MovementPage, MovementQuery, MovementsData,
    PasswordChange, PhotoData, Profile, ProfileUpdate, RegisterRequest,
};
use reqwest::Method;

fn required<T>(data: Option<T>, what: &str) -> Result<T, ApiError> {
    data.ok_or_else(|| ApiError::Decode(format!("response is missing {}", what)))
}

pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<LoginData, ApiError> {
    let data = client
        .post(
            "auth-cliente/login",
            &LoginRequest {
                email: email.to_string(),
                contrasena: password.to_string(),
            },
            RequestOptions::public(),
        )
        .await?;
    required(data, "login data")
}

/// Create a new client account. Some deployments answer with a session
/// (`{ token, cliente }`), others only with the created record.
pub async fn register(
    client: &ApiClient,
    request: &RegisterRequest,
) -> Result<Option<LoginData>, ApiError> {
    let data: Option<serde_json::Value> = client
        .post("clientes", request, RequestOptions::public())
        .await?;
    Ok(data.and_then(|value| serde_json::from_value::<LoginData>(value).ok()))
}

pub async fn logout(client: &ApiClient) -> Result<(), ApiError> {
    client
        .post::<serde_json::Value, _>("auth-cliente/logout", &serde_json::json!({}), RequestOptions::default())
        .await?;
    Ok(())
}

pub async fn get_profile(client: &ApiClient) -> Result<Profile, ApiError> {
    let data = client.get("auth-cliente/me", RequestOptions::default()).await?;
    required(data, "profile")
}

pub async fn update_profile(client: &ApiClient, update: &ProfileUpdate) -> Result<Profile, ApiError> {
    let data = client.put("auth-cliente/me", update).await?;
    required(data, "profile")
}

pub async fn change_password(
    client: &ApiClient,
    current: &str,
    new_password: &str,
) -> Result<(), ApiError> {
    client
        .put::<serde_json::Value, _>(
            "auth-cliente/contrasena",
            &PasswordChange {
                contrasena_actual: current.to_string(),
                contrasena_nueva: new_password.to_string(),
            },
        )
        .await?;
    Ok(())
}

pub async fn update_photo(
    client: &ApiClient,
    bytes: Vec<u8>,
    file_name: Option<&str>,
    mime: Option<&str>,
) -> Result<PhotoData, ApiError> {
    let part = FilePart {
        field: "foto".to_string(),
        file_name: file_name.unwrap_or("profile.jpg").to_string(),
        mime: mime.unwrap_or("image/jpeg").to_string(),
        bytes,
    };
    let data = client.put_file("auth-cliente/foto", part).await?;
    required(data, "photo data")
}

pub async fn delete_photo(client: &ApiClient) -> Result<(), ApiError> {
    client
        .delete::<serde_json::Value>("auth-cliente/foto")
        .await?;
    Ok(())
}

pub async fn get_summary(client: &ApiClient) -> Result<AccountSummary, ApiError> {
    let data = client
        .get("auth-cliente/resumen", RequestOptions::default())
        .await?;
    required(data, "account summary")
}

pub async fn list_movements(
    client: &ApiClient,
    query: &MovementQuery,
) -> Result<MovementPage, ApiError> {
    let data: Option<MovementsData> = client
        .get_with_query("auth-cliente/movimientos", query)
        .await?;
    Ok(data.map(MovementPage::from).unwrap_or_default())
}

pub async fn list_invoices(client: &ApiClient, query: &InvoiceQuery) -> Result<InvoicePage, ApiError> {
    let data: Option<InvoicesData> = client
        .get_with_query("auth-cliente/facturas", query)
        .await?;
    Ok(data.map(InvoicePage::from).unwrap_or_default())
}

pub async fn consumed_products(
    client: &ApiClient,
    client_id: i64,
) -> Result<Vec<ConsumedProduct>, ApiError> {
    let path = format!("facturas/cliente/{}/productos-consumidos", client_id);
    let data = client.get(&path, RequestOptions::default()).await?;
    Ok(data.unwrap_or_default())
}

/// Call a public endpoint to check that the API is reachable.
pub async fn test_connection(client: &ApiClient) -> ConnectionStatus {
    log::info!("Checking API connection at {}", client.base_url());

    let result = client
        .send_raw(
            Method::GET,
            "file-upload-info",
            &(),
            Default::default(),
            RequestOptions::public(),
        )
        .await;

    match result {
        Ok(data) => ConnectionStatus {
            connected: true,
            message: "Connection established".to_string(),
            base_url: client.base_url().to_string(),
            data: Some(data),
        },
        Err(e) => {
            let message = match &e {
                ApiError::Network(_) => {
                    "No response from the server. Check the URL and that the server is running."
                        .to_string()
                }
                ApiError::Server { status, .. } | ApiError::Validation { status, .. } => {
                    format!("Server answered with error {}", status)
                }
                ApiError::Forbidden(_) => "Server answered with error 403".to_string(),
                ApiError::NotFound(_) => "Server answered with error 404".to_string(),
                other => other.to_string(),
            };
            log::error!("API connection check failed: {}", e);
            ConnectionStatus {
                connected: false,
                message,
                base_url: client.base_url().to_string(),
                data: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::retry::RetryPolicy;
    use crate::api::test_server;
    use crate::storage::TokenStorage;
    use axum::extract::{Multipart, Path};
    use axum::routing::{delete, get, post, put};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(
            base_url,
            Duration::from_secs(5),
            RetryPolicy::new(2, Duration::from_millis(1)),
            TokenStorage::in_memory(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_login_sends_credentials() {
        let router = Router::new().route(
            "/api/auth-cliente/login",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["email"], "ana@example.com");
                assert_eq!(body["contrasena"], "secreto");
                Json(json!({
                    "success": true,
                    "message": "ok",
                    "data": { "token": "jwt", "cliente": { "id": 3, "nombre": "Ana" } }
                }))
            }),
        );
        let api = client(&test_server::spawn(router).await);

        let data = login(&api, "ana@example.com", "secreto").await.unwrap();

        assert_eq!(data.token, "jwt");
        assert_eq!(data.cliente.id, 3);
    }

    #[tokio::test]
    async fn test_register_without_session_payload() {
        let router = Router::new().route(
            "/api/clientes",
            post(|| async { Json(json!({ "success": true, "data": { "id": 9, "nombre": "Eva" } })) }),
        );
        let api = client(&test_server::spawn(router).await);

        let session = register(&api, &RegisterRequest::default()).await.unwrap();

        assert!(session.is_none());
    }

    #[tokio::test]
    async fn test_movements_accepts_paged_payload() {
        let router = Router::new().route(
            "/api/auth-cliente/movimientos",
            get(|| async {
                Json(json!({
                    "success": true,
                    "data": {
                        "movimientos": [
                            { "id": 1, "monto": "12.5", "fecha": "2024-03-01", "tipoMovimiento": { "nombre": "Recarga" } }
                        ],
                        "total": 1, "page": 1, "limit": 100
                    }
                }))
            }),
        );
        let api = client(&test_server::spawn(router).await);

        let page = list_movements(&api, &MovementQuery::recent(100)).await.unwrap();

        assert_eq!(page.movements.len(), 1);
        assert_eq!(page.movements[0].monto, 12.5);
        assert_eq!(page.limit, Some(100));
    }

    #[tokio::test]
    async fn test_movements_without_data_is_empty() {
        let router = Router::new().route(
            "/api/auth-cliente/movimientos",
            get(|| async { Json(json!({ "success": true })) }),
        );
        let api = client(&test_server::spawn(router).await);

        let page = list_movements(&api, &MovementQuery::default()).await.unwrap();

        assert!(page.movements.is_empty());
    }

    #[tokio::test]
    async fn test_invoices_bare_list() {
        let router = Router::new().route(
            "/api/auth-cliente/facturas",
            get(|| async {
                Json(json!({ "success": true, "data": [
                    { "id": 1, "total": "30.00", "estado": "pagada" },
                    { "id": 2, "total": 10, "estado": "pendiente" }
                ] }))
            }),
        );
        let api = client(&test_server::spawn(router).await);

        let page = list_invoices(&api, &InvoiceQuery::default()).await.unwrap();

        assert_eq!(page.invoices.len(), 2);
        assert_eq!(page.invoices[0].total, Some(30.0));
        assert_eq!(page.total, Some(2));
    }

    #[tokio::test]
    async fn test_consumed_products_uses_client_id() {
        let router = Router::new().route(
            "/api/facturas/cliente/{id}/productos-consumidos",
            get(|Path(id): Path<i64>| async move {
                Json(json!({ "success": true, "data": [ { "idProducto": id, "nombre": "Café", "cantidad": 2 } ] }))
            }),
        );
        let api = client(&test_server::spawn(router).await);

        let products = consumed_products(&api, 42).await.unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, Some(42));
        assert_eq!(products[0].cantidad, Some(2.0));
    }

    #[tokio::test]
    async fn test_photo_upload_is_multipart() {
        let router = Router::new().route(
            "/api/auth-cliente/foto",
            put(|mut form: Multipart| async move {
                let field = form.next_field().await.unwrap().unwrap();
                assert_eq!(field.name(), Some("foto"));
                assert_eq!(field.file_name(), Some("me.png"));
                let bytes = field.bytes().await.unwrap();
                Json(json!({
                    "success": true,
                    "data": { "fotoPerfil": format!("{} bytes", bytes.len()) }
                }))
            }),
        );
        let api = client(&test_server::spawn(router).await);

        let photo = update_photo(&api, vec![1, 2, 3], Some("me.png"), Some("image/png"))
            .await
            .unwrap();

        assert_eq!(photo.foto_perfil.as_deref(), Some("3 bytes"));
    }

    #[tokio::test]
    async fn test_connection_check_reports_failure() {
        let (base, _) = test_server::spawn_hangup().await;
        let api = client(&base);

        let status = test_connection(&api).await;

        assert!(!status.connected);
        assert_eq!(status.base_url, base);
    }

    #[tokio::test]
    async fn test_connection_check_success() {
        let router = Router::new().route(
            "/api/file-upload-info",
            get(|| async { Json(json!({ "maxSize": 1024 })) }),
        );
        let api = client(&test_server::spawn(router).await);

        let status = test_connection(&api).await;

        assert!(status.connected);
        assert_eq!(status.data.unwrap()["maxSize"], 1024);
    }

    #[tokio::test]
    async fn test_update_profile_puts_changed_fields() {
        let router = Router::new().route(
            "/api/auth-cliente/me",
            put(|Json(body): Json<Value>| async move {
                assert_eq!(body, json!({ "nombre": "Ana", "apellido": "Ruiz" }));
                Json(json!({ "success": true, "data": { "id": 3, "nombre": "Ana", "apellido": "Ruiz" } }))
            }),
        );
        let api = client(&test_server::spawn(router).await);

        let update = ProfileUpdate {
            nombre: Some("Ana".into()),
            apellido: Some("Ruiz".into()),
            telefono: None,
        };
        let profile = update_profile(&api, &update).await.unwrap();

        assert_eq!(profile.id, 3);
        assert_eq!(profile.apellido, "Ruiz");
    }

    #[tokio::test]
    async fn test_change_password_body() {
        let router = Router::new().route(
            "/api/auth-cliente/contrasena",
            put(|Json(body): Json<Value>| async move {
                assert_eq!(body, json!({ "contrasenaActual": "viejo1", "contrasenaNueva": "nuevo12" }));
                Json(json!({ "success": true, "message": "ok" }))
            }),
        );
        let api = client(&test_server::spawn(router).await);

        change_password(&api, "viejo1", "nuevo12").await.unwrap();
    }

    #[tokio::test]
    async fn test_change_password_rejected_by_server() {
        let router = Router::new().route(
            "/api/auth-cliente/contrasena",
            put(|| async {
                (
                    axum::http::StatusCode::BAD_REQUEST,
                    Json(json!({ "success": false, "message": "Contraseña actual incorrecta" })),
                )
            }),
        );
        let api = client(&test_server::spawn(router).await);

        let err = change_password(&api, "mala12", "nuevo12").await.unwrap_err();

        assert!(matches!(
            err,
            ApiError::Validation { status: 400, ref message } if message == "Contraseña actual incorrecta"
        ));
    }

    #[tokio::test]
    async fn test_delete_photo() {
        let router = Router::new().route(
            "/api/auth-cliente/foto",
            delete(|| async { Json(json!({ "success": true, "message": "Foto eliminada" })) }),
        );
        let api = client(&test_server::spawn(router).await);

        delete_photo(&api).await.unwrap();
    }
}
