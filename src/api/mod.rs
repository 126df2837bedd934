pub mod client;
pub mod cliente;
pub mod error;
pub mod interceptor;
pub mod retry;

#[cfg(test)]
pub(crate) mod test_server;

pub use client::{ApiClient, Body, RequestOptions};
pub use error::ApiError;

use serde::{Deserialize, Serialize};

/// Standard response wrapper used by every endpoint of the account API.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwrap the payload, turning `success: false` into an application error.
    pub fn into_data(self) -> Result<Option<T>, ApiError> {
        if !self.success {
            return Err(ApiError::Application(
                self.message
                    .unwrap_or_else(|| "Request was not successful".to_string()),
            ));
        }
        Ok(self.data)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub apellido: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub foto_perfil: Option<String>,
    #[serde(default)]
    pub foto_perfil_url: Option<String>,
    #[serde(default, with = "amount::option")]
    pub saldo_actual: Option<f64>,
    #[serde(default)]
    pub nivel_suscripcion: Option<SubscriptionLevel>,
    #[serde(default)]
    pub tipo_suscripcion: Option<SubscriptionType>,
    #[serde(default)]
    pub tarjeta: Option<Card>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.nombre, self.apellido).trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SubscriptionLevel {
    pub id: Option<i64>,
    #[serde(default)]
    pub nombre: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SubscriptionType {
    pub id: Option<i64>,
    #[serde(default)]
    pub tipo: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default, with = "amount::option")]
    pub saldo_actual: Option<f64>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub fecha_creacion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MovementType {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub nombre: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: i64,
    #[serde(with = "amount")]
    pub monto: f64,
    #[serde(default)]
    pub fecha: String,
    #[serde(default)]
    pub tipo_movimiento: Option<MovementType>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub factura: Option<Invoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    #[serde(default)]
    pub numero: Option<String>,
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(default, with = "amount::option")]
    pub total: Option<f64>,
    #[serde(default)]
    pub estado: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    #[serde(default, with = "amount")]
    pub saldo_actual: f64,
    #[serde(default, with = "amount::option")]
    pub total_consumos: Option<f64>,
    #[serde(default, with = "amount::option")]
    pub total_pagos: Option<f64>,
    #[serde(default)]
    pub ultimo_movimiento: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConsumedProduct {
    #[serde(default, alias = "idProducto")]
    pub id: Option<i64>,
    #[serde(default)]
    pub nombre: String,
    #[serde(default, with = "amount::option")]
    pub cantidad: Option<f64>,
    #[serde(default, with = "amount::option")]
    pub total: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One page of movements. The server sends either a bare list or a
/// paginated object, both are accepted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MovementPage {
    pub movements: Vec<Movement>,
    pub total: Option<u64>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InvoicePage {
    pub invoices: Vec<Invoice>,
    pub total: Option<u64>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum MovementsData {
    List(Vec<Movement>),
    Paged {
        movimientos: Vec<Movement>,
        total: Option<u64>,
        page: Option<u64>,
        limit: Option<u64>,
    },
}

impl From<MovementsData> for MovementPage {
    fn from(data: MovementsData) -> Self {
        match data {
            MovementsData::List(movements) => MovementPage {
                total: Some(movements.len() as u64),
                movements,
                ..MovementPage::default()
            },
            MovementsData::Paged {
                movimientos,
                total,
                page,
                limit,
            } => MovementPage {
                movements: movimientos,
                total,
                page,
                limit,
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum InvoicesData {
    List(Vec<Invoice>),
    Paged {
        facturas: Vec<Invoice>,
        total: Option<u64>,
        page: Option<u64>,
        limit: Option<u64>,
    },
}

impl From<InvoicesData> for InvoicePage {
    fn from(data: InvoicesData) -> Self {
        match data {
            InvoicesData::List(invoices) => InvoicePage {
                total: Some(invoices.len() as u64),
                invoices,
                ..InvoicePage::default()
            },
            InvoicesData::Paged {
                facturas,
                total,
                page,
                limit,
            } => InvoicePage {
                invoices: facturas,
                total,
                page,
                limit,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub contrasena: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub token: String,
    pub cliente: Profile,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct RegisterRequest {
    pub nombre: String,
    pub apellido: String,
    pub email: String,
    pub contrasena: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apellido: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub contrasena_actual: String,
    pub contrasena_nueva: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PhotoData {
    #[serde(default)]
    pub foto_perfil: Option<String>,
    #[serde(default)]
    pub foto_perfil_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct MovementQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_inicio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_fin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
}

impl MovementQuery {
    pub fn recent(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct InvoiceQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_inicio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha_fin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub message: String,
    pub base_url: String,
    pub data: Option<serde_json::Value>,
}

/// Amounts arrive as JSON numbers or as decimal strings ("12.50").
pub(crate) mod amount {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    fn parse<E: Error>(raw: Raw) -> Result<f64, E> {
        match raw {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("invalid amount: {:?}", s))),
        }
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        parse(Raw::deserialize(deserializer)?)
    }

    pub mod option {
        use super::Raw;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<f64>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.serialize_some(v),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<f64>, D::Error> {
            match Option::<Raw>::deserialize(deserializer)? {
                Some(raw) => super::parse(raw).map(Some),
                None => Ok(None),
            }
        }
    }
}
