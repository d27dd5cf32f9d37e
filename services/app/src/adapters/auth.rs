//! services/app/src/adapters/auth.rs
//!
//! This module contains the HTTP adapter for the authentication and profile
//! backend. It implements the `AuthBackend` port from the `core` crate.

use async_trait::async_trait;
use campus_core::domain::{Role, Subscription, SubscriptionStatus, User};
use campus_core::ports::{AuthBackend, PortResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::http::BackendClient;

/// The HTTP implementation of the `AuthBackend` port.
#[derive(Clone)]
pub struct HttpAuthBackend {
    http: BackendClient,
}

impl HttpAuthBackend {
    pub fn new(http: BackendClient) -> Self {
        Self { http }
    }
}

//=========================================================================================
// Wire Record Structs
//=========================================================================================
// The backend speaks Spanish field names; these private records keep the
// wire shape out of the domain.

#[derive(Deserialize)]
pub(crate) struct SubscriptionRecord {
    estado: String,
    #[serde(rename = "expiraEn", default)]
    expira_en: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub(crate) struct UserRecord {
    #[serde(alias = "_id")]
    id: String,
    nombre: String,
    email: String,
    #[serde(default)]
    rol: Option<String>,
    #[serde(default)]
    suscripcion: Option<SubscriptionRecord>,
}

impl UserRecord {
    pub(crate) fn to_domain(self) -> User {
        // A missing or unknown role is a data anomaly; the safe default is
        // the least-privileged one.
        let role = match self.rol.as_deref() {
            Some("admin") => Role::Admin,
            _ => Role::Student,
        };
        let subscription = self.suscripcion.map(|s| Subscription {
            status: match s.estado.as_str() {
                "activa" | "active" => SubscriptionStatus::Active,
                "cancelada" | "cancelled" => SubscriptionStatus::Cancelled,
                _ => SubscriptionStatus::Expired,
            },
            expires_at: s.expira_en,
        });
        User {
            id: self.id,
            name: self.nombre,
            email: self.email,
            role,
            subscription,
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    user: UserRecord,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    nombre: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct RegisterResponse {
    message: String,
}

#[derive(Deserialize)]
struct ProfileResponse {
    user: UserRecord,
}

#[derive(Serialize)]
struct UpdateNameRequest<'a> {
    nombre: &'a str,
}

//=========================================================================================
// Port Implementation
//=========================================================================================

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, email: &str, password: &str) -> PortResult<(String, User)> {
        let response: LoginResponse = self
            .http
            .post_json("/auth/login", &LoginRequest { email, password })
            .await?;
        Ok((response.token, response.user.to_domain()))
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> PortResult<String> {
        let response: RegisterResponse = self
            .http
            .post_json(
                "/auth/register",
                &RegisterRequest {
                    nombre: name,
                    email,
                    password,
                },
            )
            .await?;
        Ok(response.message)
    }

    async fn fetch_profile(&self) -> PortResult<User> {
        let response: ProfileResponse = self.http.get_json("/usuario/perfil/me").await?;
        Ok(response.user.to_domain())
    }

    async fn update_name(&self, name: &str) -> PortResult<User> {
        let response: ProfileResponse = self
            .http
            .put_json("/usuario/perfil/me", &UpdateNameRequest { nombre: name })
            .await?;
        Ok(response.user.to_domain())
    }
}
