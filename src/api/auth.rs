//! Caller identity from the trusted headers set by the identity provider in
//! front of this service.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::model::OwnerId;
use crate::service::{AccessScope, ServiceError};

use super::errors::Error;

pub const USER_HEADER: &str = "x-lanecontrol-user";
pub const ROLE_HEADER: &str = "x-lanecontrol-role";
const ADMIN_ROLE: &str = "Admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: OwnerId,
    pub is_admin: bool,
}

impl CurrentUser {
    /// Scope for the caller's own reservations, regardless of role.
    pub fn owner_scope(&self) -> AccessScope {
        AccessScope::Owner(self.id.clone())
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Error> {
        // No identity is treated like touching someone else's reservation.
        let Some(id) = header(parts, USER_HEADER) else {
            return Err(ServiceError::Forbidden.into());
        };
        let is_admin = header(parts, ROLE_HEADER)
            .map(|roles| roles.split(',').any(|r| r.trim() == ADMIN_ROLE))
            .unwrap_or(false);
        Ok(CurrentUser {
            id: id.to_string(),
            is_admin,
        })
    }
}

/// Extractor for admin-only routes.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Error> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::info!("admin route refused for {}", user.id);
            return Err(ServiceError::Forbidden.into());
        }
        Ok(RequireAdmin(user))
    }
}
