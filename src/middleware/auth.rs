use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::header,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, models::UserRole};

/// Authenticated caller, decoded from the bearer token. Handlers take this as
/// an extractor; requests without a valid token never reach them.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

pub fn ensure_role(user: &AuthUser, role: UserRole) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, UserRole::Admin)
}

/// Sellers and admins both pass; customers do not.
pub fn ensure_seller(user: &AuthUser) -> Result<(), AppError> {
    match user.role {
        UserRole::Seller | UserRole::Admin => Ok(()),
        UserRole::Customer => Err(AppError::Forbidden),
    }
}

/// Resource-level gate: the owner may act on their own record, admins on any.
pub fn ensure_owner_or_admin(user: &AuthUser, owner_id: Uuid) -> Result<(), AppError> {
    if user.user_id == owner_id || user.role == UserRole::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn decode_bearer(parts: &axum::http::request::Parts) -> Result<AuthUser, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

    if !auth_str.starts_with("Bearer ") {
        return Err(AppError::Unauthorized("Invalid Authorization scheme".into()));
    }
    let token = auth_str.trim_start_matches("Bearer ").trim();

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

    let role = decoded
        .claims
        .role
        .parse::<UserRole>()
        .map_err(|_| AppError::Unauthorized("Invalid role in token".into()))?;

    Ok(AuthUser { user_id, role })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        decode_bearer(parts)
    }
}

/// `Option<AuthUser>` on public endpoints: absent header means anonymous,
/// but a malformed or expired token is still rejected.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        if parts.headers.get(header::AUTHORIZATION).is_none() {
            return Ok(None);
        }
        decode_bearer(parts).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn admin_gate_rejects_other_roles() {
        assert!(ensure_admin(&auth(UserRole::Admin)).is_ok());
        assert!(ensure_admin(&auth(UserRole::Seller)).is_err());
        assert!(ensure_admin(&auth(UserRole::Customer)).is_err());
    }

    #[test]
    fn seller_gate_admits_admins() {
        assert!(ensure_seller(&auth(UserRole::Seller)).is_ok());
        assert!(ensure_seller(&auth(UserRole::Admin)).is_ok());
        assert!(ensure_seller(&auth(UserRole::Customer)).is_err());
    }

    #[test]
    fn owner_gate_admits_owner_and_admin_only() {
        let owner = auth(UserRole::Customer);
        assert!(ensure_owner_or_admin(&owner, owner.user_id).is_ok());
        assert!(ensure_owner_or_admin(&owner, Uuid::new_v4()).is_err());
        assert!(ensure_owner_or_admin(&auth(UserRole::Admin), Uuid::new_v4()).is_ok());
    }
}
