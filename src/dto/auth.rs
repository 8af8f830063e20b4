use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, FieldError};
use crate::models::UserRole;

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
    /// Defaults to `customer`. `admin` cannot be self-assigned.
    pub role: Option<UserRole>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();
        if self.email.trim().is_empty() || !self.email.contains('@') {
            errors.push(FieldError::new("email", "must be a valid email address"));
        }
        if self.password.len() < 8 {
            errors.push(FieldError::new(
                "password",
                "must be at least 8 characters",
            ));
        }
        if self.full_name.trim().is_empty() {
            errors.push(FieldError::new("full_name", "must not be empty"));
        }
        if self.role == Some(UserRole::Admin) {
            errors.push(FieldError::new("role", "cannot register as admin"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.full_name {
            if name.trim().is_empty() {
                return Err(AppError::invalid("full_name", "must not be empty"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RegisterRequest {
        RegisterRequest {
            email: "amina@example.com".into(),
            password: "secret-pass".into(),
            full_name: "Amina Diallo".into(),
            phone: Some("+221770000000".into()),
            role: None,
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn admin_role_cannot_be_self_assigned() {
        let mut req = base();
        req.role = Some(UserRole::Admin);
        assert!(req.validate().is_err());

        req.role = Some(UserRole::Seller);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn bad_email_and_short_password_report_both_fields() {
        let mut req = base();
        req.email = "not-an-email".into();
        req.password = "short".into();
        match req.validate() {
            Err(AppError::Validation(fields)) => {
                assert_eq!(fields.len(), 2);
                assert!(fields.iter().any(|f| f.field == "email"));
                assert!(fields.iter().any(|f| f.field == "password"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
