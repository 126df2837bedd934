//! Input checks run before a request is sent

use crate::api::{ApiError, ProfileUpdate, RegisterRequest};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PHONE_LEN: usize = 8;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_LOGIN_PASSWORD_LEN: usize = 4;

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_name(name: &str) -> bool {
    name.trim().chars().count() >= MIN_NAME_LEN
}

pub fn is_valid_phone(phone: &str) -> bool {
    phone.trim().chars().count() >= MIN_PHONE_LEN
}

fn invalid(message: &str) -> ApiError {
    ApiError::InvalidInput(message.to_string())
}

pub fn check_login(email: &str, password: &str) -> Result<(), ApiError> {
    if !is_valid_email(email) {
        return Err(invalid("Email is not valid"));
    }
    if password.chars().count() < MIN_LOGIN_PASSWORD_LEN {
        return Err(invalid("Password must be at least 4 characters"));
    }
    Ok(())
}

pub fn check_registration(request: &RegisterRequest) -> Result<(), ApiError> {
    if !is_valid_name(&request.nombre) {
        return Err(invalid("First name must be at least 2 characters"));
    }
    if !is_valid_name(&request.apellido) {
        return Err(invalid("Last name must be at least 2 characters"));
    }
    if !is_valid_email(&request.email) {
        return Err(invalid("Email is not valid"));
    }
    if request.contrasena.chars().count() < MIN_PASSWORD_LEN {
        return Err(invalid("Password must be at least 6 characters"));
    }
    if let Some(phone) = &request.telefono {
        if !is_valid_phone(phone) {
            return Err(invalid("Phone must be at least 8 characters"));
        }
    }
    Ok(())
}

pub fn check_profile_update(update: &ProfileUpdate) -> Result<(), ApiError> {
    for name in [&update.nombre, &update.apellido].into_iter().flatten() {
        if !is_valid_name(name) {
            return Err(invalid("Names must be at least 2 characters"));
        }
    }
    if let Some(phone) = &update.telefono {
        if !is_valid_phone(phone) {
            return Err(invalid("Phone must be at least 8 characters"));
        }
    }
    Ok(())
}

pub fn check_new_password(current: &str, new_password: &str) -> Result<(), ApiError> {
    if current.is_empty() {
        return Err(invalid("Current password is required"));
    }
    if new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(invalid("Password must be at least 6 characters"));
    }
    Ok(())
}
