//! Input checks and normalisation. Everything here runs before the store is touched.

use std::sync::OnceLock;

use regex::Regex;

use social_types::api::{CreateUserRequest, PostRequest, UpdatePasswordRequest, UpdateUserRequest};

use crate::error::ApiError;

/// Trimmed profile fields, ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub nick: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub profile: Profile,
    /// Still plaintext. Hashed by the handler before it reaches the store.
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostInput {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    pub current: String,
    pub new: String,
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex should compile")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} required")));
    }
    Ok(trimmed.to_string())
}

fn profile(name: &str, nick: &str, email: &str) -> Result<Profile, ApiError> {
    let name = required(name, "name")?;
    let nick = required(nick, "nick")?;
    let email = required(email, "e-mail")?;

    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("e-mail invalid".into()));
    }

    Ok(Profile { name, nick, email })
}

pub fn new_user(req: CreateUserRequest) -> Result<NewUser, ApiError> {
    let profile = profile(&req.name, &req.nick, &req.email)?;
    if req.password.is_empty() {
        return Err(ApiError::BadRequest("password required".into()));
    }

    Ok(NewUser {
        profile,
        password: req.password,
    })
}

pub fn profile_update(req: &UpdateUserRequest) -> Result<Profile, ApiError> {
    profile(&req.name, &req.nick, &req.email)
}

pub fn post(req: &PostRequest) -> Result<PostInput, ApiError> {
    Ok(PostInput {
        title: required(&req.title, "title")?,
        content: required(&req.content, "content")?,
    })
}

pub fn password_change(req: UpdatePasswordRequest) -> Result<PasswordChange, ApiError> {
    if req.current_password.is_empty() {
        return Err(ApiError::BadRequest("current password required".into()));
    }
    if req.new_password.is_empty() {
        return Err(ApiError::BadRequest("new password required".into()));
    }

    Ok(PasswordChange {
        current: req.current_password,
        new: req.new_password,
    })
}
