//! Stored accounts and their request/response shapes.
//!
//! Users (customers) and admins are the only documents with a fixed Rust type; all
//! other resources are described by field schemas in [`crate::resource`].

use bson::{DateTime, Uuid};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use shopdesk_store::document::Document;

/// Formats a stored timestamp the way every response renders datetimes.
pub fn format_datetime(value: &DateTime) -> String {
    value
        .to_chrono()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A customer account in the `users` collection.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    /// bcrypt hash, never the plain password
    pub password: String,
    pub is_active: bool,
    #[serde(default)]
    pub last_login: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Document for User {
    fn id(&self) -> &Uuid {
        &self.id
    }

    fn collection_name() -> &'static str {
        "users"
    }
}

/// An administrator in the `admins` collection. Names are unique.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Admin {
    pub id: Uuid,
    pub name: String,
    pub password: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Document for Admin {
    fn id(&self) -> &Uuid {
        &self.id
    }

    fn collection_name() -> &'static str {
        "admins"
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserDto {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn into_dto(self) -> UserDto {
        UserDto {
            id: self.id.to_string(),
            name: self.name,
            phone: self.phone,
            email: self.email,
            is_active: self.is_active,
            last_login: self.last_login.as_ref().map(format_datetime),
            created_at: format_datetime(&self.created_at),
            updated_at: format_datetime(&self.updated_at),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdminDto {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Admin {
    pub fn into_dto(self) -> AdminDto {
        AdminDto {
            id: self.id.to_string(),
            name: self.name,
            created_at: format_datetime(&self.created_at),
            updated_at: format_datetime(&self.updated_at),
        }
    }
}

/// Fields are optional so that a missing field produces the handler's own message
/// instead of a deserialization failure.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RegisterUserDto {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct LoginUserDto {
    pub phone: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct UpdateProfileDto {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login, registration and profile update body for admins.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct AdminCredentialsDto {
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserAuthDto {
    pub token: String,
    pub user: UserDto,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdminAuthDto {
    pub token: String,
    pub admin: AdminDto,
}
