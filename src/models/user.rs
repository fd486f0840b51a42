use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::schema::{DefaultValue, FieldDef, ResourceSchema};

/// Role carried by every principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "publisher" => Ok(Role::Publisher),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

pub const PASSWORD_FIELD: &str = "password";

/// Roles a user may pick when registering; `admin` is granted by an admin only
pub const SELF_SERVICE_ROLES: &[&str] = &["user", "publisher"];
const ALL_ROLES: &[&str] = &["user", "publisher", "admin"];

pub const USER_SCHEMA: ResourceSchema = ResourceSchema {
    collection: "users",
    label: "User",
    fields: &[
        FieldDef::text("name").required(),
        FieldDef::text("email").required().unique().email(),
        FieldDef::text("role").choices(ALL_ROLES).default_to(DefaultValue::Text("user")),
        FieldDef::text(PASSWORD_FIELD).required().hidden().min_len(6),
    ],
    unique_together: &[],
};

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}
