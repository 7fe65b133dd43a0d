//! Domain records and validated request payloads

mod contract;
mod group;
mod roster;
mod user;

pub use contract::*;
pub use group::*;
pub use roster::*;
pub use user::*;

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::LazyLock;

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+55\d{2}9?\d{8}$").expect("Invalid regex pattern - this is a bug in the codebase")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
        .expect("Invalid regex pattern - this is a bug in the codebase")
});

/// Strip everything except digits and '+' so "(11) 99999-9999" style input matches storage
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// Brazilian mobile/landline in E.164 form, e.g. +5511999999999
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Trimmed value of a required text field, or a 400
pub(crate) fn required(value: &str, message: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::BadRequest(message.to_string()));
    }
    Ok(value.to_string())
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Totals shown on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_usuarios: usize,
    pub usuarios_ativos: usize,
    pub total_grupos: usize,
    pub grupos_ativos: usize,
    pub grupos_desafiados: usize,
    pub total_contratos: usize,
    pub contratos_ativos: usize,
}
