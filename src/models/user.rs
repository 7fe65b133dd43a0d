//! User records and the payloads that create or change them

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{is_valid_email, is_valid_phone, normalize_phone, nullable, required, Contract, Group};
use crate::auth::{Role, Status};
use crate::error::{Error, Result};

pub const MIN_PASSWORD_LEN: usize = 6;

/// A stored user. Never serialized directly; see [`PublicUser`].
#[derive(Debug, Clone)]
pub struct User {
    pub matricula: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub status: Status,
    pub group_id: Option<i64>,
    pub contract_id: Option<i64>,
    pub password_hash: String,
    /// The initial password has been replaced by the user
    pub pass_sub: bool,
    /// The initial password has already been used to log in once
    pub default_password_used: bool,
    pub job_title: Option<String>,
    pub education: Option<String>,
    pub marital_status: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user
    pub fn new(
        matricula: i64,
        name: String,
        email: String,
        phone: String,
        role: Role,
        password_hash: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            matricula,
            name,
            email,
            phone,
            role,
            status: Status::Active,
            group_id: None,
            contract_id: None,
            password_hash,
            pass_sub: false,
            default_password_used: false,
            job_title: None,
            education: None,
            marital_status: None,
            birth_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin && self.is_active()
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Apply a resolved change set in place
    pub fn apply(&mut self, changes: &UserChanges) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(email) = &changes.email {
            self.email = email.clone();
        }
        if let Some(phone) = &changes.phone {
            self.phone = phone.clone();
        }
        if let Some(role) = changes.role {
            self.role = role;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(group_id) = changes.group_id {
            self.group_id = group_id;
        }
        if let Some(contract_id) = changes.contract_id {
            self.contract_id = contract_id;
        }
        if let Some(hash) = &changes.password_hash {
            self.password_hash = hash.clone();
        }
        if let Some(pass_sub) = changes.pass_sub {
            self.pass_sub = pass_sub;
        }
        if let Some(used) = changes.default_password_used {
            self.default_password_used = used;
        }
        self.updated_at = Utc::now();
    }
}

/// User as returned by the API, without the password digest
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PublicUser {
    pub matricula: i64,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    pub role: Role,
    pub status: Status,
    #[serde(rename = "grupo_id")]
    pub group_id: Option<i64>,
    #[serde(rename = "contrato_id")]
    pub contract_id: Option<i64>,
    pub pass_sub: bool,
    #[serde(rename = "funcao", skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(rename = "escolaridade", skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(rename = "estado_civil", skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<String>,
    #[serde(rename = "data_nascimento", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            matricula: user.matricula,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
            status: user.status,
            group_id: user.group_id,
            contract_id: user.contract_id,
            pass_sub: user.pass_sub,
            job_title: user.job_title.clone(),
            education: user.education.clone(),
            marital_status: user.marital_status.clone(),
            birth_date: user.birth_date,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// User with its group and contract embedded, as in list and detail views
#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: PublicUser,
    #[serde(rename = "grupos")]
    pub group: Option<Group>,
    #[serde(rename = "contratos")]
    pub contract: Option<Contract>,
}

/// Filters for listing users
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// Case-insensitive match on name or email, substring match on phone
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub grupo_id: Option<i64>,
    #[serde(default)]
    pub contrato_id: Option<i64>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = user.name.to_lowercase().contains(&needle)
                || user.email.to_lowercase().contains(&needle)
                || user.phone.contains(search);
            if !hit {
                return false;
            }
        }
        self.role.is_none_or(|r| r == user.role)
            && self.status.is_none_or(|s| s == user.status)
            && self.grupo_id.is_none_or(|g| user.group_id == Some(g))
            && self.contrato_id.is_none_or(|c| user.contract_id == Some(c))
    }
}

/// Payload for creating a user (admin only)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub matricula: i64,
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub telefone: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub grupo_id: Option<i64>,
    #[serde(default)]
    pub contrato_id: Option<i64>,
    #[serde(default)]
    pub funcao: Option<String>,
    #[serde(default)]
    pub escolaridade: Option<String>,
    #[serde(default)]
    pub estado_civil: Option<String>,
    #[serde(default)]
    pub data_nascimento: Option<NaiveDate>,
}

impl NewUser {
    /// Validate and turn into a record carrying the given password digest
    pub fn into_user(self, password_hash: String) -> Result<User> {
        const MISSING: &str = "Dados obrigatórios não fornecidos";
        if self.matricula <= 0 {
            return Err(Error::BadRequest(MISSING.to_string()));
        }
        let name = required(&self.nome, MISSING)?;
        let email = required(&self.email, MISSING)?;
        let phone = normalize_phone(&required(&self.telefone, MISSING)?);

        if !is_valid_email(&email) {
            return Err(Error::BadRequest("Email inválido".to_string()));
        }
        if !is_valid_phone(&phone) {
            return Err(Error::BadRequest(
                "Telefone inválido. Use o formato +55DDDNUMERO".to_string(),
            ));
        }

        let mut user = User::new(
            self.matricula,
            name,
            email,
            phone,
            self.role.unwrap_or(Role::User),
            password_hash,
        );
        user.group_id = self.grupo_id;
        user.contract_id = self.contrato_id;
        user.job_title = self.funcao;
        user.education = self.escolaridade;
        user.marital_status = self.estado_civil;
        user.birth_date = self.data_nascimento;
        Ok(user)
    }
}

/// Payload for updating a user. Fields are split by who may set them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    // Self-service fields
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default)]
    pub password: Option<String>,

    // Admin-only fields
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default, deserialize_with = "nullable")]
    pub grupo_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub contrato_id: Option<Option<i64>>,
}

impl UserUpdate {
    /// Names of admin-only fields present in this payload
    pub fn admin_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.role.is_some() {
            fields.push("role");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.grupo_id.is_some() {
            fields.push("grupo_id");
        }
        if self.contrato_id.is_some() {
            fields.push("contrato_id");
        }
        fields
    }

    /// Reject admin-only fields from non-admin callers
    pub fn authorize(&self, caller_is_admin: bool) -> Result<()> {
        let fields = self.admin_fields();
        if !caller_is_admin && !fields.is_empty() {
            return Err(Error::Forbidden(format!(
                "Acesso negado - apenas administradores podem alterar: {}",
                fields.join(", ")
            )));
        }
        Ok(())
    }

    /// The requested new password, if any, once it passes the length rule
    pub fn new_password(&self) -> Result<Option<String>> {
        match &self.password {
            None => Ok(None),
            Some(p) if p.chars().count() < MIN_PASSWORD_LEN => Err(Error::BadRequest(format!(
                "A senha deve ter pelo menos {} caracteres",
                MIN_PASSWORD_LEN
            ))),
            Some(p) => Ok(Some(p.clone())),
        }
    }

    /// Validate formats and resolve into store-level changes.
    ///
    /// `password_hash` is the digest of `self.password`, computed by the caller.
    pub fn into_changes(self, password_hash: Option<String>) -> Result<UserChanges> {
        let name = self
            .nome
            .map(|n| required(&n, "Nome não pode ser vazio"))
            .transpose()?;
        let email = self
            .email
            .map(|e| required(&e, "Email não pode ser vazio"))
            .transpose()?;
        if let Some(email) = &email {
            if !is_valid_email(email) {
                return Err(Error::BadRequest("Email inválido".to_string()));
            }
        }
        let phone = self.telefone.map(|p| normalize_phone(&p));
        if let Some(phone) = &phone {
            if !is_valid_phone(phone) {
                return Err(Error::BadRequest(
                    "Telefone inválido. Use o formato +55DDDNUMERO".to_string(),
                ));
            }
        }

        let pass_sub = password_hash.as_ref().map(|_| true);
        Ok(UserChanges {
            name,
            email,
            phone,
            role: self.role,
            status: self.status,
            group_id: self.grupo_id,
            contract_id: self.contrato_id,
            password_hash,
            pass_sub,
            default_password_used: None,
        })
    }
}

/// Field-level changes applied by the store. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub status: Option<Status>,
    pub group_id: Option<Option<i64>>,
    pub contract_id: Option<Option<i64>>,
    pub password_hash: Option<String>,
    pub pass_sub: Option<bool>,
    pub default_password_used: Option<bool>,
}

impl UserChanges {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}
