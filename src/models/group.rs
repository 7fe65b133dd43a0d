//! Groups users belong to

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, required, PublicUser};
use crate::auth::Status;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Group {
    pub id: i64,
    /// Short code shown in lists
    #[serde(rename = "grupo")]
    pub code: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
    /// Group currently takes part in a challenge cycle
    #[serde(rename = "desafiado")]
    pub challenged: bool,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    pub fn apply(&mut self, changes: &GroupChanges) {
        if let Some(code) = &changes.code {
            self.code = code.clone();
        }
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(description) = &changes.description {
            self.description = description.clone();
        }
        if let Some(challenged) = changes.challenged {
            self.challenged = challenged;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

/// Group detail with its members
#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,
    #[serde(rename = "usuarios")]
    pub members: Vec<PublicUser>,
}

/// Payload for creating a group
#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
    #[serde(default)]
    pub nome: String,
    /// Defaults to the name when omitted
    #[serde(default)]
    pub grupo: Option<String>,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub desafiado: bool,
}

/// Validated group fields ready for insertion
#[derive(Debug, Clone)]
pub struct GroupDraft {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub challenged: bool,
}

impl NewGroup {
    pub fn validate(self) -> Result<GroupDraft> {
        let name = required(&self.nome, "Nome do grupo é obrigatório")?;
        let code = match self.grupo.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => name.clone(),
        };
        Ok(GroupDraft {
            code,
            name,
            description: self.descricao,
            challenged: self.desafiado,
        })
    }
}

impl GroupDraft {
    pub fn into_group(self, id: i64) -> Group {
        let now = Utc::now();
        Group {
            id,
            code: self.code,
            name: self.name,
            description: self.description,
            challenged: self.challenged,
            status: Status::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Payload for updating a group
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupUpdate {
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub grupo: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub descricao: Option<Option<String>>,
    #[serde(default)]
    pub desafiado: Option<bool>,
    #[serde(default)]
    pub status: Option<Status>,
}

impl GroupUpdate {
    pub fn into_changes(self) -> Result<GroupChanges> {
        Ok(GroupChanges {
            name: self
                .nome
                .map(|n| required(&n, "Nome do grupo é obrigatório"))
                .transpose()?,
            code: self
                .grupo
                .map(|c| required(&c, "Código do grupo não pode ser vazio"))
                .transpose()?,
            description: self.descricao,
            challenged: self.desafiado,
            status: self.status,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupChanges {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub challenged: Option<bool>,
    pub status: Option<Status>,
}

impl GroupChanges {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}
