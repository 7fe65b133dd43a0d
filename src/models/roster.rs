//! Read-only employee roster used to pre-fill new users

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Maximum rows returned by a roster search
pub const ROSTER_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterEntry {
    /// Employee badge number; becomes the user's matricula
    pub chapa_matricula: String,
    pub nome: String,
    pub cod_funcao: Option<String>,
    pub funcao: Option<String>,
    pub cod_equipe: Option<String>,
    pub equipe: Option<String>,
    pub cod_situacao: Option<String>,
    pub data_nasc: Option<NaiveDate>,
    pub data_admissao: Option<NaiveDate>,
}

impl RosterEntry {
    pub fn matches(&self, search: &str) -> bool {
        let search = search.trim();
        search.is_empty() || self.nome.to_lowercase().contains(&search.to_lowercase())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RosterQuery {
    #[serde(default)]
    pub search: Option<String>,
}
