//! Contracts, optionally linked to a group

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{nullable, required, Group};
use crate::auth::Status;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Contract {
    pub id: i64,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "numero")]
    pub number: Option<String>,
    #[serde(rename = "nome")]
    pub name: Option<String>,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "valor")]
    pub value: Option<f64>,
    #[serde(rename = "data_inicio")]
    pub starts_on: Option<NaiveDate>,
    #[serde(rename = "data_fim")]
    pub ends_on: Option<NaiveDate>,
    #[serde(rename = "grupo_id")]
    pub group_id: Option<i64>,
    /// Matricula of the general manager
    #[serde(rename = "gerente_geral")]
    pub general_manager: Option<i64>,
    #[serde(rename = "gerente_operacoes")]
    pub operations_manager: Option<i64>,
    #[serde(rename = "coordenador")]
    pub coordinator: Option<i64>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// End date must fall strictly after the start date when both are known
pub fn check_period(starts_on: Option<NaiveDate>, ends_on: Option<NaiveDate>) -> Result<()> {
    if let (Some(start), Some(end)) = (starts_on, ends_on) {
        if end <= start {
            return Err(Error::BadRequest(
                "Data de fim deve ser posterior à data de início".to_string(),
            ));
        }
    }
    Ok(())
}

impl Contract {
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    pub fn apply(&mut self, changes: &ContractChanges) {
        if let Some(code) = &changes.code {
            self.code = code.clone();
        }
        if let Some(number) = &changes.number {
            self.number = number.clone();
        }
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(description) = &changes.description {
            self.description = description.clone();
        }
        if let Some(value) = changes.value {
            self.value = value;
        }
        if let Some(starts_on) = changes.starts_on {
            self.starts_on = starts_on;
        }
        if let Some(ends_on) = changes.ends_on {
            self.ends_on = ends_on;
        }
        if let Some(group_id) = changes.group_id {
            self.group_id = group_id;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }

    /// Validate a change set against this record's current values
    pub fn check_changes(&self, changes: &ContractChanges) -> Result<()> {
        let starts_on = changes.starts_on.unwrap_or(self.starts_on);
        let ends_on = changes.ends_on.unwrap_or(self.ends_on);
        check_period(starts_on, ends_on)
    }
}

/// Contract detail with its group embedded
#[derive(Debug, Clone, Serialize)]
pub struct ContractDetail {
    #[serde(flatten)]
    pub contract: Contract,
    #[serde(rename = "grupos")]
    pub group: Option<Group>,
}

/// Payload for creating a contract
#[derive(Debug, Clone, Deserialize)]
pub struct NewContract {
    #[serde(default)]
    pub codigo: String,
    #[serde(default)]
    pub descricao: String,
    #[serde(default)]
    pub numero: Option<String>,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub valor: Option<f64>,
    #[serde(default)]
    pub data_inicio: Option<NaiveDate>,
    #[serde(default)]
    pub data_fim: Option<NaiveDate>,
    #[serde(default)]
    pub grupo_id: Option<i64>,
    #[serde(default)]
    pub gerente_geral: Option<i64>,
    #[serde(default)]
    pub gerente_operacoes: Option<i64>,
    #[serde(default)]
    pub coordenador: Option<i64>,
}

impl NewContract {
    /// Validate required fields and the period, then build the record
    pub fn into_contract(self, id: i64) -> Result<Contract> {
        const MISSING: &str = "Campos obrigatórios não fornecidos";
        let code = required(&self.codigo, MISSING)?;
        let description = required(&self.descricao, MISSING)?;
        check_period(self.data_inicio, self.data_fim)?;

        let now = Utc::now();
        Ok(Contract {
            id,
            code,
            number: self.numero,
            name: self.nome,
            description,
            value: self.valor,
            starts_on: self.data_inicio,
            ends_on: self.data_fim,
            group_id: self.grupo_id,
            general_manager: self.gerente_geral,
            operations_manager: self.gerente_operacoes,
            coordinator: self.coordenador,
            status: Status::Active,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Payload for updating a contract
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractUpdate {
    #[serde(default)]
    pub codigo: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub numero: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub nome: Option<Option<String>>,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub valor: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub data_inicio: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub data_fim: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub grupo_id: Option<Option<i64>>,
    #[serde(default)]
    pub status: Option<Status>,
}

impl ContractUpdate {
    pub fn into_changes(self) -> Result<ContractChanges> {
        Ok(ContractChanges {
            code: self
                .codigo
                .map(|c| required(&c, "Código não pode ser vazio"))
                .transpose()?,
            number: self.numero,
            name: self.nome,
            description: self
                .descricao
                .map(|d| required(&d, "Descrição não pode ser vazia"))
                .transpose()?,
            value: self.valor,
            starts_on: self.data_inicio,
            ends_on: self.data_fim,
            group_id: self.grupo_id,
            status: self.status,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContractChanges {
    pub code: Option<String>,
    pub number: Option<Option<String>>,
    pub name: Option<Option<String>>,
    pub description: Option<String>,
    pub value: Option<Option<f64>>,
    pub starts_on: Option<Option<NaiveDate>>,
    pub ends_on: Option<Option<NaiveDate>>,
    pub group_id: Option<Option<i64>>,
    pub status: Option<Status>,
}

impl ContractChanges {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn payload(value: serde_json::Value) -> NewContract {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_create_requires_code_and_description() {
        let result = payload(serde_json::json!({ "codigo": "C-1" })).into_contract(1);
        assert!(matches!(result, Err(Error::BadRequest(_))));

        let contract = payload(serde_json::json!({ "codigo": "C-1", "descricao": "Obra" }))
            .into_contract(1)
            .unwrap();
        assert_eq!(contract.code, "C-1");
        assert!(contract.is_active());
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let result = payload(serde_json::json!({
            "codigo": "C-1",
            "descricao": "Obra",
            "data_inicio": "2025-06-01",
            "data_fim": "2025-01-01"
        }))
        .into_contract(1);
        assert!(matches!(result, Err(Error::BadRequest(_))));

        assert!(check_period(Some(date("2025-01-01")), Some(date("2025-01-01"))).is_err());
        assert!(check_period(Some(date("2025-01-01")), Some(date("2025-01-02"))).is_ok());
        assert!(check_period(None, Some(date("2025-01-02"))).is_ok());
    }

    #[test]
    fn test_update_checks_against_stored_dates() {
        let contract = payload(serde_json::json!({
            "codigo": "C-1",
            "descricao": "Obra",
            "data_inicio": "2025-06-01",
            "data_fim": "2025-12-31"
        }))
        .into_contract(1)
        .unwrap();

        let update: ContractUpdate =
            serde_json::from_value(serde_json::json!({ "data_fim": "2025-05-01" })).unwrap();
        let changes = update.into_changes().unwrap();
        assert!(contract.check_changes(&changes).is_err());

        let update: ContractUpdate =
            serde_json::from_value(serde_json::json!({ "data_fim": null })).unwrap();
        let changes = update.into_changes().unwrap();
        assert!(contract.check_changes(&changes).is_ok());
    }
}
