//! PostgreSQL store
//!
//! Every call is bounded by the configured timeout. A timeout surfaces as
//! [`Error::Timeout`], a dropped or refused connection as [`Error::Unavailable`].

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls, Row};

use super::{group_has_active_members, Store};
use crate::auth::Status;
use crate::error::{Error, Result};
use crate::models::{
    Contract, ContractChanges, DashboardStats, Group, GroupChanges, GroupDraft, NewContract,
    PublicUser, RosterEntry, User, UserChanges, UserFilter,
};

/// Bundled schema, applied by `academia migrate`
pub const SCHEMA: &str = include_str!("schema.sql");

const USER_COLUMNS: &str = "matricula, nome, email, telefone, role, status, grupo_id, \
     contrato_id, password_hash, pass_sub, default_password_used, funcao, escolaridade, \
     estado_civil, data_nascimento, created_at, updated_at";

const GROUP_COLUMNS: &str = "id, grupo, nome, descricao, desafiado, status, created_at, updated_at";

const CONTRACT_COLUMNS: &str = "id, codigo, numero, nome, descricao, valor, data_inicio, \
     data_fim, grupo_id, gerente_geral, gerente_operacoes, coordenador, status, created_at, \
     updated_at";

const ROSTER_COLUMNS: &str = "chapa_matricula, nome, cod_funcao, funcao, cod_equipe, equipe, \
     cod_situacao, data_nasc, data_admissao";

pub struct PostgresStore {
    client: Client,
    timeout: Duration,
}

impl PostgresStore {
    /// Connect and spawn the connection driver
    pub async fn connect(url: &str, timeout_secs: u64) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let (client, connection) =
            tokio::time::timeout(timeout, tokio_postgres::connect(url, NoTls))
                .await
                .map_err(|_| Error::Timeout(timeout_secs))?
                .map_err(|e| Error::Unavailable(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        tracing::info!(timeout_secs, "Connected to PostgreSQL");
        Ok(Self { client, timeout })
    }

    /// Apply the bundled schema
    pub async fn migrate(&self) -> Result<()> {
        self.bounded(self.client.batch_execute(SCHEMA)).await?;
        tracing::info!("Database schema applied");
        Ok(())
    }

    async fn bounded<T, F>(&self, query: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, tokio_postgres::Error>>,
    {
        match tokio::time::timeout(self.timeout, query).await {
            Err(_) => Err(Error::Timeout(self.timeout.as_secs())),
            Ok(result) => result.map_err(map_pg_error),
        }
    }
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn map_pg_error(err: tokio_postgres::Error) -> Error {
    if err.is_closed() {
        return Error::Unavailable(err.to_string());
    }
    match err.code() {
        Some(code) if *code == SqlState::UNIQUE_VIOLATION => {
            let message = match err.as_db_error().and_then(|db| db.constraint()) {
                Some("usuarios_pkey") => "Matrícula já cadastrada",
                Some("usuarios_telefone_key") => "Telefone já cadastrado",
                _ => "Registro duplicado",
            };
            Error::BusinessRule(message.to_string())
        }
        Some(code) if *code == SqlState::FOREIGN_KEY_VIOLATION => {
            Error::BadRequest("Grupo ou contrato referenciado não existe".to_string())
        }
        Some(code) if *code == SqlState::CHECK_VIOLATION => {
            Error::BadRequest("Dados inválidos".to_string())
        }
        _ => Error::Database(err),
    }
}

fn parse_column<T>(row: &Row, column: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    let value: String = row.try_get(column)?;
    value.parse().map_err(Error::Other)
}

fn user_from_row(row: &Row) -> Result<User> {
    Ok(User {
        matricula: row.try_get("matricula")?,
        name: row.try_get("nome")?,
        email: row.try_get("email")?,
        phone: row.try_get("telefone")?,
        role: parse_column(row, "role")?,
        status: parse_column(row, "status")?,
        group_id: row.try_get("grupo_id")?,
        contract_id: row.try_get("contrato_id")?,
        password_hash: row.try_get("password_hash")?,
        pass_sub: row.try_get("pass_sub")?,
        default_password_used: row.try_get("default_password_used")?,
        job_title: row.try_get("funcao")?,
        education: row.try_get("escolaridade")?,
        marital_status: row.try_get("estado_civil")?,
        birth_date: row.try_get("data_nascimento")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn group_from_row(row: &Row) -> Result<Group> {
    Ok(Group {
        id: row.try_get("id")?,
        code: row.try_get("grupo")?,
        name: row.try_get("nome")?,
        description: row.try_get("descricao")?,
        challenged: row.try_get("desafiado")?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn contract_from_row(row: &Row) -> Result<Contract> {
    Ok(Contract {
        id: row.try_get("id")?,
        code: row.try_get("codigo")?,
        number: row.try_get("numero")?,
        name: row.try_get("nome")?,
        description: row.try_get("descricao")?,
        value: row.try_get("valor")?,
        starts_on: row.try_get("data_inicio")?,
        ends_on: row.try_get("data_fim")?,
        group_id: row.try_get("grupo_id")?,
        general_manager: row.try_get("gerente_geral")?,
        operations_manager: row.try_get("gerente_operacoes")?,
        coordinator: row.try_get("coordenador")?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn roster_from_row(row: &Row) -> Result<RosterEntry> {
    Ok(RosterEntry {
        chapa_matricula: row.try_get("chapa_matricula")?,
        nome: row.try_get("nome")?,
        cod_funcao: row.try_get("cod_funcao")?,
        funcao: row.try_get("funcao")?,
        cod_equipe: row.try_get("cod_equipe")?,
        equipe: row.try_get("equipe")?,
        cod_situacao: row.try_get("cod_situacao")?,
        data_nasc: row.try_get("data_nasc")?,
        data_admissao: row.try_get("data_admissao")?,
    })
}

fn rows_into<T>(rows: &[Row], convert: fn(&Row) -> Result<T>) -> Result<Vec<T>> {
    rows.iter().map(convert).collect()
}

#[async_trait]
impl Store for PostgresStore {
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM usuarios WHERE telefone = $1", USER_COLUMNS);
        let row = self.bounded(self.client.query_opt(&sql, &[&phone])).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user(&self, matricula: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM usuarios WHERE matricula = $1", USER_COLUMNS);
        let row = self.bounded(self.client.query_opt(&sql, &[&matricula])).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {} FROM usuarios \
             WHERE ($1::text IS NULL \
                    OR nome ILIKE '%' || $1 || '%' \
                    OR email ILIKE '%' || $1 || '%' \
                    OR telefone LIKE '%' || $1 || '%') \
               AND ($2::text IS NULL OR role = $2) \
               AND ($3::text IS NULL OR status = $3) \
               AND ($4::bigint IS NULL OR grupo_id = $4) \
               AND ($5::bigint IS NULL OR contrato_id = $5) \
             ORDER BY nome",
            USER_COLUMNS
        );
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let role = filter.role.map(|r| r.as_str());
        let status = filter.status.map(|s| s.as_str());

        let rows = self
            .bounded(self.client.query(
                &sql,
                &[&search, &role, &status, &filter.grupo_id, &filter.contrato_id],
            ))
            .await?;
        rows_into(&rows, user_from_row)
    }

    async fn insert_user(&self, user: User) -> Result<User> {
        let sql = format!(
            "INSERT INTO usuarios ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {}",
            USER_COLUMNS, USER_COLUMNS
        );
        let role = user.role.as_str();
        let status = user.status.as_str();

        let row = self
            .bounded(self.client.query_one(
                &sql,
                &[
                    &user.matricula,
                    &user.name,
                    &user.email,
                    &user.phone,
                    &role,
                    &status,
                    &user.group_id,
                    &user.contract_id,
                    &user.password_hash,
                    &user.pass_sub,
                    &user.default_password_used,
                    &user.job_title,
                    &user.education,
                    &user.marital_status,
                    &user.birth_date,
                    &user.created_at,
                    &user.updated_at,
                ],
            ))
            .await?;
        user_from_row(&row)
    }

    async fn update_user(&self, matricula: i64, changes: UserChanges) -> Result<Option<User>> {
        let sql = format!(
            "UPDATE usuarios SET \
                nome = COALESCE($2::text, nome), \
                email = COALESCE($3::text, email), \
                telefone = COALESCE($4::text, telefone), \
                role = COALESCE($5::text, role), \
                status = COALESCE($6::text, status), \
                grupo_id = CASE WHEN $7::boolean THEN $8::bigint ELSE grupo_id END, \
                contrato_id = CASE WHEN $9::boolean THEN $10::bigint ELSE contrato_id END, \
                password_hash = COALESCE($11::text, password_hash), \
                pass_sub = COALESCE($12::boolean, pass_sub), \
                default_password_used = COALESCE($13::boolean, default_password_used), \
                updated_at = now() \
             WHERE matricula = $1 \
             RETURNING {}",
            USER_COLUMNS
        );
        let role = changes.role.map(|r| r.as_str());
        let status = changes.status.map(|s| s.as_str());
        let set_group = changes.group_id.is_some();
        let group_id = changes.group_id.flatten();
        let set_contract = changes.contract_id.is_some();
        let contract_id = changes.contract_id.flatten();

        let row = self
            .bounded(self.client.query_opt(
                &sql,
                &[
                    &matricula,
                    &changes.name,
                    &changes.email,
                    &changes.phone,
                    &role,
                    &status,
                    &set_group,
                    &group_id,
                    &set_contract,
                    &contract_id,
                    &changes.password_hash,
                    &changes.pass_sub,
                    &changes.default_password_used,
                ],
            ))
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn consume_default_password(&self, matricula: i64) -> Result<bool> {
        let row = self
            .bounded(self.client.query_opt(
                "UPDATE usuarios SET default_password_used = true, updated_at = now() \
                 WHERE matricula = $1 AND NOT default_password_used AND NOT pass_sub \
                 RETURNING matricula",
                &[&matricula],
            ))
            .await?;
        Ok(row.is_some())
    }

    async fn count_active_members(&self, group_id: i64) -> Result<usize> {
        let row = self
            .bounded(self.client.query_one(
                "SELECT COUNT(*) FROM usuarios WHERE grupo_id = $1 AND status = 'ativo'",
                &[&group_id],
            ))
            .await?;
        let count: i64 = row.try_get(0)?;
        Ok(count as usize)
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let sql = format!("SELECT {} FROM grupos ORDER BY grupo", GROUP_COLUMNS);
        let rows = self.bounded(self.client.query(&sql, &[])).await?;
        rows_into(&rows, group_from_row)
    }

    async fn get_group(&self, id: i64) -> Result<Option<Group>> {
        let sql = format!("SELECT {} FROM grupos WHERE id = $1", GROUP_COLUMNS);
        let row = self.bounded(self.client.query_opt(&sql, &[&id])).await?;
        row.as_ref().map(group_from_row).transpose()
    }

    async fn group_members(&self, group_id: i64) -> Result<Vec<PublicUser>> {
        let sql = format!(
            "SELECT {} FROM usuarios WHERE grupo_id = $1 ORDER BY nome",
            USER_COLUMNS
        );
        let rows = self.bounded(self.client.query(&sql, &[&group_id])).await?;
        let users = rows_into(&rows, user_from_row)?;
        Ok(users.iter().map(PublicUser::from).collect())
    }

    async fn insert_group(&self, draft: GroupDraft) -> Result<Group> {
        let sql = format!(
            "INSERT INTO grupos (grupo, nome, descricao, desafiado) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            GROUP_COLUMNS
        );
        let row = self
            .bounded(self.client.query_one(
                &sql,
                &[&draft.code, &draft.name, &draft.description, &draft.challenged],
            ))
            .await?;
        group_from_row(&row)
    }

    async fn update_group(&self, id: i64, changes: GroupChanges) -> Result<Option<Group>> {
        let sql = format!(
            "UPDATE grupos SET \
                grupo = COALESCE($2::text, grupo), \
                nome = COALESCE($3::text, nome), \
                descricao = CASE WHEN $4::boolean THEN $5::text ELSE descricao END, \
                desafiado = COALESCE($6::boolean, desafiado), \
                status = COALESCE($7::text, status), \
                updated_at = now() \
             WHERE id = $1 \
               AND (COALESCE($7::text, '') <> 'inativo' \
                    OR NOT EXISTS (SELECT 1 FROM usuarios \
                                   WHERE grupo_id = $1 AND status = 'ativo')) \
             RETURNING {}",
            GROUP_COLUMNS
        );
        let set_description = changes.description.is_some();
        let description = changes.description.clone().flatten();
        let status = changes.status.map(|s| s.as_str());

        let row = self
            .bounded(self.client.query_opt(
                &sql,
                &[
                    &id,
                    &changes.code,
                    &changes.name,
                    &set_description,
                    &description,
                    &changes.challenged,
                    &status,
                ],
            ))
            .await?;
        if let Some(row) = row {
            return group_from_row(&row).map(Some);
        }

        // No row: either the group is missing or the member guard refused it
        if changes.status == Some(Status::Inactive) && self.get_group(id).await?.is_some() {
            let active = self.count_active_members(id).await?;
            tracing::debug!(group = id, active, "Refusing to deactivate group");
            return Err(group_has_active_members());
        }
        Ok(None)
    }

    async fn list_contracts(&self) -> Result<Vec<Contract>> {
        let sql = format!(
            "SELECT {} FROM contratos ORDER BY created_at DESC, id DESC",
            CONTRACT_COLUMNS
        );
        let rows = self.bounded(self.client.query(&sql, &[])).await?;
        rows_into(&rows, contract_from_row)
    }

    async fn get_contract(&self, id: i64) -> Result<Option<Contract>> {
        let sql = format!("SELECT {} FROM contratos WHERE id = $1", CONTRACT_COLUMNS);
        let row = self.bounded(self.client.query_opt(&sql, &[&id])).await?;
        row.as_ref().map(contract_from_row).transpose()
    }

    async fn insert_contract(&self, contract: NewContract) -> Result<Contract> {
        // The id is assigned by the sequence
        let draft = contract.into_contract(0)?;
        let sql = format!(
            "INSERT INTO contratos (codigo, numero, nome, descricao, valor, data_inicio, data_fim, \
                grupo_id, gerente_geral, gerente_operacoes, coordenador, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {}",
            CONTRACT_COLUMNS
        );
        let status = draft.status.as_str();

        let row = self
            .bounded(self.client.query_one(
                &sql,
                &[
                    &draft.code,
                    &draft.number,
                    &draft.name,
                    &draft.description,
                    &draft.value,
                    &draft.starts_on,
                    &draft.ends_on,
                    &draft.group_id,
                    &draft.general_manager,
                    &draft.operations_manager,
                    &draft.coordinator,
                    &status,
                ],
            ))
            .await?;
        contract_from_row(&row)
    }

    async fn update_contract(
        &self,
        id: i64,
        changes: ContractChanges,
    ) -> Result<Option<Contract>> {
        let Some(current) = self.get_contract(id).await? else {
            return Ok(None);
        };
        current.check_changes(&changes)?;

        let sql = format!(
            "UPDATE contratos SET \
                codigo = COALESCE($2::text, codigo), \
                numero = CASE WHEN $3::boolean THEN $4::text ELSE numero END, \
                nome = CASE WHEN $5::boolean THEN $6::text ELSE nome END, \
                descricao = COALESCE($7::text, descricao), \
                valor = CASE WHEN $8::boolean THEN $9::double precision ELSE valor END, \
                data_inicio = CASE WHEN $10::boolean THEN $11::date ELSE data_inicio END, \
                data_fim = CASE WHEN $12::boolean THEN $13::date ELSE data_fim END, \
                grupo_id = CASE WHEN $14::boolean THEN $15::bigint ELSE grupo_id END, \
                status = COALESCE($16::text, status), \
                updated_at = now() \
             WHERE id = $1 \
             RETURNING {}",
            CONTRACT_COLUMNS
        );
        let set_number = changes.number.is_some();
        let number = changes.number.clone().flatten();
        let set_name = changes.name.is_some();
        let name = changes.name.clone().flatten();
        let set_value = changes.value.is_some();
        let value = changes.value.flatten();
        let set_start = changes.starts_on.is_some();
        let starts_on = changes.starts_on.flatten();
        let set_end = changes.ends_on.is_some();
        let ends_on = changes.ends_on.flatten();
        let set_group = changes.group_id.is_some();
        let group_id = changes.group_id.flatten();
        let status = changes.status.map(|s| s.as_str());

        let row = self
            .bounded(self.client.query_opt(
                &sql,
                &[
                    &id,
                    &changes.code,
                    &set_number,
                    &number,
                    &set_name,
                    &name,
                    &changes.description,
                    &set_value,
                    &value,
                    &set_start,
                    &starts_on,
                    &set_end,
                    &ends_on,
                    &set_group,
                    &group_id,
                    &status,
                ],
            ))
            .await?;
        row.as_ref().map(contract_from_row).transpose()
    }

    async fn search_roster(&self, search: &str, limit: usize) -> Result<Vec<RosterEntry>> {
        let sql = format!(
            "SELECT {} FROM rm_apoio WHERE nome ILIKE '%' || $1 || '%' ORDER BY nome LIMIT $2",
            ROSTER_COLUMNS
        );
        let search = search.trim();
        let limit = limit as i64;
        let rows = self
            .bounded(self.client.query(&sql, &[&search, &limit]))
            .await?;
        rows_into(&rows, roster_from_row)
    }

    async fn get_roster_entry(&self, chapa: &str) -> Result<Option<RosterEntry>> {
        let sql = format!(
            "SELECT {} FROM rm_apoio WHERE chapa_matricula = $1",
            ROSTER_COLUMNS
        );
        let row = self.bounded(self.client.query_opt(&sql, &[&chapa])).await?;
        row.as_ref().map(roster_from_row).transpose()
    }

    async fn stats(&self) -> Result<DashboardStats> {
        let row = self
            .bounded(self.client.query_one(
                "SELECT \
                    (SELECT COUNT(*) FROM usuarios), \
                    (SELECT COUNT(*) FROM usuarios WHERE status = 'ativo'), \
                    (SELECT COUNT(*) FROM grupos), \
                    (SELECT COUNT(*) FROM grupos WHERE status = 'ativo'), \
                    (SELECT COUNT(*) FROM grupos WHERE desafiado), \
                    (SELECT COUNT(*) FROM contratos), \
                    (SELECT COUNT(*) FROM contratos WHERE status = 'ativo')",
                &[],
            ))
            .await?;
        let count = |idx: usize| -> Result<usize> {
            let value: i64 = row.try_get(idx)?;
            Ok(value as usize)
        };

        Ok(DashboardStats {
            total_usuarios: count(0)?,
            usuarios_ativos: count(1)?,
            total_grupos: count(2)?,
            grupos_ativos: count(3)?,
            grupos_desafiados: count(4)?,
            total_contratos: count(5)?,
            contratos_ativos: count(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_defines_all_tables() {
        for table in ["usuarios", "grupos", "contratos", "rm_apoio"] {
            assert!(
                SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {}", table)),
                "missing table {}",
                table
            );
        }
        assert!(SCHEMA.contains("usuarios_telefone_key"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // Port 1 on loopback refuses connections
        let result = PostgresStore::connect("host=127.0.0.1 port=1 user=postgres", 5).await;
        assert!(matches!(
            result,
            Err(Error::Unavailable(_)) | Err(Error::Timeout(_))
        ));
    }
}
