//! Data store seam
//!
//! Handlers only talk to [`Store`]. The in-memory backend serves development
//! and tests; the PostgreSQL backend serves production.

mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{
    Contract, ContractChanges, DashboardStats, Group, GroupChanges, GroupDraft, NewContract,
    PublicUser, RosterEntry, User, UserChanges, UserFilter,
};

/// Refusal for deactivating a group that still has active members
pub fn group_has_active_members() -> Error {
    Error::BusinessRule("Não é possível desativar grupo com usuários ativos".to_string())
}

#[async_trait]
pub trait Store: Send + Sync {
    // Users

    /// Look up a user by normalized phone number
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>>;

    async fn get_user(&self, matricula: i64) -> Result<Option<User>>;

    /// Users matching the filter, ordered by name
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>>;

    /// Insert a new user. A taken matricula or phone is a business-rule error.
    async fn insert_user(&self, user: User) -> Result<User>;

    /// Apply changes; `None` when no such user exists
    async fn update_user(&self, matricula: i64, changes: UserChanges) -> Result<Option<User>>;

    /// Mark the initial password as used, in one step with the check.
    ///
    /// `true` only for the call that flips `default_password_used`; `false`
    /// when it was already used, the password was replaced, or no such user.
    async fn consume_default_password(&self, matricula: i64) -> Result<bool>;

    async fn count_active_members(&self, group_id: i64) -> Result<usize>;

    // Groups

    /// All groups ordered by code
    async fn list_groups(&self) -> Result<Vec<Group>>;

    async fn get_group(&self, id: i64) -> Result<Option<Group>>;

    /// Users of a group, ordered by name
    async fn group_members(&self, group_id: i64) -> Result<Vec<PublicUser>>;

    async fn insert_group(&self, draft: GroupDraft) -> Result<Group>;

    /// Apply changes; `None` when no such group exists.
    ///
    /// A change to inactive is refused with [`group_has_active_members`] while
    /// any active user belongs to the group; check and write are one step.
    async fn update_group(&self, id: i64, changes: GroupChanges) -> Result<Option<Group>>;

    // Contracts

    /// All contracts, newest first
    async fn list_contracts(&self) -> Result<Vec<Contract>>;

    async fn get_contract(&self, id: i64) -> Result<Option<Contract>>;

    async fn insert_contract(&self, contract: NewContract) -> Result<Contract>;

    async fn update_contract(&self, id: i64, changes: ContractChanges)
        -> Result<Option<Contract>>;

    // Roster

    /// Entries whose name contains `search`, ordered by name, at most `limit`
    async fn search_roster(&self, search: &str, limit: usize) -> Result<Vec<RosterEntry>>;

    async fn get_roster_entry(&self, chapa: &str) -> Result<Option<RosterEntry>>;

    /// Dashboard totals
    async fn stats(&self) -> Result<DashboardStats> {
        let users = self.list_users(&UserFilter::default()).await?;
        let groups = self.list_groups().await?;
        let contracts = self.list_contracts().await?;

        Ok(DashboardStats {
            total_usuarios: users.len(),
            usuarios_ativos: users.iter().filter(|u| u.is_active()).count(),
            total_grupos: groups.len(),
            grupos_ativos: groups.iter().filter(|g| g.is_active()).count(),
            grupos_desafiados: groups.iter().filter(|g| g.challenged).count(),
            total_contratos: contracts.len(),
            contratos_ativos: contracts.iter().filter(|c| c.is_active()).count(),
        })
    }
}
