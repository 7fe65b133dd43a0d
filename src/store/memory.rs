//! Process-local store backed by ordered maps

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{group_has_active_members, Store};
use crate::auth::Status;
use crate::error::{Error, Result};
use crate::models::{
    Contract, ContractChanges, Group, GroupChanges, GroupDraft, NewContract, PublicUser,
    RosterEntry, User, UserChanges, UserFilter,
};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    groups: BTreeMap<i64, Group>,
    contracts: BTreeMap<i64, Contract>,
    roster: BTreeMap<String, RosterEntry>,
    next_group_id: i64,
    next_contract_id: i64,
}

impl Tables {
    fn phone_taken(&self, phone: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.phone == phone && Some(u.matricula) != except)
    }

    fn active_members(&self, group_id: i64) -> usize {
        self.users
            .values()
            .filter(|u| u.group_id == Some(group_id) && u.is_active())
            .count()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a roster row; the roster is otherwise read-only
    pub async fn insert_roster_entry(&self, entry: RosterEntry) {
        let mut tables = self.tables.write().await;
        tables.roster.insert(entry.chapa_matricula.clone(), entry);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.phone == phone).cloned())
    }

    async fn get_user(&self, matricula: i64) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&matricula).cloned())
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn insert_user(&self, user: User) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.matricula) {
            return Err(Error::BusinessRule("Matrícula já cadastrada".to_string()));
        }
        if tables.phone_taken(&user.phone, None) {
            return Err(Error::BusinessRule("Telefone já cadastrado".to_string()));
        }
        tables.users.insert(user.matricula, user.clone());
        Ok(user)
    }

    async fn update_user(&self, matricula: i64, changes: UserChanges) -> Result<Option<User>> {
        let mut tables = self.tables.write().await;
        if let Some(phone) = &changes.phone {
            if tables.phone_taken(phone, Some(matricula)) {
                return Err(Error::BusinessRule("Telefone já cadastrado".to_string()));
            }
        }
        Ok(tables.users.get_mut(&matricula).map(|user| {
            user.apply(&changes);
            user.clone()
        }))
    }

    async fn consume_default_password(&self, matricula: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&matricula) else {
            return Ok(false);
        };
        if user.pass_sub || user.default_password_used {
            return Ok(false);
        }
        user.apply(&UserChanges {
            default_password_used: Some(true),
            ..Default::default()
        });
        Ok(true)
    }

    async fn count_active_members(&self, group_id: i64) -> Result<usize> {
        Ok(self.tables.read().await.active_members(group_id))
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(groups)
    }

    async fn get_group(&self, id: i64) -> Result<Option<Group>> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn group_members(&self, group_id: i64) -> Result<Vec<PublicUser>> {
        let tables = self.tables.read().await;
        let mut members: Vec<PublicUser> = tables
            .users
            .values()
            .filter(|u| u.group_id == Some(group_id))
            .map(PublicUser::from)
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    async fn insert_group(&self, draft: GroupDraft) -> Result<Group> {
        let mut tables = self.tables.write().await;
        tables.next_group_id += 1;
        let group = draft.into_group(tables.next_group_id);
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn update_group(&self, id: i64, changes: GroupChanges) -> Result<Option<Group>> {
        let mut tables = self.tables.write().await;
        if !tables.groups.contains_key(&id) {
            return Ok(None);
        }
        if changes.status == Some(Status::Inactive) && tables.active_members(id) > 0 {
            return Err(group_has_active_members());
        }
        Ok(tables.groups.get_mut(&id).map(|group| {
            group.apply(&changes);
            group.clone()
        }))
    }

    async fn list_contracts(&self) -> Result<Vec<Contract>> {
        let tables = self.tables.read().await;
        let mut contracts: Vec<Contract> = tables.contracts.values().cloned().collect();
        contracts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(contracts)
    }

    async fn get_contract(&self, id: i64) -> Result<Option<Contract>> {
        Ok(self.tables.read().await.contracts.get(&id).cloned())
    }

    async fn insert_contract(&self, contract: NewContract) -> Result<Contract> {
        let mut tables = self.tables.write().await;
        let contract = contract.into_contract(tables.next_contract_id + 1)?;
        tables.next_contract_id = contract.id;
        tables.contracts.insert(contract.id, contract.clone());
        Ok(contract)
    }

    async fn update_contract(
        &self,
        id: i64,
        changes: ContractChanges,
    ) -> Result<Option<Contract>> {
        let mut tables = self.tables.write().await;
        let Some(contract) = tables.contracts.get_mut(&id) else {
            return Ok(None);
        };
        contract.check_changes(&changes)?;
        contract.apply(&changes);
        Ok(Some(contract.clone()))
    }

    async fn search_roster(&self, search: &str, limit: usize) -> Result<Vec<RosterEntry>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<RosterEntry> = tables
            .roster
            .values()
            .filter(|e| e.matches(search))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.nome.cmp(&b.nome));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn get_roster_entry(&self, chapa: &str) -> Result<Option<RosterEntry>> {
        Ok(self.tables.read().await.roster.get(chapa).cloned())
    }
}
