use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::traits::{Storage, StorageError};
use crate::schema::organization::{DepartmentId, DomainId, PairId, PersonId, RoleId};
use crate::schema::{
    AgentStory, BusinessDomain, Department, HumanAgentPair, Person, Role, StoryId,
};

const PAIR: &str = "human-agent pair";

#[derive(Default)]
struct Tables {
    stories: HashMap<StoryId, AgentStory>,
    domains: HashMap<DomainId, BusinessDomain>,
    departments: HashMap<DepartmentId, Department>,
    roles: HashMap<RoleId, Role>,
    people: HashMap<PersonId, Person>,
    pairs: HashMap<PairId, HumanAgentPair>,
}

impl Tables {
    fn check_department(&self, department: &Department) -> Result<()> {
        require(&self.domains, "domain", department.domain_id)
    }

    fn check_role(&self, role: &Role) -> Result<()> {
        require(&self.departments, "department", role.department_id)
    }

    fn check_person(&self, person: &Person) -> Result<()> {
        for role_id in &person.role_ids {
            require(&self.roles, "role", *role_id)?;
        }
        Ok(())
    }

    fn check_pair(&self, pair: &HumanAgentPair) -> Result<()> {
        require(&self.people, "person", pair.person_id)?;
        require(&self.roles, "role", pair.role_id)?;
        require(&self.stories, "story", pair.agent_story_id)
    }
}

fn require<T>(table: &HashMap<Uuid, T>, kind: &'static str, id: Uuid) -> Result<()> {
    if table.contains_key(&id) {
        Ok(())
    } else {
        Err(StorageError::DanglingReference { kind, id }.into())
    }
}

fn insert_new<T>(table: &mut HashMap<Uuid, T>, kind: &'static str, id: Uuid, record: T) -> Result<()> {
    if table.contains_key(&id) {
        return Err(StorageError::Duplicate { kind, id }.into());
    }
    table.insert(id, record);
    log::info!("created {} {}", kind, id);
    Ok(())
}

fn replace<T>(table: &mut HashMap<Uuid, T>, kind: &'static str, id: Uuid, record: T) -> Result<()> {
    match table.get_mut(&id) {
        Some(slot) => {
            *slot = record;
            log::info!("updated {} {}", kind, id);
            Ok(())
        }
        None => Err(StorageError::NotFound { kind, id }.into()),
    }
}

fn remove<T>(table: &mut HashMap<Uuid, T>, kind: &'static str, id: Uuid) -> Result<()> {
    if table.remove(&id).is_none() {
        return Err(StorageError::NotFound { kind, id }.into());
    }
    log::info!("deleted {} {}", kind, id);
    Ok(())
}

fn in_use(kind: &'static str, id: Uuid, by: &'static str) -> anyhow::Error {
    StorageError::InUse { kind, id, by }.into()
}

/// Records ordered by creation time so listings are stable.
fn sorted_by_creation<T: Clone, K: Ord>(
    table: &HashMap<Uuid, T>,
    key: impl Fn(&T) -> K,
) -> Vec<T> {
    let mut records: Vec<T> = table.values().cloned().collect();
    records.sort_by_key(key);
    records
}

/// Process-local store. All tables sit behind one lock so referential
/// checks and the write they guard happen atomically.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StorageError::Poisoned.into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StorageError::Poisoned.into())
    }
}

#[async_trait]
impl Storage for InMemoryStore {
    async fn create_story(&self, story: &AgentStory) -> Result<()> {
        let id = story.id.ok_or(StorageError::MissingId)?;
        insert_new(&mut self.write()?.stories, "story", id, story.clone())
    }

    async fn get_story(&self, id: StoryId) -> Result<Option<AgentStory>> {
        Ok(self.read()?.stories.get(&id).cloned())
    }

    async fn list_stories(&self) -> Result<Vec<AgentStory>> {
        Ok(sorted_by_creation(&self.read()?.stories, |s| {
            (s.created_at, s.name.clone())
        }))
    }

    async fn update_story(&self, story: &AgentStory) -> Result<()> {
        let id = story.id.ok_or(StorageError::MissingId)?;
        replace(&mut self.write()?.stories, "story", id, story.clone())
    }

    async fn delete_story(&self, id: StoryId) -> Result<()> {
        let mut tables = self.write()?;
        if tables.pairs.values().any(|p| p.agent_story_id == id) {
            return Err(in_use("story", id, PAIR));
        }
        remove(&mut tables.stories, "story", id)
    }

    async fn create_domain(&self, domain: &BusinessDomain) -> Result<()> {
        insert_new(&mut self.write()?.domains, "domain", domain.id, domain.clone())
    }

    async fn get_domain(&self, id: DomainId) -> Result<Option<BusinessDomain>> {
        Ok(self.read()?.domains.get(&id).cloned())
    }

    async fn list_domains(&self) -> Result<Vec<BusinessDomain>> {
        Ok(sorted_by_creation(&self.read()?.domains, |d| d.created_at))
    }

    async fn update_domain(&self, domain: &BusinessDomain) -> Result<()> {
        replace(&mut self.write()?.domains, "domain", domain.id, domain.clone())
    }

    async fn delete_domain(&self, id: DomainId) -> Result<()> {
        let mut tables = self.write()?;
        if tables.departments.values().any(|d| d.domain_id == id) {
            return Err(in_use("domain", id, "department"));
        }
        remove(&mut tables.domains, "domain", id)
    }

    async fn create_department(&self, department: &Department) -> Result<()> {
        let mut tables = self.write()?;
        tables.check_department(department)?;
        insert_new(&mut tables.departments, "department", department.id, department.clone())
    }

    async fn get_department(&self, id: DepartmentId) -> Result<Option<Department>> {
        Ok(self.read()?.departments.get(&id).cloned())
    }

    async fn list_departments(&self) -> Result<Vec<Department>> {
        Ok(sorted_by_creation(&self.read()?.departments, |d| d.created_at))
    }

    async fn update_department(&self, department: &Department) -> Result<()> {
        let mut tables = self.write()?;
        tables.check_department(department)?;
        replace(&mut tables.departments, "department", department.id, department.clone())
    }

    async fn delete_department(&self, id: DepartmentId) -> Result<()> {
        let mut tables = self.write()?;
        if tables.roles.values().any(|r| r.department_id == id) {
            return Err(in_use("department", id, "role"));
        }
        remove(&mut tables.departments, "department", id)
    }

    async fn create_role(&self, role: &Role) -> Result<()> {
        let mut tables = self.write()?;
        tables.check_role(role)?;
        insert_new(&mut tables.roles, "role", role.id, role.clone())
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>> {
        Ok(self.read()?.roles.get(&id).cloned())
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(sorted_by_creation(&self.read()?.roles, |r| r.created_at))
    }

    async fn update_role(&self, role: &Role) -> Result<()> {
        let mut tables = self.write()?;
        tables.check_role(role)?;
        replace(&mut tables.roles, "role", role.id, role.clone())
    }

    async fn delete_role(&self, id: RoleId) -> Result<()> {
        let mut tables = self.write()?;
        if tables.people.values().any(|p| p.role_ids.contains(&id)) {
            return Err(in_use("role", id, "person"));
        }
        if tables.pairs.values().any(|p| p.role_id == id) {
            return Err(in_use("role", id, PAIR));
        }
        remove(&mut tables.roles, "role", id)
    }

    async fn create_person(&self, person: &Person) -> Result<()> {
        let mut tables = self.write()?;
        tables.check_person(person)?;
        insert_new(&mut tables.people, "person", person.id, person.clone())
    }

    async fn get_person(&self, id: PersonId) -> Result<Option<Person>> {
        Ok(self.read()?.people.get(&id).cloned())
    }

    async fn list_people(&self) -> Result<Vec<Person>> {
        Ok(sorted_by_creation(&self.read()?.people, |p| p.created_at))
    }

    async fn update_person(&self, person: &Person) -> Result<()> {
        let mut tables = self.write()?;
        tables.check_person(person)?;
        replace(&mut tables.people, "person", person.id, person.clone())
    }

    async fn delete_person(&self, id: PersonId) -> Result<()> {
        let mut tables = self.write()?;
        if tables.pairs.values().any(|p| p.person_id == id) {
            return Err(in_use("person", id, PAIR));
        }
        remove(&mut tables.people, "person", id)
    }

    async fn create_pair(&self, pair: &HumanAgentPair) -> Result<()> {
        let mut tables = self.write()?;
        tables.check_pair(pair)?;
        insert_new(&mut tables.pairs, PAIR, pair.id, pair.clone())
    }

    async fn get_pair(&self, id: PairId) -> Result<Option<HumanAgentPair>> {
        Ok(self.read()?.pairs.get(&id).cloned())
    }

    async fn list_pairs(&self) -> Result<Vec<HumanAgentPair>> {
        Ok(sorted_by_creation(&self.read()?.pairs, |p| p.created_at))
    }

    async fn update_pair(&self, pair: &HumanAgentPair) -> Result<()> {
        let mut tables = self.write()?;
        tables.check_pair(pair)?;
        replace(&mut tables.pairs, PAIR, pair.id, pair.clone())
    }

    async fn delete_pair(&self, id: PairId) -> Result<()> {
        remove(&mut self.write()?.pairs, PAIR, id)
    }
}
