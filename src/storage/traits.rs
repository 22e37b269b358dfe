use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::schema::organization::{DepartmentId, DomainId, PairId, PersonId, RoleId};
use crate::schema::{
    AgentStory, BusinessDomain, Department, HumanAgentPair, Person, Role, StoryId,
};

/// Failures a store reports through `anyhow`; callers that need to react to
/// them (the HTTP layer) downcast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("{kind} {id} already exists")]
    Duplicate { kind: &'static str, id: Uuid },

    #[error("referenced {kind} {id} does not exist")]
    DanglingReference { kind: &'static str, id: Uuid },

    #[error("{kind} {id} is still referenced by a {by}")]
    InUse {
        kind: &'static str,
        id: Uuid,
        by: &'static str,
    },

    #[error("story has no id; stamp it before storing")]
    MissingId,

    #[error("storage lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait Storage: Send + Sync {
    // Story operations
    async fn create_story(&self, story: &AgentStory) -> Result<()>;
    async fn get_story(&self, id: StoryId) -> Result<Option<AgentStory>>;
    async fn list_stories(&self) -> Result<Vec<AgentStory>>;
    async fn update_story(&self, story: &AgentStory) -> Result<()>;
    async fn delete_story(&self, id: StoryId) -> Result<()>;

    // Organization chart
    async fn create_domain(&self, domain: &BusinessDomain) -> Result<()>;
    async fn get_domain(&self, id: DomainId) -> Result<Option<BusinessDomain>>;
    async fn list_domains(&self) -> Result<Vec<BusinessDomain>>;
    async fn update_domain(&self, domain: &BusinessDomain) -> Result<()>;
    async fn delete_domain(&self, id: DomainId) -> Result<()>;

    async fn create_department(&self, department: &Department) -> Result<()>;
    async fn get_department(&self, id: DepartmentId) -> Result<Option<Department>>;
    async fn list_departments(&self) -> Result<Vec<Department>>;
    async fn update_department(&self, department: &Department) -> Result<()>;
    async fn delete_department(&self, id: DepartmentId) -> Result<()>;

    async fn create_role(&self, role: &Role) -> Result<()>;
    async fn get_role(&self, id: RoleId) -> Result<Option<Role>>;
    async fn list_roles(&self) -> Result<Vec<Role>>;
    async fn update_role(&self, role: &Role) -> Result<()>;
    async fn delete_role(&self, id: RoleId) -> Result<()>;

    async fn create_person(&self, person: &Person) -> Result<()>;
    async fn get_person(&self, id: PersonId) -> Result<Option<Person>>;
    async fn list_people(&self) -> Result<Vec<Person>>;
    async fn update_person(&self, person: &Person) -> Result<()>;
    async fn delete_person(&self, id: PersonId) -> Result<()>;

    async fn create_pair(&self, pair: &HumanAgentPair) -> Result<()>;
    async fn get_pair(&self, id: PairId) -> Result<Option<HumanAgentPair>>;
    async fn list_pairs(&self) -> Result<Vec<HumanAgentPair>>;
    async fn update_pair(&self, pair: &HumanAgentPair) -> Result<()>;
    async fn delete_pair(&self, id: PairId) -> Result<()>;
}
