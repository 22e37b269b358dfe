//! Organization chart records: domains, departments, roles, people, and the
//! human-agent pairs that tie a person's role to an agent story.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StoryId;

pub type DomainId = Uuid;
pub type DepartmentId = Uuid;
pub type RoleId = Uuid;
pub type PersonId = Uuid;
pub type PairId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDomain {
    pub id: DomainId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BusinessDomain {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: DomainId::new_v4(),
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: DepartmentId,
    pub domain_id: DomainId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Department {
    pub fn new(domain_id: DomainId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: DepartmentId::new_v4(),
            domain_id,
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub department_id: DepartmentId,
    pub title: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(department_id: DepartmentId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: RoleId::new_v4(),
            department_id,
            title: title.into(),
            responsibilities: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role_ids: Vec<RoleId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    pub fn new(name: impl Into<String>, role_ids: Vec<RoleId>) -> Self {
        let now = Utc::now();
        Self {
            id: PersonId::new_v4(),
            name: name.into(),
            email: None,
            role_ids,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPhase {
    Manage,
    Define,
    Perform,
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseOwner {
    Human,
    Agent,
}

/// Who owns each phase of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseAssignments {
    pub manage: PhaseOwner,
    pub define: PhaseOwner,
    pub perform: PhaseOwner,
    pub review: PhaseOwner,
}

impl Default for PhaseAssignments {
    fn default() -> Self {
        Self {
            manage: PhaseOwner::Human,
            define: PhaseOwner::Human,
            perform: PhaseOwner::Agent,
            review: PhaseOwner::Human,
        }
    }
}

impl PhaseAssignments {
    pub fn owner(&self, phase: TaskPhase) -> PhaseOwner {
        match phase {
            TaskPhase::Manage => self.manage,
            TaskPhase::Define => self.define,
            TaskPhase::Perform => self.perform,
            TaskPhase::Review => self.review,
        }
    }

    pub fn agent_phases(&self) -> Vec<TaskPhase> {
        [
            TaskPhase::Manage,
            TaskPhase::Define,
            TaskPhase::Perform,
            TaskPhase::Review,
        ]
        .into_iter()
        .filter(|phase| self.owner(*phase) == PhaseOwner::Agent)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignment {
    pub task: String,
    #[serde(default)]
    pub phases: PhaseAssignments,
}

/// Links a person acting in a role to the agent story that pairs with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanAgentPair {
    pub id: PairId,
    pub person_id: PersonId,
    pub role_id: RoleId,
    pub agent_story_id: StoryId,
    #[serde(default)]
    pub tasks: Vec<TaskAssignment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HumanAgentPair {
    pub fn new(person_id: PersonId, role_id: RoleId, agent_story_id: StoryId) -> Self {
        let now = Utc::now();
        Self {
            id: PairId::new_v4(),
            person_id,
            role_id,
            agent_story_id,
            tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
