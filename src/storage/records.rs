//! Uniform access to organization records so the HTTP layer can serve all
//! five kinds with the same handlers.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::Storage;
use crate::schema::{merge_patch, BusinessDomain, Department, HumanAgentPair, Person, Role};

/// Keys the store owns; client input never overrides them.
const MANAGED_KEYS: &[&str] = &["id", "createdAt", "updatedAt"];

#[async_trait]
pub trait OrgRecord: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: &'static str;

    fn id(&self) -> Uuid;

    async fn insert(&self, storage: &dyn Storage) -> Result<()>;
    async fn fetch(storage: &dyn Storage, id: Uuid) -> Result<Option<Self>>;
    async fn list(storage: &dyn Storage) -> Result<Vec<Self>>;
    async fn replace(&self, storage: &dyn Storage) -> Result<()>;
    async fn remove(storage: &dyn Storage, id: Uuid) -> Result<()>;

    /// Build a new record from client input, assigning id and timestamps.
    fn from_input(mut input: Value) -> Result<Self, serde_json::Error> {
        let now = serde_json::to_value(Utc::now())?;
        if let Value::Object(fields) = &mut input {
            for key in MANAGED_KEYS {
                fields.remove(*key);
            }
            fields.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
            fields.insert("createdAt".to_string(), now.clone());
            fields.insert("updatedAt".to_string(), now);
        }
        serde_json::from_value(input)
    }

    /// Merge-patch `changes` into this record, keeping managed keys and
    /// refreshing `updatedAt`.
    fn patched(&self, changes: &Value) -> Result<Self, serde_json::Error> {
        let mut doc = serde_json::to_value(self)?;
        let mut changes = changes.clone();
        if let Value::Object(fields) = &mut changes {
            for key in MANAGED_KEYS {
                fields.remove(*key);
            }
        }
        merge_patch(&mut doc, &changes);
        doc["updatedAt"] = serde_json::to_value(Utc::now())?;
        serde_json::from_value(doc)
    }
}

#[async_trait]
impl OrgRecord for BusinessDomain {
    const KIND: &'static str = "domain";

    fn id(&self) -> Uuid {
        self.id
    }

    async fn insert(&self, storage: &dyn Storage) -> Result<()> {
        storage.create_domain(self).await
    }

    async fn fetch(storage: &dyn Storage, id: Uuid) -> Result<Option<Self>> {
        storage.get_domain(id).await
    }

    async fn list(storage: &dyn Storage) -> Result<Vec<Self>> {
        storage.list_domains().await
    }

    async fn replace(&self, storage: &dyn Storage) -> Result<()> {
        storage.update_domain(self).await
    }

    async fn remove(storage: &dyn Storage, id: Uuid) -> Result<()> {
        storage.delete_domain(id).await
    }
}

#[async_trait]
impl OrgRecord for Department {
    const KIND: &'static str = "department";

    fn id(&self) -> Uuid {
        self.id
    }

    async fn insert(&self, storage: &dyn Storage) -> Result<()> {
        storage.create_department(self).await
    }

    async fn fetch(storage: &dyn Storage, id: Uuid) -> Result<Option<Self>> {
        storage.get_department(id).await
    }

    async fn list(storage: &dyn Storage) -> Result<Vec<Self>> {
        storage.list_departments().await
    }

    async fn replace(&self, storage: &dyn Storage) -> Result<()> {
        storage.update_department(self).await
    }

    async fn remove(storage: &dyn Storage, id: Uuid) -> Result<()> {
        storage.delete_department(id).await
    }
}

#[async_trait]
impl OrgRecord for Role {
    const KIND: &'static str = "role";

    fn id(&self) -> Uuid {
        self.id
    }

    async fn insert(&self, storage: &dyn Storage) -> Result<()> {
        storage.create_role(self).await
    }

    async fn fetch(storage: &dyn Storage, id: Uuid) -> Result<Option<Self>> {
        storage.get_role(id).await
    }

    async fn list(storage: &dyn Storage) -> Result<Vec<Self>> {
        storage.list_roles().await
    }

    async fn replace(&self, storage: &dyn Storage) -> Result<()> {
        storage.update_role(self).await
    }

    async fn remove(storage: &dyn Storage, id: Uuid) -> Result<()> {
        storage.delete_role(id).await
    }
}

#[async_trait]
impl OrgRecord for Person {
    const KIND: &'static str = "person";

    fn id(&self) -> Uuid {
        self.id
    }

    async fn insert(&self, storage: &dyn Storage) -> Result<()> {
        storage.create_person(self).await
    }

    async fn fetch(storage: &dyn Storage, id: Uuid) -> Result<Option<Self>> {
        storage.get_person(id).await
    }

    async fn list(storage: &dyn Storage) -> Result<Vec<Self>> {
        storage.list_people().await
    }

    async fn replace(&self, storage: &dyn Storage) -> Result<()> {
        storage.update_person(self).await
    }

    async fn remove(storage: &dyn Storage, id: Uuid) -> Result<()> {
        storage.delete_person(id).await
    }
}

#[async_trait]
impl OrgRecord for HumanAgentPair {
    const KIND: &'static str = "human-agent pair";

    fn id(&self) -> Uuid {
        self.id
    }

    async fn insert(&self, storage: &dyn Storage) -> Result<()> {
        storage.create_pair(self).await
    }

    async fn fetch(storage: &dyn Storage, id: Uuid) -> Result<Option<Self>> {
        storage.get_pair(id).await
    }

    async fn list(storage: &dyn Storage) -> Result<Vec<Self>> {
        storage.list_pairs().await
    }

    async fn replace(&self, storage: &dyn Storage) -> Result<()> {
        storage.update_pair(self).await
    }

    async fn remove(storage: &dyn Storage, id: Uuid) -> Result<()> {
        storage.delete_pair(id).await
    }
}
