use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CategoryStore, MemberStore};
use crate::error::Result;
use crate::model::{Category, Member};

/// Volatile store used by tests and `serve --in-memory`
#[derive(Default)]
pub struct MemoryStore {
    members: Mutex<Vec<Member>>,
    categories: Mutex<Vec<Category>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn list_members(&self) -> Result<Vec<Member>> {
        Ok(self.members.lock().await.clone())
    }

    async fn get_member(&self, id: &str) -> Result<Option<Member>> {
        Ok(self.members.lock().await.iter().find(|m| m.id == id).cloned())
    }

    async fn insert_member(&self, member: Member) -> Result<Member> {
        self.members.lock().await.push(member.clone());
        Ok(member)
    }

    async fn insert_members(&self, members: Vec<Member>) -> Result<Vec<Member>> {
        self.members.lock().await.extend(members.iter().cloned());
        Ok(members)
    }

    async fn replace_member(&self, member: Member) -> Result<Option<Member>> {
        let mut members = self.members.lock().await;
        match members.iter_mut().find(|m| m.id == member.id) {
            Some(slot) => {
                *slot = member.clone();
                Ok(Some(member))
            }
            None => Ok(None),
        }
    }

    async fn delete_member(&self, id: &str) -> Result<bool> {
        let mut members = self.members.lock().await;
        let before = members.len();
        members.retain(|m| m.id != id);
        Ok(members.len() != before)
    }

    async fn clear_members(&self) -> Result<usize> {
        let mut members = self.members.lock().await;
        let removed = members.len();
        members.clear();
        Ok(removed)
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories.lock().await.clone())
    }

    async fn get_category(&self, id: &str) -> Result<Option<Category>> {
        Ok(self.categories.lock().await.iter().find(|c| c.id == id).cloned())
    }

    async fn find_category_by_key(&self, key: &str) -> Result<Option<Category>> {
        Ok(self.categories.lock().await.iter().find(|c| c.key == key).cloned())
    }

    async fn insert_categories(&self, new_categories: Vec<Category>) -> Result<Vec<Category>> {
        let mut categories = self.categories.lock().await;
        Ok(super::merge_by_key(&mut categories, new_categories))
    }

    async fn replace_category(&self, category: Category) -> Result<Option<Category>> {
        let mut categories = self.categories.lock().await;
        match categories.iter_mut().find(|c| c.id == category.id) {
            Some(slot) => {
                *slot = category.clone();
                Ok(Some(category))
            }
            None => Ok(None),
        }
    }
}
