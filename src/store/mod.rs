pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Category, Member};

/// Generate a fresh document identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Persistence for member documents.
///
/// Listing returns storage (insertion) order; sorting is the caller's job.
/// Stores never compute derived fields.
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn list_members(&self) -> Result<Vec<Member>>;

    async fn get_member(&self, id: &str) -> Result<Option<Member>>;

    async fn insert_member(&self, member: Member) -> Result<Member>;

    async fn insert_members(&self, members: Vec<Member>) -> Result<Vec<Member>>;

    /// Overwrite the document with the same id. Returns `None` if it is gone.
    async fn replace_member(&self, member: Member) -> Result<Option<Member>>;

    /// Returns `false` if nothing was deleted
    async fn delete_member(&self, id: &str) -> Result<bool>;

    /// Remove every member, returning how many were removed
    async fn clear_members(&self) -> Result<usize>;
}

/// Persistence for category documents. `key` is unique.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn get_category(&self, id: &str) -> Result<Option<Category>>;

    async fn find_category_by_key(&self, key: &str) -> Result<Option<Category>>;

    /// Insert every category whose key is not taken yet, as one write.
    /// Returns the categories actually inserted; key conflicts are skipped,
    /// not errors.
    async fn insert_categories(&self, categories: Vec<Category>) -> Result<Vec<Category>>;

    async fn replace_category(&self, category: Category) -> Result<Option<Category>>;
}

/// Append each new category whose key is not present yet, including keys
/// repeated within `new_categories`. Returns what was appended.
fn merge_by_key(existing: &mut Vec<Category>, new_categories: Vec<Category>) -> Vec<Category> {
    let mut inserted = Vec::new();
    for category in new_categories {
        if existing.iter().any(|c| c.key == category.key) {
            continue;
        }
        existing.push(category.clone());
        inserted.push(category);
    }
    inserted
}
