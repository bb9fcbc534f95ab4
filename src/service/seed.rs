use chrono::Utc;

use crate::error::Result;
use crate::model::Category;
use crate::scoring::DEFAULT_RULES;
use crate::store::{new_id, CategoryStore};

/// Insert every default category whose key is missing, in one store write.
///
/// A store that already holds all eight is left alone. One left partially
/// seeded is completed. The store skips keys that are already taken, so a
/// second process seeding at the same moment cannot create duplicates.
pub async fn seed_default_categories(store: &dyn CategoryStore) -> Result<usize> {
    let existing = store.list_categories().await?;
    let now = Utc::now();
    let missing: Vec<Category> = DEFAULT_RULES
        .iter()
        .filter(|rule| !existing.iter().any(|c| c.key == rule.key()))
        .map(|rule| Category {
            id: new_id(),
            key: rule.key().to_string(),
            label: rule.label.to_string(),
            increment: rule.step,
            decrement: rule.step,
            is_negative: rule.is_negative,
            created_at: now,
            updated_at: now,
        })
        .collect();

    if missing.is_empty() {
        return Ok(0);
    }

    let wanted = missing.len();
    let inserted = store.insert_categories(missing).await?.len();
    if inserted < wanted {
        tracing::debug!(skipped = wanted - inserted, "categories already present, skipping");
    }
    if inserted > 0 {
        tracing::info!(inserted, "default categories initialized");
    }
    Ok(inserted)
}
