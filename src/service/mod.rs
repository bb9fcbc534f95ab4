//! Team scoring operations.
//!
//! Every write path builds the final member document and passes it through
//! `scoring::recompute` before it reaches the store, so a persisted `total`
//! is never stale. Operations are independent read-modify-write sequences;
//! concurrent writers to the same member race and the last write wins.

mod seed;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{Category, CategoryPatch, Member, MemberFields};
use crate::scoring::{self, CategoryKey};
use crate::sheet::{self, Sheet};
use crate::store::{new_id, CategoryStore, MemberStore};

/// Result of zeroing every member's points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetOutcome {
    pub message: String,
    pub members: Vec<Member>,
    #[serde(skip)]
    pub modified: usize,
}

#[derive(Clone)]
pub struct TeamService {
    members: Arc<dyn MemberStore>,
    categories: Arc<dyn CategoryStore>,
}

impl TeamService {
    pub fn new(members: Arc<dyn MemberStore>, categories: Arc<dyn CategoryStore>) -> Self {
        Self {
            members,
            categories,
        }
    }

    /// Use one backend for both collections
    pub fn with_store<S>(store: Arc<S>) -> Self
    where
        S: MemberStore + CategoryStore + 'static,
    {
        Self::new(store.clone(), store)
    }

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------

    /// All members, highest total first. Ties keep storage order.
    pub async fn list_members(&self) -> Result<Vec<Member>> {
        let mut members = self.members.list_members().await?;
        sort_by_total(&mut members);
        Ok(members)
    }

    pub async fn create_member(&self, fields: MemberFields) -> Result<Member> {
        let member = build_member(new_id(), &fields)?;
        let member = self.members.insert_member(member).await?;
        tracing::debug!(id = %member.id, name = %member.name, "created member");
        Ok(member)
    }

    pub async fn update_member(&self, id: &str, fields: MemberFields) -> Result<Member> {
        let mut member = self
            .members
            .get_member(id)
            .await?
            .ok_or_else(Error::member_not_found)?;

        member.apply_fields(&fields)?;
        member.updated_at = Utc::now();
        let member = scoring::recompute(member);

        let member = self
            .members
            .replace_member(member)
            .await?
            .ok_or_else(Error::member_not_found)?;
        tracing::debug!(id = %member.id, total = member.total, "updated member");
        Ok(member)
    }

    pub async fn delete_member(&self, id: &str) -> Result<()> {
        if !self.members.delete_member(id).await? {
            return Err(Error::member_not_found());
        }
        tracing::debug!(id, "deleted member");
        Ok(())
    }

    /// Add `value` to one category of a member
    pub async fn adjust_member(&self, id: &str, category: &str, value: i64) -> Result<Member> {
        scoring::validate_delta(value)?;

        let member = self
            .members
            .get_member(id)
            .await?
            .ok_or_else(Error::member_not_found)?;

        let key = CategoryKey::parse(category);
        if let CategoryKey::Custom(ref name) = key {
            tracing::debug!(id, category = %name, "adjusting custom category");
        }

        let mut member = scoring::adjust_category(member, &key, value)?;
        member.updated_at = Utc::now();

        let member = self
            .members
            .replace_member(member)
            .await?
            .ok_or_else(Error::member_not_found)?;
        tracing::debug!(id, category, value, total = member.total, "adjusted member");
        Ok(member)
    }

    /// Replace the whole collection with `records`.
    ///
    /// A record carrying a non-empty `_id` keeps it; the rest get fresh ids.
    /// Records are validated before anything is removed. The clear and the
    /// insert are separate store calls, so a concurrent reader can observe
    /// an empty collection in between.
    pub async fn bulk_replace(&self, records: Vec<MemberFields>) -> Result<Vec<Member>> {
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(records.len());
        for fields in &records {
            let id = match fields.id.as_deref().map(str::trim) {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => new_id(),
            };
            if !seen.insert(id.clone()) {
                return Err(Error::invalid(format!("Duplicate member id '{}'", id)));
            }
            members.push(build_member(id, fields)?);
        }

        let removed = self.members.clear_members().await?;
        let inserted = self.members.insert_members(members).await?;
        tracing::info!(removed, inserted = inserted.len(), "replaced member collection");
        Ok(inserted)
    }

    /// Zero every counter of every member, keeping ids and names
    pub async fn reset_all_points(&self) -> Result<ResetOutcome> {
        let now = Utc::now();
        let mut modified = 0;

        for mut member in self.members.list_members().await? {
            if !member.has_points() {
                continue;
            }
            member.clear_points();
            member.updated_at = now;
            if self
                .members
                .replace_member(scoring::recompute(member))
                .await?
                .is_some()
            {
                modified += 1;
            }
        }

        tracing::info!(modified, "reset member points");
        Ok(ResetOutcome {
            message: format!("{}명의 멤버 포인트가 리셋되었습니다.", modified),
            members: self.list_members().await?,
            modified,
        })
    }

    // ------------------------------------------------------------------
    // Sheets
    // ------------------------------------------------------------------

    /// Replace all members with the rows of `sheet`.
    /// A sheet without a header row leaves the store untouched.
    pub async fn import_sheet(&self, sheet: &Sheet) -> Result<Vec<Member>> {
        let records = sheet::members_from_sheet(sheet)?;
        tracing::info!(rows = records.len(), "importing sheet");
        self.bulk_replace(records).await
    }

    /// Current standings as a sheet, in display order
    pub async fn export_sheet(&self) -> Result<Sheet> {
        let members = self.list_members().await?;
        Ok(sheet::sheet_from_members(&members))
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.categories.list_categories().await
    }

    pub async fn update_category(&self, id: &str, patch: CategoryPatch) -> Result<Category> {
        let category = self
            .categories
            .get_category(id)
            .await?
            .ok_or_else(Error::category_not_found)?;
        self.save_category_patch(category, &patch).await
    }

    pub async fn update_category_by_key(&self, key: &str, patch: CategoryPatch) -> Result<Category> {
        let category = self
            .categories
            .find_category_by_key(key)
            .await?
            .ok_or_else(Error::category_not_found)?;
        self.save_category_patch(category, &patch).await
    }

    async fn save_category_patch(
        &self,
        mut category: Category,
        patch: &CategoryPatch,
    ) -> Result<Category> {
        category.apply_patch(patch)?;
        category.updated_at = Utc::now();
        let category = self
            .categories
            .replace_category(category)
            .await?
            .ok_or_else(Error::category_not_found)?;
        tracing::debug!(key = %category.key, "updated category");
        Ok(category)
    }

    /// Insert whichever default categories are missing.
    /// Returns how many were inserted.
    pub async fn seed_default_categories(&self) -> Result<usize> {
        seed::seed_default_categories(self.categories.as_ref()).await
    }
}

/// Extract the records of a `{ "members": [...] }` bulk payload
pub fn parse_bulk_payload(payload: &Value) -> Result<Vec<MemberFields>> {
    let Some(Value::Array(items)) = payload.get("members") else {
        return Err(Error::invalid("Invalid members data"));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            MemberFields::deserialize(item)
                .map_err(|e| Error::invalid(format!("Invalid member at index {}: {}", i, e)))
        })
        .collect()
}

fn build_member(id: String, fields: &MemberFields) -> Result<Member> {
    let now = Utc::now();
    let mut member = Member::new(id, String::new(), now);
    if fields.name.is_none() {
        return Err(Error::invalid("Name is required"));
    }
    member.apply_fields(fields)?;
    Ok(scoring::recompute(member))
}

fn sort_by_total(members: &mut [Member]) {
    // sort_by is stable, so equal totals keep storage order
    members.sort_by(|a, b| b.total.cmp(&a.total));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoreField;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn service() -> TeamService {
        TeamService::with_store(Arc::new(MemoryStore::new()))
    }

    async fn add(service: &TeamService, name: &str, attendance: i64) -> Member {
        service
            .create_member(MemberFields::named(name).with(ScoreField::Attendance, attendance))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_defaults_and_total() {
        let service = service();
        let member = service
            .create_member(
                MemberFields::named(" Kim ")
                    .with(ScoreField::Attendance, 6)
                    .with(ScoreField::Absence, 10),
            )
            .await
            .unwrap();
        assert_eq!(member.name, "Kim");
        assert_eq!(member.game_win, 0);
        assert_eq!(member.total, -4);
        assert!(!member.id.is_empty());
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let service = service();
        let result = service.create_member(MemberFields::default()).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        let result = service.create_member(MemberFields::named("  ")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_list_sorted_by_total_with_stable_ties() {
        let service = service();
        add(&service, "A", 3).await;
        add(&service, "B", 9).await;
        add(&service, "C", 3).await;
        let names: Vec<_> = service
            .list_members()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[tokio::test]
    async fn test_update_recomputes_total() {
        let service = service();
        let member = add(&service, "Kim", 3).await;
        let updated = service
            .update_member(&member.id, MemberFields::default().with(ScoreField::Late, 3))
            .await
            .unwrap();
        assert_eq!(updated.attendance, 3);
        assert_eq!(updated.late, 3);
        assert_eq!(updated.total, 0);
        assert_eq!(updated.name, "Kim");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_member() {
        let service = service();
        let result = service.update_member("nope", MemberFields::named("X")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        let result = service.delete_member("nope").await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_member() {
        let service = service();
        let member = add(&service, "Kim", 3).await;
        service.delete_member(&member.id).await.unwrap();
        assert!(service.list_members().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_adjust_member_persists() {
        let service = service();
        let member = add(&service, "Kim", 0).await;
        service.adjust_member(&member.id, "roundWin", 5).await.unwrap();
        let adjusted = service.adjust_member(&member.id, "late", 3).await.unwrap();
        assert_eq!(adjusted.round_win, 5);
        assert_eq!(adjusted.total, 2);

        let stored = service.list_members().await.unwrap();
        assert_eq!(stored[0].total, 2);
    }

    #[tokio::test]
    async fn test_adjust_zero_rejected_before_lookup() {
        let service = service();
        let result = service.adjust_member("missing", "mom", 0).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        let result = service.adjust_member("missing", "mom", 2).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_adjust_unknown_category() {
        let service = service();
        let member = add(&service, "Kim", 3).await;
        let adjusted = service.adjust_member(&member.id, "assists", 1).await.unwrap();
        assert_eq!(adjusted.custom_points["assists"], 1);
        assert_eq!(adjusted.total, 3);
    }

    #[tokio::test]
    async fn test_bulk_replace_overwrites_collection() {
        let service = service();
        add(&service, "Old1", 3).await;
        add(&service, "Old2", 3).await;

        let records = parse_bulk_payload(&json!({"members": [{"name": "A", "attendance": 3}]})).unwrap();
        service.bulk_replace(records).await.unwrap();

        let members = service.list_members().await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "A");
        assert_eq!(members[0].total, 3);
    }

    #[tokio::test]
    async fn test_bulk_replace_keeps_supplied_ids() {
        let service = service();
        let records = parse_bulk_payload(&json!({"members": [
            {"_id": "keep-me", "name": "A", "attendance": 3.0},
            {"_id": "", "name": "B"},
            {"name": "C"}
        ]}))
        .unwrap();
        let inserted = service.bulk_replace(records).await.unwrap();

        assert_eq!(inserted[0].id, "keep-me");
        assert_eq!(inserted[0].attendance, 3);
        assert!(!inserted[1].id.is_empty());
        assert_ne!(inserted[1].id, inserted[2].id);
        assert_eq!(
            service.update_member("keep-me", MemberFields::default()).await.unwrap().name,
            "A"
        );
    }

    #[tokio::test]
    async fn test_bulk_replace_rejects_duplicate_ids() {
        let service = service();
        add(&service, "Keep", 3).await;
        let records = parse_bulk_payload(&json!({"members": [
            {"_id": "x", "name": "A"},
            {"_id": "x", "name": "B"}
        ]}))
        .unwrap();
        match service.bulk_replace(records).await {
            Err(Error::InvalidInput(msg)) => assert_eq!(msg, "Duplicate member id 'x'"),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
        assert_eq!(service.list_members().await.unwrap()[0].name, "Keep");
    }

    #[tokio::test]
    async fn test_create_ignores_supplied_id() {
        let service = service();
        let fields: MemberFields = serde_json::from_value(json!({"_id": "mine", "name": "A"})).unwrap();
        let member = service.create_member(fields).await.unwrap();
        assert_ne!(member.id, "mine");
    }

    #[tokio::test]
    async fn test_bulk_replace_invalid_record_leaves_store() {
        let service = service();
        add(&service, "Keep", 3).await;
        let result = service
            .bulk_replace(vec![MemberFields::named("A"), MemberFields::default()])
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(service.list_members().await.unwrap().len(), 1);
    }

    #[test]
    fn test_parse_bulk_payload_rejects_non_list() {
        for payload in [json!({}), json!({"members": "x"}), json!({"members": {"name": "A"}}), json!([])] {
            match parse_bulk_payload(&payload) {
                Err(Error::InvalidInput(msg)) => assert_eq!(msg, "Invalid members data"),
                other => panic!("expected InvalidInput for {}, got {:?}", payload, other),
            }
        }
    }

    #[test]
    fn test_parse_bulk_payload_rejects_bad_numbers() {
        let result = parse_bulk_payload(&json!({"members": [{"name": "A", "mom": "lots"}]}));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_reset_all_points() {
        let service = service();
        let kim = add(&service, "Kim", 9).await;
        let lee = add(&service, "Lee", 0).await;
        service.adjust_member(&lee.id, "late", 3).await.unwrap();
        add(&service, "Park", 0).await;

        let outcome = service.reset_all_points().await.unwrap();
        assert_eq!(outcome.modified, 2);
        assert_eq!(outcome.message, "2명의 멤버 포인트가 리셋되었습니다.");
        assert_eq!(outcome.members.len(), 3);
        for member in &outcome.members {
            assert!(!member.has_points());
            for field in ScoreField::ALL {
                assert_eq!(member.points(field), 0);
            }
        }
        assert!(outcome.members.iter().any(|m| m.id == kim.id && m.name == "Kim"));
    }

    #[tokio::test]
    async fn test_import_sheet_replaces_members() {
        let service = service();
        add(&service, "Old", 3).await;

        let sheet = Sheet::parse("팀 포인트\n참석자\t출석\t경기\t라운드\tMOM\t만근\t추가\t지각\t결석\nKim\t3\t0\t0\t0\t0\t0\t1\t0\n");
        let imported = service.import_sheet(&sheet).await.unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].attendance, 3);
        assert_eq!(imported[0].late, 1);
        assert_eq!(imported[0].total, 2);

        let members = service.list_members().await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "Kim");
    }

    #[tokio::test]
    async fn test_import_without_header_does_not_touch_store() {
        let service = service();
        add(&service, "Old", 3).await;
        let result = service.import_sheet(&Sheet::parse("name,attendance\nKim,3\n")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(service.list_members().await.unwrap()[0].name, "Old");
    }

    #[tokio::test]
    async fn test_export_sheet_in_display_order() {
        let service = service();
        add(&service, "Low", 3).await;
        add(&service, "High", 9).await;
        let sheet = service.export_sheet().await.unwrap();
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[1][0].to_string(), "High");
        assert_eq!(sheet.rows[1][10].to_string(), "1");
        assert_eq!(sheet.rows[2][10].to_string(), "2");
    }

    #[tokio::test]
    async fn test_update_category_by_id_and_key() {
        let service = service();
        service.seed_default_categories().await.unwrap();
        let categories = service.list_categories().await.unwrap();
        let mom = categories.iter().find(|c| c.key == "mom").unwrap();

        let updated = service
            .update_category(
                &mom.id,
                CategoryPatch {
                    increment: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.increment, 4);
        assert_eq!(updated.decrement, 2);

        let updated = service
            .update_category_by_key(
                "late",
                CategoryPatch {
                    label: Some("Late".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.label, "Late");
        assert!(updated.is_negative);
    }

    #[tokio::test]
    async fn test_update_missing_category() {
        let service = service();
        let result = service.update_category("nope", CategoryPatch::default()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        let result = service
            .update_category_by_key("nope", CategoryPatch::default())
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
