//! News classification service
//!
//! Tag-like rules plus priority handling: new classifications are appended
//! after the current highest priority unless a priority is given, and
//! `reorder` rewrites priorities to match a caller-supplied order.

use crate::db::repositories::ClassificationRepository;
use crate::models::{
    ClassificationWithCount, CreateClassificationInput, EntityFilters, EntityStats,
    NewsClassification, UpdateClassificationInput, CLASSIFICATION_NAME_MAX_LEN,
};
use crate::services::error::{validate_name, EntityKind, ServiceError};
use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;

const KIND: EntityKind = EntityKind::Classification;

/// News classification service
pub struct ClassificationService {
    repo: Arc<dyn ClassificationRepository>,
}

impl ClassificationService {
    pub fn new(repo: Arc<dyn ClassificationRepository>) -> Self {
        Self { repo }
    }

    /// Create a classification.
    ///
    /// A missing or zero priority places it after the current maximum.
    pub async fn create(
        &self,
        input: CreateClassificationInput,
    ) -> Result<NewsClassification, ServiceError> {
        let name = validate_name(KIND, &input.name, CLASSIFICATION_NAME_MAX_LEN)?;

        if self
            .repo
            .find_by_name(&name)
            .await
            .context("Failed to check existing classification")?
            .is_some()
        {
            return Err(ServiceError::DuplicateName(KIND));
        }

        let priority = input.explicit_priority();
        let classification = NewsClassification::new(
            name,
            priority.unwrap_or_default(),
            input.is_active.unwrap_or(true),
        );
        let created = self
            .repo
            .create(&classification, priority)
            .await
            .map_err(|e| ServiceError::from_name_write(KIND, e))?;

        tracing::info!(
            "Created classification {} ({}) with priority {}",
            created.id,
            created.name,
            created.priority
        );
        Ok(created)
    }

    pub async fn find_all(
        &self,
        filters: &EntityFilters,
    ) -> Result<Vec<ClassificationWithCount>, ServiceError> {
        Ok(self
            .repo
            .find_all(filters)
            .await
            .context("Failed to list classifications")?)
    }

    pub async fn find_by_id(
        &self,
        id: i64,
    ) -> Result<Option<ClassificationWithCount>, ServiceError> {
        Ok(self
            .repo
            .find_by_id(id)
            .await
            .context("Failed to get classification by ID")?)
    }

    pub async fn find_by_name(
        &self,
        name: &str,
    ) -> Result<Option<NewsClassification>, ServiceError> {
        Ok(self
            .repo
            .find_by_name(name)
            .await
            .context("Failed to get classification by name")?)
    }

    /// Apply a partial update; `Ok(None)` when the classification doesn't exist.
    pub async fn update(
        &self,
        id: i64,
        input: UpdateClassificationInput,
    ) -> Result<Option<NewsClassification>, ServiceError> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        let mut classification = existing.item;

        if let Some(raw) = input.name {
            let name = validate_name(KIND, &raw, CLASSIFICATION_NAME_MAX_LEN)?;
            if let Some(owner) = self.find_by_name(&name).await? {
                if owner.id != id {
                    return Err(ServiceError::DuplicateName(KIND));
                }
            }
            classification.name = name;
        }
        if let Some(priority) = input.priority {
            classification.priority = priority;
        }
        if let Some(is_active) = input.is_active {
            classification.is_active = is_active;
        }

        self.repo
            .update(&classification)
            .await
            .map_err(|e| ServiceError::from_name_write(KIND, e))
    }

    pub async fn delete(&self, id: i64) -> Result<NewsClassification, ServiceError> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound(KIND))?;

        if existing.article_count > 0 {
            return Err(ServiceError::HasArticles {
                kind: KIND,
                count: existing.article_count,
            });
        }

        if !self
            .repo
            .delete(id)
            .await
            .context("Failed to delete classification")?
        {
            return Err(ServiceError::NotFound(KIND));
        }

        tracing::info!("Deleted classification {} ({})", id, existing.item.name);
        Ok(existing.item)
    }

    pub async fn toggle_active(&self, id: i64) -> Result<NewsClassification, ServiceError> {
        self.repo
            .toggle_active(id)
            .await
            .context("Failed to toggle classification")?
            .ok_or(ServiceError::NotFound(KIND))
    }

    pub async fn get_stats(&self) -> Result<EntityStats, ServiceError> {
        Ok(self
            .repo
            .stats()
            .await
            .context("Failed to get classification stats")?)
    }

    /// Give each listed classification `priority = position + 1`.
    ///
    /// Unknown ids are skipped. Returns every classification ordered by
    /// priority.
    ///
    /// # Errors
    /// - `Validation` if the list is empty or repeats an id
    pub async fn reorder(
        &self,
        ordered_ids: &[i64],
    ) -> Result<Vec<ClassificationWithCount>, ServiceError> {
        if ordered_ids.is_empty() {
            return Err(ServiceError::Validation(
                "orderedIds must be a non-empty array of integers".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(ordered_ids.len());
        if let Some(dup) = ordered_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(ServiceError::Validation(format!(
                "orderedIds contains duplicate id {}",
                dup
            )));
        }

        self.repo
            .reorder(ordered_ids)
            .await
            .context("Failed to reorder classifications")?;
        tracing::info!("Reordered {} classifications", ordered_ids.len());

        self.find_all(&EntityFilters::new()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxClassificationRepository;
    use crate::db::{create_test_pool, migrations};
    use proptest::prelude::*;

    async fn setup_test_service() -> ClassificationService {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        ClassificationService::new(SqlxClassificationRepository::boxed(pool))
    }

    #[tokio::test]
    async fn test_default_priority_is_max_plus_one() {
        let service = setup_test_service().await;

        let first = service
            .create(CreateClassificationInput::new("Featured"))
            .await
            .unwrap();
        assert_eq!(first.priority, 1);

        service
            .create(CreateClassificationInput::new("Breaking").with_priority(5))
            .await
            .unwrap();

        let zero = service
            .create(CreateClassificationInput::new("Local").with_priority(0))
            .await
            .unwrap();
        assert_eq!(zero.priority, 6);
    }

    #[tokio::test]
    async fn test_duplicate_name() {
        let service = setup_test_service().await;
        service
            .create(CreateClassificationInput::new("Spotlight"))
            .await
            .unwrap();

        assert!(matches!(
            service
                .create(CreateClassificationInput::new("Spotlight"))
                .await,
            Err(ServiceError::DuplicateName(EntityKind::Classification))
        ));
    }

    #[tokio::test]
    async fn test_reorder_returns_priority_order() {
        let service = setup_test_service().await;
        let mut ids = Vec::new();
        for name in ["One", "Two", "Three"] {
            ids.push(
                service
                    .create(CreateClassificationInput::new(name))
                    .await
                    .unwrap()
                    .id,
            );
        }

        let reordered = service.reorder(&[ids[2], ids[0], ids[1]]).await.unwrap();
        let result: Vec<_> = reordered
            .iter()
            .map(|c| (c.item.name.as_str(), c.item.priority))
            .collect();
        assert_eq!(result, vec![("Three", 1), ("One", 2), ("Two", 3)]);
    }

    #[tokio::test]
    async fn test_reorder_rejects_empty_and_duplicates() {
        let service = setup_test_service().await;
        let a = service
            .create(CreateClassificationInput::new("A"))
            .await
            .unwrap();

        assert!(matches!(
            service.reorder(&[]).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.reorder(&[a.id, a.id]).await,
            Err(ServiceError::Validation(_))
        ));

        let unchanged = service.find_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(unchanged.item.priority, 1);
    }

    #[tokio::test]
    async fn test_update_priority_and_toggle() {
        let service = setup_test_service().await;
        let item = service
            .create(CreateClassificationInput::new("Archive"))
            .await
            .unwrap();

        let updated = service
            .update(
                item.id,
                UpdateClassificationInput {
                    priority: Some(9),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.priority, 9);
        assert_eq!(updated.name, "Archive");

        let toggled = service.toggle_active(item.id).await.unwrap();
        assert!(!toggled.is_active);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Any permutation of existing ids yields priorities 1..=N in that order.
        #[test]
        fn property_reorder_yields_dense_priorities(
            order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let service = setup_test_service().await;
                let mut ids = Vec::new();
                for i in 0..order.len() {
                    let created = service
                        .create(CreateClassificationInput::new(format!("C{}", i)))
                        .await
                        .expect("create should succeed");
                    ids.push(created.id);
                }

                let requested: Vec<i64> = order.iter().map(|&i| ids[i]).collect();
                let listed = service.reorder(&requested).await.expect("reorder should succeed");

                let got_ids: Vec<i64> = listed.iter().map(|c| c.item.id).collect();
                let got_priorities: Vec<i32> = listed.iter().map(|c| c.item.priority).collect();
                let expected_priorities: Vec<i32> = (1..=requested.len() as i32).collect();
                prop_assert_eq!(got_ids, requested);
                prop_assert_eq!(got_priorities, expected_priorities);
                Ok(())
            });
            result?;
        }
    }
}
