//! Tag service
//!
//! Business rules for tags: trimmed unique names, partial updates, delete
//! protection while articles use the tag, and active/inactive toggling.

use crate::db::repositories::TagRepository;
use crate::models::{
    CreateTagInput, EntityFilters, EntityStats, Tag, TagWithCount, UpdateTagInput,
    TAG_NAME_MAX_LEN,
};
use crate::services::error::{validate_name, EntityKind, ServiceError};
use anyhow::Context;
use std::sync::Arc;

const KIND: EntityKind = EntityKind::Tag;

/// Tag service
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// Create a tag.
    ///
    /// # Errors
    /// - `Validation` if the trimmed name is empty or too long
    /// - `DuplicateName` if another tag already has the name
    pub async fn create(&self, input: CreateTagInput) -> Result<Tag, ServiceError> {
        let name = validate_name(KIND, &input.name, TAG_NAME_MAX_LEN)?;

        if self
            .repo
            .find_by_name(&name)
            .await
            .context("Failed to check existing tag")?
            .is_some()
        {
            return Err(ServiceError::DuplicateName(KIND));
        }

        let tag = Tag::new(name, input.is_active.unwrap_or(true));
        let created = self
            .repo
            .create(&tag)
            .await
            .map_err(|e| ServiceError::from_name_write(KIND, e))?;

        tracing::info!("Created tag {} ({})", created.id, created.name);
        Ok(created)
    }

    pub async fn find_all(&self, filters: &EntityFilters) -> Result<Vec<TagWithCount>, ServiceError> {
        Ok(self.repo.find_all(filters).await.context("Failed to list tags")?)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<TagWithCount>, ServiceError> {
        Ok(self
            .repo
            .find_by_id(id)
            .await
            .context("Failed to get tag by ID")?)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Tag>, ServiceError> {
        Ok(self
            .repo
            .find_by_name(name)
            .await
            .context("Failed to get tag by name")?)
    }

    /// Apply a partial update; `Ok(None)` when the tag doesn't exist.
    pub async fn update(&self, id: i64, input: UpdateTagInput) -> Result<Option<Tag>, ServiceError> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        let mut tag = existing.item;

        if let Some(raw) = input.name {
            let name = validate_name(KIND, &raw, TAG_NAME_MAX_LEN)?;
            if let Some(owner) = self.find_by_name(&name).await? {
                if owner.id != id {
                    return Err(ServiceError::DuplicateName(KIND));
                }
            }
            tag.name = name;
        }
        if let Some(is_active) = input.is_active {
            tag.is_active = is_active;
        }

        self.repo
            .update(&tag)
            .await
            .map_err(|e| ServiceError::from_name_write(KIND, e))
    }

    /// Delete a tag that no article uses; returns the deleted row.
    pub async fn delete(&self, id: i64) -> Result<Tag, ServiceError> {
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

        if !self.repo.delete(id).await.context("Failed to delete tag")? {
            return Err(ServiceError::NotFound(KIND));
        }

        tracing::info!("Deleted tag {} ({})", id, existing.item.name);
        Ok(existing.item)
    }

    pub async fn toggle_active(&self, id: i64) -> Result<Tag, ServiceError> {
        self.repo
            .toggle_active(id)
            .await
            .context("Failed to toggle tag")?
            .ok_or(ServiceError::NotFound(KIND))
    }

    pub async fn get_stats(&self) -> Result<EntityStats, ServiceError> {
        Ok(self.repo.stats().await.context("Failed to get tag stats")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxTagRepository;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{SortField, SortOrder};

    async fn setup_test_service() -> (DynDatabasePool, TagService) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let repo = SqlxTagRepository::boxed(pool.clone());
        (pool, TagService::new(repo))
    }

    async fn attach_news(pool: &DynDatabasePool, tag_id: i64) {
        let sqlite = pool.as_sqlite().unwrap();
        sqlx::query("INSERT OR IGNORE INTO categories (id, name) VALUES (1, 'General')")
            .execute(sqlite)
            .await
            .unwrap();
        let news_id = sqlx::query(
            "INSERT INTO news (title, slug, content, category_id) VALUES ('T', ?, 'B', 1)",
        )
        .bind(format!("news-for-{}", tag_id))
        .execute(sqlite)
        .await
        .unwrap()
        .last_insert_rowid();
        sqlx::query("INSERT INTO news_tag_links (news_id, tag_id) VALUES (?, ?)")
            .bind(news_id)
            .bind(tag_id)
            .execute(sqlite)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_trims_and_defaults_active() {
        let (_pool, service) = setup_test_service().await;

        let tag = service.create(CreateTagInput::new("  Boccia  ")).await.unwrap();

        assert_eq!(tag.name, "Boccia");
        assert!(tag.is_active);
        assert!(tag.id > 0);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_and_long_names() {
        let (_pool, service) = setup_test_service().await;

        let blank = service.create(CreateTagInput::new("   ")).await;
        assert!(matches!(blank, Err(ServiceError::Validation(_))));

        let long = service.create(CreateTagInput::new("x".repeat(51))).await;
        assert!(matches!(long, Err(ServiceError::Validation(_))));

        assert_eq!(service.get_stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_create_duplicate_after_trim() {
        let (_pool, service) = setup_test_service().await;
        service.create(CreateTagInput::new("Goalball")).await.unwrap();

        let result = service.create(CreateTagInput::new(" Goalball ")).await;
        assert!(matches!(
            result,
            Err(ServiceError::DuplicateName(EntityKind::Tag))
        ));
    }

    #[tokio::test]
    async fn test_find_all_search_and_active_filter() {
        let (_pool, service) = setup_test_service().await;
        service.create(CreateTagInput::new("Para Swimming")).await.unwrap();
        service
            .create(CreateTagInput::new("Para Rowing").with_active(false))
            .await
            .unwrap();
        service.create(CreateTagInput::new("Judo")).await.unwrap();

        let para = service
            .find_all(&EntityFilters::new().with_search("para"))
            .await
            .unwrap();
        assert_eq!(para.len(), 2);

        let inactive = service
            .find_all(&EntityFilters::new().with_active(false))
            .await
            .unwrap();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].item.name, "Para Rowing");

        let by_name = service
            .find_all(&EntityFilters::new().sorted_by(SortField::Name, SortOrder::Asc))
            .await
            .unwrap();
        assert_eq!(by_name[0].item.name, "Judo");
    }

    #[tokio::test]
    async fn test_update_partial_and_conflicts() {
        let (_pool, service) = setup_test_service().await;
        let taken = service.create(CreateTagInput::new("Taken")).await.unwrap();
        let tag = service.create(CreateTagInput::new("Original")).await.unwrap();

        let same = service
            .update(
                tag.id,
                UpdateTagInput {
                    name: Some("Original".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(same.name, "Original");

        let conflict = service
            .update(
                tag.id,
                UpdateTagInput {
                    name: Some(taken.name.clone()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(conflict, Err(ServiceError::DuplicateName(_))));

        let deactivated = service
            .update(
                tag.id,
                UpdateTagInput {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(deactivated.name, "Original");
        assert!(!deactivated.is_active);
        assert!(deactivated.updated_at >= tag.updated_at);

        let missing = service.update(99999, UpdateTagInput::default()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_blocked_while_in_use() {
        let (pool, service) = setup_test_service().await;
        let tag = service.create(CreateTagInput::new("Used")).await.unwrap();
        attach_news(&pool, tag.id).await;

        let result = service.delete(tag.id).await;
        assert!(matches!(
            result,
            Err(ServiceError::HasArticles { count: 1, .. })
        ));
        assert!(service.find_by_id(tag.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_unused_tag() {
        let (_pool, service) = setup_test_service().await;
        let tag = service.create(CreateTagInput::new("Unused")).await.unwrap();

        let deleted = service.delete(tag.id).await.unwrap();
        assert_eq!(deleted.id, tag.id);
        assert!(service.find_by_id(tag.id).await.unwrap().is_none());

        assert!(matches!(
            service.delete(tag.id).await,
            Err(ServiceError::NotFound(EntityKind::Tag))
        ));
    }

    #[tokio::test]
    async fn test_toggle_and_stats() {
        let (_pool, service) = setup_test_service().await;
        let a = service.create(CreateTagInput::new("A")).await.unwrap();
        service.create(CreateTagInput::new("B")).await.unwrap();
        service.create(CreateTagInput::new("C")).await.unwrap();

        service.toggle_active(a.id).await.unwrap();
        assert_eq!(
            service.get_stats().await.unwrap(),
            EntityStats {
                total: 3,
                active: 2,
                inactive: 1
            }
        );

        let restored = service.toggle_active(a.id).await.unwrap();
        assert!(restored.is_active);

        assert!(matches!(
            service.toggle_active(99999).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
