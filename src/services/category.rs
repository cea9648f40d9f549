//! Category service
//!
//! Same rules as tags plus an optional description that updates may clear.
//! Categories referenced by any news article cannot be deleted.

use crate::db::repositories::CategoryRepository;
use crate::models::{
    Category, CategoryWithCount, CreateCategoryInput, EntityFilters, EntityStats,
    UpdateCategoryInput, CATEGORY_NAME_MAX_LEN,
};
use crate::services::error::{validate_name, EntityKind, ServiceError};
use anyhow::Context;
use std::sync::Arc;

const KIND: EntityKind = EntityKind::Category;

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// Create a category.
    ///
    /// A blank description is stored as `NULL`.
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, ServiceError> {
        let name = validate_name(KIND, &input.name, CATEGORY_NAME_MAX_LEN)?;

        if self
            .repo
            .find_by_name(&name)
            .await
            .context("Failed to check existing category")?
            .is_some()
        {
            return Err(ServiceError::DuplicateName(KIND));
        }

        let category = Category::new(
            name,
            normalize_description(input.description),
            input.is_active.unwrap_or(true),
        );
        let created = self
            .repo
            .create(&category)
            .await
            .map_err(|e| ServiceError::from_name_write(KIND, e))?;

        tracing::info!("Created category {} ({})", created.id, created.name);
        Ok(created)
    }

    pub async fn find_all(
        &self,
        filters: &EntityFilters,
    ) -> Result<Vec<CategoryWithCount>, ServiceError> {
        Ok(self
            .repo
            .find_all(filters)
            .await
            .context("Failed to list categories")?)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<CategoryWithCount>, ServiceError> {
        Ok(self
            .repo
            .find_by_id(id)
            .await
            .context("Failed to get category by ID")?)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Category>, ServiceError> {
        Ok(self
            .repo
            .find_by_name(name)
            .await
            .context("Failed to get category by name")?)
    }

    /// Apply a partial update; `Ok(None)` when the category doesn't exist.
    pub async fn update(
        &self,
        id: i64,
        input: UpdateCategoryInput,
    ) -> Result<Option<Category>, ServiceError> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        let mut category = existing.item;

        if let Some(raw) = input.name {
            let name = validate_name(KIND, &raw, CATEGORY_NAME_MAX_LEN)?;
            if let Some(owner) = self.find_by_name(&name).await? {
                if owner.id != id {
                    return Err(ServiceError::DuplicateName(KIND));
                }
            }
            category.name = name;
        }
        if let Some(description) = input.description {
            category.description = normalize_description(description);
        }
        if let Some(is_active) = input.is_active {
            category.is_active = is_active;
        }

        self.repo
            .update(&category)
            .await
            .map_err(|e| ServiceError::from_name_write(KIND, e))
    }

    /// Delete a category no article is filed under; returns the deleted row.
    pub async fn delete(&self, id: i64) -> Result<Category, ServiceError> {
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
            .context("Failed to delete category")?
        {
            return Err(ServiceError::NotFound(KIND));
        }

        tracing::info!("Deleted category {} ({})", id, existing.item.name);
        Ok(existing.item)
    }

    pub async fn toggle_active(&self, id: i64) -> Result<Category, ServiceError> {
        self.repo
            .toggle_active(id)
            .await
            .context("Failed to toggle category")?
            .ok_or(ServiceError::NotFound(KIND))
    }

    pub async fn get_stats(&self) -> Result<EntityStats, ServiceError> {
        Ok(self
            .repo
            .stats()
            .await
            .context("Failed to get category stats")?)
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxCategoryRepository;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_service() -> (DynDatabasePool, CategoryService) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let repo = SqlxCategoryRepository::boxed(pool.clone());
        (pool, CategoryService::new(repo))
    }

    #[tokio::test]
    async fn test_create_with_description() {
        let (_pool, service) = setup_test_service().await;

        let category = service
            .create(CreateCategoryInput::new("Press").with_description("  Official releases "))
            .await
            .unwrap();

        assert_eq!(category.name, "Press");
        assert_eq!(category.description.as_deref(), Some("Official releases"));
    }

    #[tokio::test]
    async fn test_create_name_limit_is_100() {
        let (_pool, service) = setup_test_service().await;

        assert!(service
            .create(CreateCategoryInput::new("c".repeat(100)))
            .await
            .is_ok());
        assert!(matches!(
            service.create(CreateCategoryInput::new("c".repeat(101))).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_clears_description() {
        let (_pool, service) = setup_test_service().await;
        let category = service
            .create(CreateCategoryInput::new("Interviews").with_description("Talks"))
            .await
            .unwrap();

        let untouched = service
            .update(category.id, UpdateCategoryInput::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.description.as_deref(), Some("Talks"));

        let cleared = service
            .update(
                category.id,
                UpdateCategoryInput {
                    description: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(cleared.description.is_none());
    }

    #[tokio::test]
    async fn test_delete_blocked_by_news() {
        let (pool, service) = setup_test_service().await;
        let category = service.create(CreateCategoryInput::new("Events")).await.unwrap();
        sqlx::query("INSERT INTO news (title, slug, content, category_id) VALUES ('T', 't', 'B', ?)")
            .bind(category.id)
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();

        let result = service.delete(category.id).await;
        match result {
            Err(err @ ServiceError::HasArticles { .. }) => assert_eq!(
                err.to_string(),
                "Cannot delete category with 1 associated articles"
            ),
            other => panic!("expected HasArticles, got {:?}", other),
        }
        assert!(service.find_by_id(category.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (_pool, service) = setup_test_service().await;
        assert!(matches!(
            service.delete(99999).await,
            Err(ServiceError::NotFound(EntityKind::Category))
        ));
    }
}
