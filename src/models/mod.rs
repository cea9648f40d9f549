//! Data models
//!
//! Database entities (Tag, Category, NewsClassification, News), the inputs
//! services accept, and the listing filter and pagination types.

mod category;
mod classification;
mod filter;
mod news;
mod tag;

pub use category::{
    Category, CategoryWithCount, CreateCategoryInput, UpdateCategoryInput, CATEGORY_NAME_MAX_LEN,
};
pub use classification::{
    ClassificationWithCount, CreateClassificationInput, NewsClassification,
    UpdateClassificationInput, CLASSIFICATION_NAME_MAX_LEN,
};
pub use filter::{EntityFilters, EntityStats, SortField, SortOrder, WithArticleCount};
pub use news::{
    estimate_read_time, slugify, CreateNewsInput, EntityRef, ListParams, News, NewsDetail,
    NewsFilters, NewsStatus, PagedResult, UpdateNewsInput, NEWS_TITLE_MAX_LEN,
};
pub use tag::{CreateTagInput, Tag, TagWithCount, UpdateTagInput, TAG_NAME_MAX_LEN};
