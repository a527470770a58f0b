use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::blogs::repo::BlogListing;

#[derive(Debug, Deserialize)]
pub struct BlogQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub category: Option<Uuid>,
    #[serde(default)]
    pub featured: bool,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct AuthorInfo {
    pub id: Uuid,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CategoryInfo {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Serialize)]
pub struct BlogResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub is_featured: bool,
    pub is_published: bool,
    pub published_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub author: AuthorInfo,
    pub category: CategoryInfo,
}

impl From<BlogListing> for BlogResponse {
    fn from(row: BlogListing) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            featured_image: row.featured_image,
            is_featured: row.is_featured,
            is_published: row.is_published,
            published_at: row.published_at,
            created_at: row.created_at,
            author: AuthorInfo {
                id: row.author_id,
                name: row.author_name,
                image: row.author_image,
            },
            category: CategoryInfo {
                id: row.category_id,
                name: row.category_name,
                slug: row.category_slug,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub pages: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct BlogPage {
    pub blogs: Vec<BlogResponse>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Deserialize)]
pub struct CreateBlogRequest {
    pub title: String,
    pub content: Option<String>,
    pub category_id: Uuid,
    pub featured_image: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Uuid>,
    pub featured_image: Option<String>,
    pub is_featured: Option<bool>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blog_query_defaults() {
        let q: BlogQuery = serde_json::from_str("{}").expect("parse");
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 10);
        assert!(q.category.is_none());
        assert!(!q.featured);
    }
}
