use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub is_featured: bool,
    pub is_published: bool,
    pub published_at: Option<OffsetDateTime>,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// Blog joined with its author and category, one flat row per post.
#[derive(Debug, Clone, FromRow)]
pub struct BlogListing {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub is_featured: bool,
    pub is_published: bool,
    pub published_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub author_id: Uuid,
    pub author_name: Option<String>,
    pub author_image: Option<String>,
    pub category_id: Uuid,
    pub category_name: String,
    pub category_slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryWithCount {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub blog_count: i64,
}

const LISTING_SELECT: &str = r#"
    SELECT b.id, b.title, b.slug, b.content, b.featured_image, b.is_featured,
           b.is_published, b.published_at, b.created_at,
           u.id AS author_id, u.name AS author_name, u.image AS author_image,
           c.id AS category_id, c.name AS category_name, c.slug AS category_slug
    FROM blogs b
    JOIN users u ON u.id = b.author_id
    JOIN categories c ON c.id = b.category_id
"#;

pub async fn list_published(
    db: &PgPool,
    category: Option<Uuid>,
    featured_only: bool,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<BlogListing>> {
    let sql = format!(
        r#"{LISTING_SELECT}
        WHERE b.is_published
          AND ($1::uuid IS NULL OR b.category_id = $1)
          AND (NOT $2 OR b.is_featured)
        ORDER BY b.published_at DESC NULLS LAST
        LIMIT $3 OFFSET $4
        "#
    );
    let rows = sqlx::query_as::<_, BlogListing>(&sql)
        .bind(category)
        .bind(featured_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn count_published(
    db: &PgPool,
    category: Option<Uuid>,
    featured_only: bool,
) -> anyhow::Result<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM blogs
        WHERE is_published
          AND ($1::uuid IS NULL OR category_id = $1)
          AND (NOT $2 OR is_featured)
        "#,
    )
    .bind(category)
    .bind(featured_only)
    .fetch_one(db)
    .await?;
    Ok(total)
}

pub async fn find_listing_by_slug(db: &PgPool, slug: &str) -> anyhow::Result<Option<BlogListing>> {
    let sql = format!("{LISTING_SELECT} WHERE b.slug = $1");
    let row = sqlx::query_as::<_, BlogListing>(&sql)
        .bind(slug)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

/// Bare row without joins, for ownership checks.
pub async fn find_by_slug(db: &PgPool, slug: &str) -> anyhow::Result<Option<Blog>> {
    let row = sqlx::query_as::<_, Blog>(
        r#"
        SELECT id, title, slug, content, featured_image, is_featured, is_published,
               published_at, author_id, category_id, created_at
        FROM blogs
        WHERE slug = $1
        "#,
    )
    .bind(slug)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn insert(
    db: &PgPool,
    title: &str,
    slug: &str,
    content: Option<&str>,
    category_id: Uuid,
    featured_image: Option<&str>,
    is_featured: bool,
    author_id: Uuid,
) -> anyhow::Result<Blog> {
    let row = sqlx::query_as::<_, Blog>(
        r#"
        INSERT INTO blogs (title, slug, content, category_id, featured_image, is_featured, author_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, title, slug, content, featured_image, is_featured, is_published,
                  published_at, author_id, category_id, created_at
        "#,
    )
    .bind(title)
    .bind(slug)
    .bind(content)
    .bind(category_id)
    .bind(featured_image)
    .bind(is_featured)
    .bind(author_id)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Partial update; `publish` toggles is_published and sets/clears
/// published_at accordingly, None leaves publication state alone.
#[allow(clippy::too_many_arguments)]
pub async fn update(
    db: &PgPool,
    slug: &str,
    title: Option<&str>,
    new_slug: Option<&str>,
    content: Option<&str>,
    category_id: Option<Uuid>,
    featured_image: Option<&str>,
    is_featured: Option<bool>,
    publish: Option<bool>,
) -> anyhow::Result<Option<Blog>> {
    let row = sqlx::query_as::<_, Blog>(
        r#"
        UPDATE blogs
        SET title = COALESCE($2, title),
            slug = COALESCE($3, slug),
            content = COALESCE($4, content),
            category_id = COALESCE($5, category_id),
            featured_image = COALESCE($6, featured_image),
            is_featured = COALESCE($7, is_featured),
            is_published = COALESCE($8, is_published),
            published_at = CASE
                WHEN $8 IS NULL THEN published_at
                WHEN $8 THEN now()
                ELSE NULL
            END
        WHERE slug = $1
        RETURNING id, title, slug, content, featured_image, is_featured, is_published,
                  published_at, author_id, category_id, created_at
        "#,
    )
    .bind(slug)
    .bind(title)
    .bind(new_slug)
    .bind(content)
    .bind(category_id)
    .bind(featured_image)
    .bind(is_featured)
    .bind(publish)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, slug: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(r#"DELETE FROM blogs WHERE slug = $1"#)
        .bind(slug)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_categories(db: &PgPool) -> anyhow::Result<Vec<CategoryWithCount>> {
    let rows = sqlx::query_as::<_, CategoryWithCount>(
        r#"
        SELECT c.id, c.name, c.slug, COUNT(b.id) AS blog_count
        FROM categories c
        LEFT JOIN blogs b ON b.category_id = c.id
        GROUP BY c.id, c.name, c.slug
        ORDER BY c.name
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_category_by_name(db: &PgPool, name: &str) -> anyhow::Result<Option<Category>> {
    let row = sqlx::query_as::<_, Category>(
        r#"SELECT id, name, slug FROM categories WHERE name = $1"#,
    )
    .bind(name)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn insert_category(db: &PgPool, name: &str, slug: &str) -> anyhow::Result<Category> {
    let row = sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO categories (name, slug)
        VALUES ($1, $2)
        RETURNING id, name, slug
        "#,
    )
    .bind(name)
    .bind(slug)
    .fetch_one(db)
    .await?;
    Ok(row)
}
