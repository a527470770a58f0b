use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use crate::{
    auth::{dto::MessageResponse, guard, guard::AdminUser, jwt::AuthUser},
    blogs::{
        dto::{
            BlogPage, BlogQuery, BlogResponse, CreateBlogRequest, CreateCategoryRequest,
            PaginationMeta, UpdateBlogRequest,
        },
        repo,
        repo::CategoryWithCount,
    },
    error::ApiError,
    state::AppState,
};

/// Lowercase, collapse non-alphanumeric runs to '-', trim leading/trailing
/// dashes.
pub(crate) fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[instrument(skip(state))]
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(query): Query<BlogQuery>,
) -> Result<Json<BlogPage>, ApiError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 100);
    let offset = (page - 1) * limit;

    let rows = repo::list_published(&state.db, query.category, query.featured, limit, offset).await?;
    let total = repo::count_published(&state.db, query.category, query.featured).await?;

    Ok(Json(BlogPage {
        blogs: rows.into_iter().map(BlogResponse::from).collect(),
        pagination: PaginationMeta {
            total,
            pages: (total + limit - 1) / limit,
            page,
            limit,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_blog(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<CreateBlogRequest>,
) -> Result<(StatusCode, Json<BlogResponse>), ApiError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::validation("Title and category are required"));
    }

    let slug = slugify(title);
    let blog = repo::insert(
        &state.db,
        title,
        &slug,
        payload.content.as_deref(),
        payload.category_id,
        payload.featured_image.as_deref(),
        payload.is_featured,
        claims.sub,
    )
    .await?;

    let listing = repo::find_listing_by_slug(&state.db, &blog.slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Blog not found"))?;

    info!(blog_id = %blog.id, slug = %blog.slug, "blog created");
    Ok((StatusCode::CREATED, Json(BlogResponse::from(listing))))
}

#[instrument(skip(state))]
pub async fn get_blog(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogResponse>, ApiError> {
    let listing = repo::find_listing_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Blog not found"))?;
    Ok(Json(BlogResponse::from(listing)))
}

/// Authors may edit their own posts; anyone else must pass the admin check.
async fn authorize_blog_edit(
    state: &AppState,
    slug: &str,
    user_id: uuid::Uuid,
) -> Result<(), ApiError> {
    let blog = repo::find_by_slug(&state.db, slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Blog not found"))?;
    if blog.author_id == user_id {
        return Ok(());
    }
    guard::authorize_admin(&state.db, user_id).await
}

#[instrument(skip(state, payload))]
pub async fn update_blog(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(slug): Path<String>,
    Json(payload): Json<UpdateBlogRequest>,
) -> Result<Json<BlogResponse>, ApiError> {
    authorize_blog_edit(&state, &slug, claims.sub).await?;

    let new_slug = payload.title.as_deref().map(slugify);
    let updated = repo::update(
        &state.db,
        &slug,
        payload.title.as_deref(),
        new_slug.as_deref(),
        payload.content.as_deref(),
        payload.category_id,
        payload.featured_image.as_deref(),
        payload.is_featured,
        payload.is_published,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Blog not found"))?;

    let listing = repo::find_listing_by_slug(&state.db, &updated.slug)
        .await?
        .ok_or_else(|| ApiError::not_found("Blog not found"))?;

    info!(blog_id = %updated.id, slug = %updated.slug, "blog updated");
    Ok(Json(BlogResponse::from(listing)))
}

#[instrument(skip(state))]
pub async fn delete_blog(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(slug): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    authorize_blog_edit(&state, &slug, claims.sub).await?;

    if !repo::delete(&state.db, &slug).await? {
        return Err(ApiError::not_found("Blog not found"));
    }

    info!(slug = %slug, deleted_by = %claims.sub, "blog deleted");
    Ok(Json(MessageResponse::new("Blog deleted successfully")))
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryWithCount>>, ApiError> {
    let categories = repo::list_categories(&state.db).await?;
    Ok(Json(categories))
}

#[instrument(skip(state, _admin, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<repo::Category>), ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    if repo::find_category_by_name(&state.db, name).await?.is_some() {
        return Err(ApiError::Conflict("Category already exists".into()));
    }

    let category = repo::insert_category(&state.db, name, &slugify(name)).await?;
    info!(category_id = %category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Rust & Web: A Story"), "rust-web-a-story");
    }

    #[test]
    fn slugify_trims_and_collapses() {
        assert_eq!(slugify("  --Already--Dashed--  "), "already-dashed");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("C++ in 2026?"), "c-in-2026");
    }
}
