use std::collections::{HashMap, HashSet};

use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    cache::cache::{invalidate_catalog_cache, CacheKeyType, RedisValue},
    constants::TAG_ALREADY_EXISTS,
    error::Error,
    schema::{Id, RecipeTagRow, Tag},
    session::SessionData,
    validation::validate_tag,
};

/// Adds a tag to the catalog. Admin only.
/// With a cache connection the cached catalog listings are invalidated after the insert.
pub async fn create_tag(
    session: &SessionData,
    name: &str,
    color: &str,
    slug: &str,
    pool: &Pool<Postgres>,
    cache: Option<&mut MultiplexedConnection>,
) -> Result<Tag, Error> {
    session.authenticate(ActionType::ManageCatalog)?;
    validate_tag(name, color, slug).into_result(())?;

    let tag: Tag =
        sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *")
            .bind(name.trim())
            .bind(color)
            .bind(slug)
            .fetch_one(pool)
            .await
            .map_err(Error::on_conflict(TAG_ALREADY_EXISTS))?;

    if let Some(cache) = cache {
        invalidate_catalog_cache(cache).await?;
    }

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(list)
}

/// `list_tags` through the catalog cache. Falls back to the database on a cache miss.
pub async fn list_tags_cached(
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<Tag>, Error> {
    let pool = pool.clone();
    let value = RedisValue::get_or(CacheKeyType::Tags.new("all"), cache, move || async move {
        list_tags(&pool).await
    })
    .await?;

    Ok(value.value)
}

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

pub async fn get_tag_by_slug(slug: &str, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(tag)
}

/// Which of `ids` exist in the tag catalog.
pub async fn existing_tag_ids(ids: &[Id], pool: &Pool<Postgres>) -> Result<HashSet<Id>, Error> {
    let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Tags of every recipe in `recipe_ids`, grouped by recipe and ordered by tag name.
pub async fn list_recipe_tags(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, Vec<Tag>>, Error> {
    let rows: Vec<RecipeTagRow> = sqlx::query_as(
        "
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name;
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    let mut tags: HashMap<Id, Vec<Tag>> = HashMap::new();
    for row in rows {
        tags.entry(row.recipe_id).or_default().push(row.into());
    }

    Ok(tags)
}
