use std::collections::{HashMap, HashSet};

use redis::aio::MultiplexedConnection;
use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    cache::cache::{invalidate_catalog_cache, CacheKeyType, RedisValue},
    constants::{INGREDIENT_ALREADY_EXISTS, MAX_CHAR_LENGTH},
    error::{Error, ValidationErrors},
    schema::{Id, Ingredient, RecipeIngredientRead, RecipeIngredientRow},
    session::SessionData,
};

/// Adds an ingredient to the catalog. Admin only.
/// With a cache connection the cached catalog listings are invalidated after the insert.
pub async fn create_ingredient(
    session: &SessionData,
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
    cache: Option<&mut MultiplexedConnection>,
) -> Result<Ingredient, Error> {
    session.authenticate(ActionType::ManageCatalog)?;

    let (name, measurement_unit) = (name.trim(), measurement_unit.trim());
    let mut errors = ValidationErrors::new();
    for (field, value) in [("name", name), ("measurement_unit", measurement_unit)] {
        if value.is_empty() || value.chars().count() > MAX_CHAR_LENGTH {
            errors.add(field, &format!("Must be 1 to {MAX_CHAR_LENGTH} characters"));
        }
    }
    errors.into_result(())?;

    let ingredient: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_one(pool)
    .await
    .map_err(Error::on_conflict(INGREDIENT_ALREADY_EXISTS))?;

    if let Some(cache) = cache {
        invalidate_catalog_cache(cache).await?;
    }

    Ok(ingredient)
}

pub async fn list_ingredients(pool: &Pool<Postgres>) -> Result<Vec<Ingredient>, Error> {
    let list: Vec<Ingredient> =
        sqlx::query_as("SELECT * FROM ingredients ORDER BY name, measurement_unit")
            .fetch_all(pool)
            .await?;

    Ok(list)
}

/// Case-insensitive prefix search, ordered by name.
pub async fn search_ingredients(
    prefix: &str,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let pattern = format!("{}%", escape_like(prefix.trim()));

    let list: Vec<Ingredient> = sqlx::query_as(
        "SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name, measurement_unit",
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(list)
}

/// `search_ingredients` through the catalog cache, keyed by the lowercased prefix.
pub async fn search_ingredients_cached(
    prefix: &str,
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<Ingredient>, Error> {
    let prefix = prefix.trim().to_lowercase();
    let key = CacheKeyType::Ingredients.new(prefix.to_owned());

    let pool = pool.clone();
    let value = RedisValue::get_or(key, cache, move || async move {
        search_ingredients(&prefix, &pool).await
    })
    .await?;

    Ok(value.value)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn existing_ingredient_ids(
    ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, Error> {
    let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

/// Ingredients of every recipe in `recipe_ids`, grouped by recipe in the order they were added.
pub async fn list_recipe_ingredients(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, Vec<RecipeIngredientRead>>, Error> {
    let rows: Vec<RecipeIngredientRow> = sqlx::query_as(
        "
        SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id;
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await?;

    let mut ingredients: HashMap<Id, Vec<RecipeIngredientRead>> = HashMap::new();
    for row in rows {
        ingredients.entry(row.recipe_id).or_default().push(row.into());
    }

    Ok(ingredients)
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("sug"), "sug");
        assert_eq!(escape_like("50%_x\\"), "50\\%\\_x\\\\");
    }
}
