use std::collections::HashSet;

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    authentication::permissions::ActionType,
    constants::{
        RECIPE_ALREADY_EXISTS, RECIPE_NOT_FOUND, UNKNOWN_INGREDIENT, UNKNOWN_TAG, USER_NOT_FOUND,
    },
    error::{Error, QueryError, QueryErrorKind},
    form::{RecipeFilter, RecipeForm},
    schema::{Id, RecipeRead, RecipeRow, UserRead},
    session::SessionData,
    validation::{check_references, validate_recipe, RecipeLimits, ValidRecipe},
};

use super::{
    collections::{viewer_recipe_ids, UserRecipeList},
    ingredients::{existing_ingredient_ids, list_recipe_ingredients},
    tags::{existing_tag_ids, list_recipe_tags},
    users::{followed_authors, get_users_by_ids},
};

/// Validates and stores a recipe authored by `session`. The recipe row, its ingredients
/// and its tags are written in one transaction.
pub async fn create_recipe(
    session: &SessionData,
    form: RecipeForm,
    limits: &RecipeLimits,
    pool: &Pool<Postgres>,
) -> Result<RecipeRead, Error> {
    session.authenticate(ActionType::CreateRecipes)?;

    let recipe = validate_recipe_form(form, limits, pool).await?;
    check_name_available(session.user_id, &recipe.name, None, pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id;
    ",
    )
    .bind(session.user_id)
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(&recipe.image)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(Error::on_conflict(RECIPE_ALREADY_EXISTS))?;

    insert_recipe_parts(id.0, &recipe, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::trace!("> Created recipe {} for {}", id.0, session.username);
    get_recipe(id.0, Some(session), pool).await
}

/// Replaces every field of a recipe, including its full ingredient and tag sets.
pub async fn update_recipe(
    session: &SessionData,
    id: Id,
    form: RecipeForm,
    limits: &RecipeLimits,
    pool: &Pool<Postgres>,
) -> Result<RecipeRead, Error> {
    let row = get_recipe_mut(session, id, pool).await?;

    let recipe = validate_recipe_form(form, limits, pool).await?;
    check_name_available(row.author_id, &recipe.name, Some(id), pool).await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query(
        "UPDATE recipes SET name = $2, text = $3, image = $4, cooking_time = $5 WHERE id = $1",
    )
    .bind(id)
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(&recipe.image)
    .bind(recipe.cooking_time)
    .execute(&mut *tr)
    .await
    .map_err(Error::on_conflict(RECIPE_ALREADY_EXISTS))?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    insert_recipe_parts(id, &recipe, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    get_recipe(id, Some(session), pool).await
}

/// Deletes a recipe. Ingredients, tag links, favorites and cart entries go with it.
pub async fn delete_recipe(
    session: &SessionData,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    get_recipe_mut(session, id, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Loads a recipe the session is allowed to modify: its own, or any for admins.
pub async fn get_recipe_mut(
    session: &SessionData,
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipeRow, Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    let row = get_recipe_row(id, pool)
        .await?
        .ok_or_else(|| Error::NotFound(RECIPE_NOT_FOUND.to_owned()))?;

    session.authenticate_owner(row.author_id, ActionType::ManageAllRecipes)?;

    Ok(row)
}

pub async fn get_recipe_row(id: Id, pool: &Pool<Postgres>) -> Result<Option<RecipeRow>, Error> {
    let row: Option<RecipeRow> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_recipe(
    id: Id,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<RecipeRead, Error> {
    let row = get_recipe_row(id, pool)
        .await?
        .ok_or_else(|| Error::NotFound(RECIPE_NOT_FOUND.to_owned()))?;

    assemble_recipes(vec![row], viewer, pool)
        .await?
        .pop()
        .ok_or_else(|| Error::NotFound(RECIPE_NOT_FOUND.to_owned()))
}

/// Recipes matching `filter`, newest first. Anonymous viewers have no favorites or cart,
/// so those two flags are ignored for them.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeRead>, Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.* FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query_builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.to_owned())
            .push("))");
    }

    if let Some(viewer) = viewer {
        if filter.is_favorited {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM favorites f")
                .push(" WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer.user_id)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM shopping_cart sc")
                .push(" WHERE sc.recipe_id = r.id AND sc.user_id = ")
                .push_bind(viewer.user_id)
                .push(")");
        }
    }

    query_builder.push(" ORDER BY r.pub_date DESC, r.id DESC");

    if let Some(limit) = filter.limit {
        if limit < 0 {
            return Err(Error::validation("limit", "Limit can't be negative"));
        }
        query_builder.push(" LIMIT ").push_bind(limit);
    }
    if let Some(offset) = filter.offset {
        if offset < 0 {
            return Err(Error::validation("offset", "Offset can't be negative"));
        }
        query_builder.push(" OFFSET ").push_bind(offset);
    }

    let rows: Vec<RecipeRow> = query_builder.build_query_as::<RecipeRow>().fetch_all(pool).await?;

    assemble_recipes(rows, viewer, pool).await
}

/// Builds the read representation for a batch of rows with one query per relation.
async fn assemble_recipes(
    rows: Vec<RecipeRow>,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeRead>, Error> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Id> = rows.iter().map(|row| row.id).collect();
    let author_ids: Vec<Id> = rows
        .iter()
        .map(|row| row.author_id)
        .collect::<HashSet<Id>>()
        .into_iter()
        .collect();

    let authors = get_users_by_ids(&author_ids, pool).await?;
    let mut tags = list_recipe_tags(&ids, pool).await?;
    let mut ingredients = list_recipe_ingredients(&ids, pool).await?;

    let (favorites, cart, followed) = match viewer {
        Some(viewer) => (
            viewer_recipe_ids(UserRecipeList::Favorites, viewer.user_id, &ids, pool).await?,
            viewer_recipe_ids(UserRecipeList::ShoppingCart, viewer.user_id, &ids, pool).await?,
            followed_authors(viewer.user_id, pool).await?,
        ),
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    rows.into_iter()
        .map(|row| {
            let author = authors
                .get(&row.author_id)
                .ok_or_else(|| Error::NotFound(USER_NOT_FOUND.to_owned()))?;

            Ok(RecipeRead {
                id: row.id,
                tags: tags.remove(&row.id).unwrap_or_default(),
                author: UserRead::from_user(author, followed.contains(&author.id)),
                ingredients: ingredients.remove(&row.id).unwrap_or_default(),
                is_favorited: favorites.contains(&row.id),
                is_in_shopping_cart: cart.contains(&row.id),
                name: row.name,
                image: row.image,
                text: row.text,
                cooking_time: row.cooking_time,
                pub_date: row.pub_date,
            })
        })
        .collect()
}

async fn validate_recipe_form(
    form: RecipeForm,
    limits: &RecipeLimits,
    pool: &Pool<Postgres>,
) -> Result<ValidRecipe, Error> {
    let mut errors = validate_recipe(&form, limits);

    let ingredient_ids: Vec<Id> = form.ingredients.iter().map(|i| i.id).collect();
    let known_tags = existing_tag_ids(&form.tags, pool).await?;
    let known_ingredients = existing_ingredient_ids(&ingredient_ids, pool).await?;
    errors.merge(check_references(&form, &known_tags, &known_ingredients));

    errors.into_result(ValidRecipe::from(form))
}

async fn check_name_available(
    author_id: Id,
    name: &str,
    except: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let row: Option<(Id,)> = sqlx::query_as(
        "SELECT id FROM recipes WHERE author_id = $1 AND name = $2 AND id IS DISTINCT FROM $3",
    )
    .bind(author_id)
    .bind(name)
    .bind(except)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(_) => Err(Error::Duplicate(RECIPE_ALREADY_EXISTS.to_owned())),
        None => Ok(()),
    }
}

async fn insert_recipe_parts(
    recipe_id: Id,
    recipe: &ValidRecipe,
    tr: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    query_builder.push_values(recipe.ingredients.iter(), |mut b, ingredient| {
        b.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });
    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(missing_reference("ingredients", UNKNOWN_INGREDIENT))?;

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query_builder.push_values(recipe.tags.iter(), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });
    query_builder
        .build()
        .execute(&mut **tr)
        .await
        .map_err(missing_reference("tags", UNKNOWN_TAG))?;

    Ok(())
}

/// A catalog row deleted after validation surfaces as a foreign key violation.
fn missing_reference(
    field: &'static str,
    message: &'static str,
) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| {
        let e = QueryError::from(e);
        match e.kind() {
            QueryErrorKind::ForeignKeyViolation => Error::validation(field, message),
            _ => Error::Query(e),
        }
    }
}
