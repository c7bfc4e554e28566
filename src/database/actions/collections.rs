use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    constants::{
        RECIPE_ALREADY_IN_FAVORITES, RECIPE_ALREADY_IN_SHOPPING_CART, RECIPE_NOT_FOUND,
        RECIPE_NOT_IN_FAVORITES, RECIPE_NOT_IN_SHOPPING_CART,
    },
    error::Error,
    schema::{Id, RecipeShort},
    session::SessionData,
};

/// Per-user recipe collections.
/// Both are `(user_id, recipe_id)` tables with a unique pair constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserRecipeList {
    Favorites,
    ShoppingCart,
}

impl UserRecipeList {
    fn table(self) -> &'static str {
        match self {
            UserRecipeList::Favorites => "favorites",
            UserRecipeList::ShoppingCart => "shopping_cart",
        }
    }

    fn already_added(self) -> &'static str {
        match self {
            UserRecipeList::Favorites => RECIPE_ALREADY_IN_FAVORITES,
            UserRecipeList::ShoppingCart => RECIPE_ALREADY_IN_SHOPPING_CART,
        }
    }

    fn not_added(self) -> &'static str {
        match self {
            UserRecipeList::Favorites => RECIPE_NOT_IN_FAVORITES,
            UserRecipeList::ShoppingCart => RECIPE_NOT_IN_SHOPPING_CART,
        }
    }

    fn action(self) -> ActionType {
        match self {
            UserRecipeList::Favorites => ActionType::ManageOwnFavorites,
            UserRecipeList::ShoppingCart => ActionType::ManageOwnShoppingCart,
        }
    }
}

/// Adds a recipe to the session's list. The existence check gives the friendly error,
/// the unique constraint catches concurrent adds.
pub async fn add_recipe_to_list(
    list: UserRecipeList,
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, Error> {
    session.authenticate(list.action())?;

    let recipe = get_recipe_short(recipe_id, pool).await?;

    if list_contains(list, session.user_id, recipe_id, pool).await? {
        return Err(Error::Duplicate(list.already_added().to_owned()));
    }

    let query = format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2)",
        list.table()
    );
    sqlx::query(&query)
        .bind(session.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(Error::on_conflict(list.already_added()))?;

    Ok(recipe)
}

pub async fn remove_recipe_from_list(
    list: UserRecipeList,
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(list.action())?;

    get_recipe_short(recipe_id, pool).await?;

    let query = format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        list.table()
    );
    let result = sqlx::query(&query)
        .bind(session.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(list.not_added().to_owned()));
    }

    Ok(())
}

/// Recipes in a user's list, most recently added first.
pub async fn list_user_recipes(
    list: UserRecipeList,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeShort>, Error> {
    let query = format!(
        "
        SELECT r.id, r.name, r.image, r.cooking_time
        FROM {} l
        INNER JOIN recipes r ON r.id = l.recipe_id
        WHERE l.user_id = $1
        ORDER BY l.added_date DESC, r.id DESC;
    ",
        list.table()
    );
    let rows: Vec<RecipeShort> = sqlx::query_as(&query)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

pub async fn add_to_favorites(
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, Error> {
    add_recipe_to_list(UserRecipeList::Favorites, session, recipe_id, pool).await
}

pub async fn remove_from_favorites(
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    remove_recipe_from_list(UserRecipeList::Favorites, session, recipe_id, pool).await
}

pub async fn list_favorites(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeShort>, Error> {
    list_user_recipes(UserRecipeList::Favorites, session.user_id, pool).await
}

pub async fn add_to_shopping_cart(
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<RecipeShort, Error> {
    add_recipe_to_list(UserRecipeList::ShoppingCart, session, recipe_id, pool).await
}

pub async fn remove_from_shopping_cart(
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    remove_recipe_from_list(UserRecipeList::ShoppingCart, session, recipe_id, pool).await
}

pub async fn list_shopping_cart(
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeShort>, Error> {
    list_user_recipes(UserRecipeList::ShoppingCart, session.user_id, pool).await
}

async fn get_recipe_short(recipe_id: Id, pool: &Pool<Postgres>) -> Result<RecipeShort, Error> {
    let row: Option<RecipeShort> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await?;

    row.ok_or_else(|| Error::NotFound(RECIPE_NOT_FOUND.to_owned()))
}

async fn list_contains(
    list: UserRecipeList,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let ids = viewer_recipe_ids(list, user_id, &[recipe_id], pool).await?;
    Ok(ids.contains(&recipe_id))
}

/// Which of `recipe_ids` are in the user's list.
pub(crate) async fn viewer_recipe_ids(
    list: UserRecipeList,
    user_id: Id,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, Error> {
    let query = format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = ANY($2)",
        list.table()
    );
    let rows: Vec<(Id,)> = sqlx::query_as(&query)
        .bind(user_id)
        .bind(recipe_ids)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}
