use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    constants::{
        ALREADY_FOLLOWING_AUTHOR, CANNOT_FOLLOW_YOURSELF, NOT_FOLLOWING_AUTHOR,
        RECIPES_LIMIT_DEFAULT, USER_NOT_FOUND,
    },
    error::{Error, QueryError, QueryErrorKind},
    schema::{Id, RecipeShort, SubscriptionRead, User, UserRead},
    session::SessionData,
};

use super::users::{get_user_by_id, is_subscribed};

pub async fn subscribe(
    session: &SessionData,
    author_id: Id,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionRead, Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let recipes_limit = resolve_recipes_limit(recipes_limit)?;

    let author = get_user_by_id(author_id, pool)
        .await?
        .ok_or_else(|| Error::NotFound(USER_NOT_FOUND.to_owned()))?;

    if author.id == session.user_id {
        return Err(Error::validation("author", CANNOT_FOLLOW_YOURSELF));
    }

    if is_subscribed(session.user_id, author.id, pool).await? {
        return Err(Error::Duplicate(ALREADY_FOLLOWING_AUTHOR.to_owned()));
    }

    sqlx::query("INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2)")
        .bind(session.user_id)
        .bind(author.id)
        .execute(pool)
        .await
        .map_err(|e| {
            let e = QueryError::from(e);
            match e.kind() {
                QueryErrorKind::UniqueViolation => {
                    Error::Duplicate(ALREADY_FOLLOWING_AUTHOR.to_owned())
                }
                QueryErrorKind::CheckViolation => {
                    Error::validation("author", CANNOT_FOLLOW_YOURSELF)
                }
                _ => Error::Query(e),
            }
        })?;

    subscription_read(&author, recipes_limit, pool).await
}

pub async fn unsubscribe(
    session: &SessionData,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    if get_user_by_id(author_id, pool).await?.is_none() {
        return Err(Error::NotFound(USER_NOT_FOUND.to_owned()));
    }

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(session.user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(NOT_FOLLOWING_AUTHOR.to_owned()));
    }

    Ok(())
}

/// Every author the session follows, with their newest `recipes_limit` recipes.
pub async fn list_subscriptions(
    session: &SessionData,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<SubscriptionRead>, Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let recipes_limit = resolve_recipes_limit(recipes_limit)?;

    let authors: Vec<User> = sqlx::query_as(
        "
        SELECT u.* FROM users u
        INNER JOIN subscriptions s ON s.author_id = u.id
        WHERE s.user_id = $1
        ORDER BY u.username;
    ",
    )
    .bind(session.user_id)
    .fetch_all(pool)
    .await?;

    subscription_reads(&authors, recipes_limit, pool).await
}

async fn subscription_read(
    author: &User,
    recipes_limit: i64,
    pool: &Pool<Postgres>,
) -> Result<SubscriptionRead, Error> {
    let mut reads = subscription_reads(std::slice::from_ref(author), recipes_limit, pool).await?;
    reads.pop().ok_or_else(|| Error::NotFound(USER_NOT_FOUND.to_owned()))
}

#[derive(sqlx::FromRow)]
struct AuthorRecipeRow {
    author_id: Id,
    #[sqlx(flatten)]
    recipe: RecipeShort,
}

/// Recipe previews and counts for every author in two queries.
async fn subscription_reads(
    authors: &[User],
    recipes_limit: i64,
    pool: &Pool<Postgres>,
) -> Result<Vec<SubscriptionRead>, Error> {
    let author_ids: Vec<Id> = authors.iter().map(|a| a.id).collect();

    let rows: Vec<AuthorRecipeRow> = sqlx::query_as(
        "
        SELECT author_id, id, name, image, cooking_time FROM (
            SELECT author_id, id, name, image, cooking_time, pub_date,
                ROW_NUMBER() OVER (PARTITION BY author_id ORDER BY pub_date DESC, id DESC) AS n
            FROM recipes
            WHERE author_id = ANY($1)
        ) ranked
        WHERE n <= $2
        ORDER BY author_id, pub_date DESC, id DESC;
    ",
    )
    .bind(&author_ids)
    .bind(recipes_limit)
    .fetch_all(pool)
    .await?;

    let counts: Vec<(Id, i64)> = sqlx::query_as(
        "SELECT author_id, COUNT(*) FROM recipes WHERE author_id = ANY($1) GROUP BY author_id",
    )
    .bind(&author_ids)
    .fetch_all(pool)
    .await?;

    let mut recipes: HashMap<Id, Vec<RecipeShort>> = HashMap::new();
    for row in rows {
        recipes.entry(row.author_id).or_default().push(row.recipe);
    }
    let counts: HashMap<Id, i64> = counts.into_iter().collect();

    Ok(authors
        .iter()
        .map(|author| SubscriptionRead {
            author: UserRead::from_user(author, true),
            recipes: recipes.remove(&author.id).unwrap_or_default(),
            recipes_count: counts.get(&author.id).copied().unwrap_or(0),
        })
        .collect())
}

fn resolve_recipes_limit(limit: Option<i64>) -> Result<i64, Error> {
    match limit {
        None => Ok(RECIPES_LIMIT_DEFAULT),
        Some(limit) if limit < 0 => Err(Error::validation(
            "recipes_limit",
            "Recipes limit can't be negative",
        )),
        Some(limit) => Ok(limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipes_limit_defaults() {
        assert_eq!(resolve_recipes_limit(None).unwrap(), RECIPES_LIMIT_DEFAULT);
        assert_eq!(resolve_recipes_limit(Some(0)).unwrap(), 0);
        assert_eq!(resolve_recipes_limit(Some(10)).unwrap(), 10);
        assert!(matches!(
            resolve_recipes_limit(Some(-1)),
            Err(Error::Validation(_))
        ));
    }
}
