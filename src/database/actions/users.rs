use std::collections::{HashMap, HashSet};

use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        permissions::ActionType,
    },
    constants::{USER_ALREADY_EXISTS, USER_NOT_FOUND},
    error::Error,
    form::{NewUser, PasswordChange},
    schema::{Id, User, UserRead},
    session::SessionData,
    validation::{validate_new_user, validate_password},
};

/// Validates and stores a new user with an argon2 hash of their password.
pub async fn register_user(user: NewUser, pool: &Pool<Postgres>) -> Result<User, Error> {
    validate_new_user(&user).into_result(())?;

    let existing: Option<(Id,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = $1 OR username = $2")
            .bind(&user.email)
            .bind(&user.username)
            .fetch_optional(pool)
            .await?;
    if existing.is_some() {
        return Err(Error::Duplicate(USER_ALREADY_EXISTS.to_owned()));
    }

    let password = hash_password(&user.password)?;

    let row: User = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *;
    ",
    )
    .bind(user.email.trim())
    .bind(&user.username)
    .bind(user.first_name.trim())
    .bind(user.last_name.trim())
    .bind(password)
    .fetch_one(pool)
    .await
    .map_err(Error::on_conflict(USER_ALREADY_EXISTS))?;

    log::info!("Registered user {}", row.username);
    Ok(row)
}

pub async fn get_user_by_id(user_id: Id, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_email(email: &str, pool: &Pool<Postgres>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Checks login credentials. A wrong password and an unknown email look the same to the caller.
pub async fn authenticate_user(
    email: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<SessionData>, Error> {
    let user = match get_user_by_email(email, pool).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    match verify_password(password, &user.password)? {
        true => Ok(Some(SessionData::from(&user))),
        false => Ok(None),
    }
}

pub async fn list_users(
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Vec<UserRead>, Error> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY username")
        .fetch_all(pool)
        .await?;

    let followed = match viewer {
        Some(viewer) => followed_authors(viewer.user_id, pool).await?,
        None => HashSet::new(),
    };

    Ok(rows
        .iter()
        .map(|user| UserRead::from_user(user, followed.contains(&user.id)))
        .collect())
}

/// Profile of `user_id` with `is_subscribed` answered for `viewer`.
/// Anonymous viewers follow nobody.
pub async fn get_user_read(
    user_id: Id,
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<UserRead, Error> {
    let user = get_user_by_id(user_id, pool)
        .await?
        .ok_or_else(|| Error::NotFound(USER_NOT_FOUND.to_owned()))?;

    let is_subscribed = match viewer {
        Some(viewer) => is_subscribed(viewer.user_id, user_id, pool).await?,
        None => false,
    };

    Ok(UserRead::from_user(&user, is_subscribed))
}

pub async fn set_password(
    session: &SessionData,
    change: PasswordChange,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    validate_password(&change.new_password).into_result(())?;

    let user = get_user_by_id(session.user_id, pool)
        .await?
        .ok_or_else(|| Error::NotFound(USER_NOT_FOUND.to_owned()))?;

    if !verify_password(&change.current_password, &user.password)? {
        return Err(Error::validation("current_password", "Wrong password"));
    }

    sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
        .bind(user.id)
        .bind(hash_password(&change.new_password)?)
        .execute(pool)
        .await?;

    Ok(())
}

/// Removes a user with everything they own. Admin only.
pub async fn delete_user(
    session: &SessionData,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageUsers)?;

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(USER_NOT_FOUND.to_owned()));
    }

    log::info!("Deleted user {user_id}");
    Ok(())
}

pub(crate) async fn is_subscribed(
    user_id: Id,
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let row: Option<(Id,)> =
        sqlx::query_as("SELECT author_id FROM subscriptions WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

pub(crate) async fn followed_authors(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, Error> {
    let rows: Vec<(Id,)> = sqlx::query_as("SELECT author_id FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

pub(crate) async fn get_users_by_ids(
    ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashMap<Id, User>, Error> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|user| (user.id, user)).collect())
}
