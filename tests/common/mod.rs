#![allow(dead_code)]

use anyhow::Result;
use foodgram_sdk::{
    create_recipe,
    form::{IngredientAmount, NewUser, RecipeForm},
    register_user, run_migrations,
    schema::{Id, Ingredient, RecipeRead, Tag},
    session::SessionData,
    validation::RecipeLimits,
};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use uuid::Uuid;

/// Connects to `DATABASE_URL` and applies migrations.
/// Returns None if `DATABASE_URL` is not set so the tests can be skipped.
pub async fn connect() -> Result<Option<Pool<Postgres>>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        println!("DATABASE_URL not set, skipping database tests");
        return Ok(None);
    };

    let pool = PgPoolOptions::new().max_connections(5).connect(&url).await?;
    run_migrations(&pool).await?;

    Ok(Some(pool))
}

macro_rules! require_database {
    ($pool:expr) => {
        match $pool {
            Some(pool) => pool,
            None => {
                println!("Skipping test: database not available");
                return Ok(());
            }
        }
    };
}

pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

pub async fn user(pool: &Pool<Postgres>) -> Result<SessionData> {
    let username = unique("cook");
    let user = register_user(
        NewUser {
            email: format!("{username}@example.com"),
            username,
            first_name: String::from("Test"),
            last_name: String::from("Cook"),
            password: String::from("correct horse"),
        },
        pool,
    )
    .await?;

    Ok(SessionData::from(&user))
}

pub async fn admin(pool: &Pool<Postgres>) -> Result<SessionData> {
    let mut session = user(pool).await?;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
        .bind(session.user_id)
        .execute(pool)
        .await?;
    session.role = foodgram_sdk::schema::UserRole::Admin;

    Ok(session)
}

pub async fn tag(pool: &Pool<Postgres>) -> Result<Tag> {
    let slug = unique("tag");
    let color = format!("#{}", &Uuid::new_v4().simple().to_string()[..6]);

    let tag: Tag =
        sqlx::query_as("INSERT INTO tags (name, color, slug) VALUES ($1, $2, $3) RETURNING *")
            .bind(&slug)
            .bind(color)
            .bind(&slug)
            .fetch_one(pool)
            .await?;

    Ok(tag)
}

pub async fn ingredient(name: &str, unit: &str, pool: &Pool<Postgres>) -> Result<Ingredient> {
    let ingredient: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING *",
    )
    .bind(unique(name))
    .bind(unit)
    .fetch_one(pool)
    .await?;

    Ok(ingredient)
}

pub fn form(tags: &[Id], ingredients: &[(Id, i32)]) -> RecipeForm {
    RecipeForm {
        name: unique("Recipe"),
        text: String::from("Mix everything and bake"),
        image: String::from("recipes/images/test.png"),
        cooking_time: 30,
        tags: tags.to_vec(),
        ingredients: ingredients
            .iter()
            .map(|&(id, amount)| IngredientAmount { id, amount })
            .collect(),
    }
}

/// Creates a recipe from `form(tags, ingredients)` under the default limits.
pub async fn recipe(
    author: &SessionData,
    tags: &[Id],
    ingredients: &[(Id, i32)],
    pool: &Pool<Postgres>,
) -> Result<RecipeRead> {
    let form = form(tags, ingredients);
    let recipe = create_recipe(author, form, &RecipeLimits::default(), pool).await?;

    Ok(recipe)
}
