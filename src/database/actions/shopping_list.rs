use std::collections::BTreeMap;

use sqlx::{Pool, Postgres};

use crate::{
    authentication::permissions::ActionType,
    error::Error,
    export::{render, ExportFormat, ExportOptions, ExportedDocument},
    schema::{Id, ShoppingListItem},
    session::SessionData,
};

/// One ingredient line of one recipe in the cart.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListPart {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

pub async fn fetch_cart_parts(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListPart>, Error> {
    let rows: Vec<ShoppingListPart> = sqlx::query_as(
        "
        SELECT i.name, i.measurement_unit, ri.amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = $1;
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Sums amounts per `(name, unit)`. Equal amounts from different recipes all count.
/// Sorted by name, then unit.
pub fn aggregate(parts: Vec<ShoppingListPart>) -> Vec<ShoppingListItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for part in parts {
        *totals
            .entry((part.name, part.measurement_unit))
            .or_default() += i64::from(part.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| ShoppingListItem {
            name,
            measurement_unit,
            total_amount,
        })
        .collect()
}

pub async fn shopping_list(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListItem>, Error> {
    let parts = fetch_cart_parts(user_id, pool).await?;
    Ok(aggregate(parts))
}

/// Renders the session's aggregated cart. An empty cart is `Error::EmptyShoppingCart`.
pub async fn download_shopping_list(
    session: &SessionData,
    format: ExportFormat,
    options: &ExportOptions,
    pool: &Pool<Postgres>,
) -> Result<ExportedDocument, Error> {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;

    let items = shopping_list(session.user_id, pool).await?;
    render(&items, &session.username, format, options)
}
