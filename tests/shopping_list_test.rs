#[macro_use]
mod common;

use anyhow::Result;
use foodgram_sdk::{
    add_to_shopping_cart, download_shopping_list,
    export::{ExportFormat, ExportOptions},
    schema::ShoppingListItem,
    shopping_list, Error,
};

#[tokio::test]
async fn cart_is_aggregated_by_ingredient() -> Result<()> {
    let pool = require_database!(common::connect().await?);
    let author = common::user(&pool).await?;
    let shopper = common::user(&pool).await?;
    let tag = common::tag(&pool).await?;
    let flour = common::ingredient("flour", "g", &pool).await?;
    let sugar = common::ingredient("sugar", "g", &pool).await?;

    let a = common::recipe(&author, &[tag.id], &[(flour.id, 200)], &pool).await?;
    let b = common::recipe(&author, &[tag.id], &[(sugar.id, 50), (flour.id, 100)], &pool).await?;
    add_to_shopping_cart(&shopper, a.id, &pool).await?;
    add_to_shopping_cart(&shopper, b.id, &pool).await?;

    let items = shopping_list(shopper.user_id, &pool).await?;
    assert_eq!(
        items,
        vec![
            ShoppingListItem {
                name: flour.name.to_owned(),
                measurement_unit: String::from("g"),
                total_amount: 300,
            },
            ShoppingListItem {
                name: sugar.name.to_owned(),
                measurement_unit: String::from("g"),
                total_amount: 50,
            },
        ]
    );

    let options = ExportOptions::default();
    let document = download_shopping_list(&shopper, ExportFormat::Text, &options, &pool).await?;
    let text = String::from_utf8(document.bytes)?;
    assert_eq!(text.lines().count(), 4);
    assert!(text.contains(&format!("{} (g) \u{2014} 300", flour.name)));
    assert_eq!(document.filename, format!("{}_shopping_list.txt", shopper.username));

    let document = download_shopping_list(&shopper, ExportFormat::Pdf, &options, &pool).await?;
    assert!(document.bytes.starts_with(b"%PDF"));

    Ok(())
}

#[tokio::test]
async fn same_amount_in_two_recipes_counts_twice() -> Result<()> {
    let pool = require_database!(common::connect().await?);
    let author = common::user(&pool).await?;
    let shopper = common::user(&pool).await?;
    let tag = common::tag(&pool).await?;
    let salt = common::ingredient("salt", "g", &pool).await?;

    for _ in 0..2 {
        let recipe = common::recipe(&author, &[tag.id], &[(salt.id, 5)], &pool).await?;
        add_to_shopping_cart(&shopper, recipe.id, &pool).await?;
    }

    let items = shopping_list(shopper.user_id, &pool).await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].total_amount, 10);

    Ok(())
}

#[tokio::test]
async fn empty_cart_cannot_be_exported() -> Result<()> {
    let pool = require_database!(common::connect().await?);
    let shopper = common::user(&pool).await?;

    assert!(shopping_list(shopper.user_id, &pool).await?.is_empty());
    for format in [ExportFormat::Text, ExportFormat::Pdf] {
        assert!(matches!(
            download_shopping_list(&shopper, format, &ExportOptions::default(), &pool).await,
            Err(Error::EmptyShoppingCart)
        ));
    }

    Ok(())
}
