#[macro_use]
mod common;

use anyhow::Result;
use foodgram_sdk::{
    create_ingredient, create_tag, invalidate_catalog_cache, list_tags_cached,
    search_ingredients_cached, CacheKeyType, RedisValue,
};
use redis::aio::MultiplexedConnection;

/// Returns None if `REDIS_URL` is not set so the tests can be skipped.
async fn connect_cache() -> Result<Option<MultiplexedConnection>> {
    let Ok(url) = std::env::var("REDIS_URL") else {
        println!("REDIS_URL not set, skipping cache tests");
        return Ok(None);
    };

    let client = redis::Client::open(url)?;
    Ok(Some(client.get_multiplexed_async_connection().await?))
}

macro_rules! require_redis {
    ($cache:expr) => {
        match $cache {
            Some(cache) => cache,
            None => {
                println!("Skipping test: Redis not available");
                return Ok(());
            }
        }
    };
}

#[tokio::test]
async fn cached_value_is_served_until_invalidated() -> Result<()> {
    let mut cache = require_redis!(connect_cache().await?);
    let key = common::unique("counter");

    let first = RedisValue::get_or(
        CacheKeyType::Tags.new(key.to_owned()),
        &mut cache,
        || async { Ok(1_u32) },
    )
    .await?;
    assert_eq!(first.value, 1);

    let cached = RedisValue::get_or(
        CacheKeyType::Tags.new(key.to_owned()),
        &mut cache,
        || async { Ok(2_u32) },
    )
    .await?;
    assert_eq!(cached.value, 1);

    invalidate_catalog_cache(&mut cache).await?;

    let refreshed = RedisValue::get_or(
        CacheKeyType::Tags.new(key.to_owned()),
        &mut cache,
        || async { Ok(3_u32) },
    )
    .await?;
    assert_eq!(refreshed.value, 3);

    Ok(())
}

#[tokio::test]
async fn missing_optional_value_is_not_cached() -> Result<()> {
    let mut cache = require_redis!(connect_cache().await?);
    let key = common::unique("absent");

    let value = RedisValue::<String>::get_or_optional(
        CacheKeyType::Ingredients.new(key.to_owned()),
        &mut cache,
        || async { Ok(None) },
    )
    .await?;
    assert!(value.is_none());

    let value = RedisValue::get_or_optional(
        CacheKeyType::Ingredients.new(key.to_owned()),
        &mut cache,
        || async { Ok(Some(String::from("found"))) },
    )
    .await?;
    assert_eq!(value.map(|v| v.value).as_deref(), Some("found"));

    Ok(())
}

#[tokio::test]
async fn catalog_reads_through_cache() -> Result<()> {
    let mut cache = require_redis!(connect_cache().await?);
    let pool = require_database!(common::connect().await?);

    let tag = common::tag(&pool).await?;
    invalidate_catalog_cache(&mut cache).await?;
    assert!(list_tags_cached(&pool, &mut cache).await?.contains(&tag));

    let flour = common::ingredient("flour", "g", &pool).await?;
    let found = search_ingredients_cached(&flour.name, &pool, &mut cache).await?;
    assert_eq!(found, vec![flour]);

    Ok(())
}

#[tokio::test]
async fn admin_catalog_writes_refresh_cached_listings() -> Result<()> {
    let mut cache = require_redis!(connect_cache().await?);
    let pool = require_database!(common::connect().await?);
    let admin = common::admin(&pool).await?;

    let before = list_tags_cached(&pool, &mut cache).await?;
    let slug = common::unique("seasonal");
    let color = format!("#{}", &uuid::Uuid::new_v4().simple().to_string()[..6]);
    let tag = create_tag(&admin, &slug, &color, &slug, &pool, Some(&mut cache)).await?;
    assert!(!before.contains(&tag));
    assert!(list_tags_cached(&pool, &mut cache).await?.contains(&tag));

    let name = common::unique("saffron");
    assert!(search_ingredients_cached(&name, &pool, &mut cache)
        .await?
        .is_empty());
    let saffron = create_ingredient(&admin, &name, "g", &pool, Some(&mut cache)).await?;
    assert_eq!(
        search_ingredients_cached(&name, &pool, &mut cache).await?,
        vec![saffron]
    );

    Ok(())
}
