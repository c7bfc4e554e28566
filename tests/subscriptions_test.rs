#[macro_use]
mod common;

use anyhow::Result;
use foodgram_sdk::{
    get_recipe, get_user_read, list_subscriptions, subscribe, unsubscribe, Error,
    RECIPES_LIMIT_DEFAULT,
};

#[tokio::test]
async fn cannot_follow_yourself() -> Result<()> {
    let pool = require_database!(common::connect().await?);
    let user = common::user(&pool).await?;

    match subscribe(&user, user.user_id, None, &pool).await {
        Err(Error::Validation(errors)) => assert!(errors.contains("author")),
        other => panic!("unexpected result: {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn follow_twice_and_unfollow_twice() -> Result<()> {
    let pool = require_database!(common::connect().await?);
    let follower = common::user(&pool).await?;
    let author = common::user(&pool).await?;

    let subscription = subscribe(&follower, author.user_id, None, &pool).await?;
    assert_eq!(subscription.author.id, author.user_id);
    assert!(subscription.author.is_subscribed);
    assert_eq!(subscription.recipes_count, 0);

    assert!(matches!(
        subscribe(&follower, author.user_id, None, &pool).await,
        Err(Error::Duplicate(_))
    ));
    assert!(get_user_read(author.user_id, Some(&follower), &pool).await?.is_subscribed);

    unsubscribe(&follower, author.user_id, &pool).await?;
    assert!(matches!(
        unsubscribe(&follower, author.user_id, &pool).await,
        Err(Error::NotFound(_))
    ));
    assert!(!get_user_read(author.user_id, Some(&follower), &pool).await?.is_subscribed);

    Ok(())
}

#[tokio::test]
async fn missing_author_is_not_found() -> Result<()> {
    let pool = require_database!(common::connect().await?);
    let user = common::user(&pool).await?;

    assert!(matches!(
        subscribe(&user, i32::MAX, None, &pool).await,
        Err(Error::NotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn subscriptions_list_newest_recipes() -> Result<()> {
    let pool = require_database!(common::connect().await?);
    let follower = common::user(&pool).await?;
    let author = common::user(&pool).await?;
    let tag = common::tag(&pool).await?;
    let flour = common::ingredient("flour", "g", &pool).await?;

    let mut ids = Vec::new();
    for _ in 0..5 {
        let recipe = common::recipe(&author, &[tag.id], &[(flour.id, 100)], &pool).await?;
        ids.push(recipe.id);
    }
    subscribe(&follower, author.user_id, None, &pool).await?;

    let subscriptions = list_subscriptions(&follower, None, &pool).await?;
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].recipes_count, 5);
    assert_eq!(subscriptions[0].recipes.len() as i64, RECIPES_LIMIT_DEFAULT);
    assert_eq!(subscriptions[0].recipes[0].id, ids[4]);

    let subscriptions = list_subscriptions(&follower, Some(1), &pool).await?;
    assert_eq!(subscriptions[0].recipes.len(), 1);

    let recipe = get_recipe(ids[0], Some(&follower), &pool).await?;
    assert!(recipe.author.is_subscribed);

    Ok(())
}

#[tokio::test]
async fn each_followed_author_gets_own_previews() -> Result<()> {
    let pool = require_database!(common::connect().await?);
    let follower = common::user(&pool).await?;
    let (baker, cook, idle) = (
        common::user(&pool).await?,
        common::user(&pool).await?,
        common::user(&pool).await?,
    );
    let tag = common::tag(&pool).await?;
    let flour = common::ingredient("flour", "g", &pool).await?;

    let mut baked = Vec::new();
    for _ in 0..2 {
        let recipe = common::recipe(&baker, &[tag.id], &[(flour.id, 100)], &pool).await?;
        baked.push(recipe.id);
    }
    let cooked = common::recipe(&cook, &[tag.id], &[(flour.id, 50)], &pool).await?.id;

    for author in [&baker, &cook, &idle] {
        subscribe(&follower, author.user_id, None, &pool).await?;
    }

    let subscriptions = list_subscriptions(&follower, Some(1), &pool).await?;
    assert_eq!(subscriptions.len(), 3);
    for subscription in subscriptions {
        let ids: Vec<_> = subscription.recipes.iter().map(|r| r.id).collect();
        if subscription.author.id == baker.user_id {
            assert_eq!(ids, vec![baked[1]]);
            assert_eq!(subscription.recipes_count, 2);
        } else if subscription.author.id == cook.user_id {
            assert_eq!(ids, vec![cooked]);
            assert_eq!(subscription.recipes_count, 1);
        } else {
            assert!(ids.is_empty());
            assert_eq!(subscription.recipes_count, 0);
        }
        assert!(subscription.author.is_subscribed);
    }

    Ok(())
}
