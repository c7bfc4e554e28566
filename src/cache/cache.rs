use std::future::Future;

use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{CacheError, Error};

const CATALOG_CACHE_KEY: &str = "catalog-cache-key";

// Caching - keys

#[derive(Serialize, Clone, Debug)]
pub struct CacheKey<T: ToString + Serialize> {
    _value: T,
    _type: CacheKeyType,
}

impl<T: ToString + Serialize> CacheKey<T> {
    pub fn from(r#type: CacheKeyType, key: T) -> Self {
        Self {
            _value: key,
            _type: r#type,
        }
    }
}

impl<T: ToString + Serialize> std::fmt::Display for CacheKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key: String = self.into();
        write!(f, "{key}")
    }
}

impl<T: ToString + Serialize> From<&CacheKey<T>> for String {
    fn from(key: &CacheKey<T>) -> Self {
        match &key._type {
            CacheKeyType::Tags => format!("tags-{}", key._value.to_string()),
            CacheKeyType::Ingredients => format!("ingredients-{}", key._value.to_string()),
            CacheKeyType::Custom(_) => key._value.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CacheKeyType {
    Tags,
    Ingredients,
    Custom(String),
}

impl CacheKeyType {
    pub fn new<T: ToString + Serialize>(self, key: T) -> CacheKey<T> {
        CacheKey::from(self, key)
    }
}

impl<T: ToString + Serialize> From<CacheKey<T>> for CacheLifetime {
    fn from(key: CacheKey<T>) -> Self {
        match key._type {
            CacheKeyType::Tags | CacheKeyType::Ingredients => CacheLifetime::BindCatalogCache,
            CacheKeyType::Custom(value) => CacheLifetime::Custom(value),
        }
    }
}

// Cache - wrappers

/// What a cached value's validity is tied to.
/// Rotating the bind invalidates every value bound to it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum CacheLifetime {
    Infinite,
    Custom(String),
    BindCatalogCache,
}

impl CacheLifetime {
    pub async fn get_cache_bind(
        &self,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<String>, Error> {
        match self {
            CacheLifetime::Infinite => Ok(None),
            CacheLifetime::BindCatalogCache => {
                get_cache_value::<&str, String>(CATALOG_CACHE_KEY, cache).await
            }
            CacheLifetime::Custom(value) => Ok(Some(value.to_owned())),
        }
    }

    pub async fn validate_cache_bind(
        &self,
        bind: &Option<String>,
        lifetime: Self,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, Error> {
        match self {
            CacheLifetime::Custom(value) => match lifetime {
                CacheLifetime::Custom(_value) => Ok(value == &_value),
                _ => {
                    log::error!("Found conflicting bindings");
                    Err(CacheError::new(String::from("Conflicting cache bindings")).into())
                }
            },
            _ => Ok(bind == &self.get_cache_bind(cache).await?),
        }
    }

    /// Rotates the bind so every value cached under it is treated as stale.
    pub async fn invalidate(&self, cache: &mut MultiplexedConnection) -> Result<(), Error> {
        match self {
            CacheLifetime::BindCatalogCache => {
                let bind = uuid::Uuid::new_v4().to_string();
                log::trace!("> Rotating {CATALOG_CACHE_KEY} to {bind}");
                set_cache_value(CATALOG_CACHE_KEY, bind, cache).await
            }
            CacheLifetime::Infinite | CacheLifetime::Custom(_) => Ok(()),
        }
    }
}

/// What actually sits in Redis: the value as JSON plus the bind it was cached under.
#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone, Debug)]
struct CacheEnvelope {
    value: serde_json::Value,
    lifetime: CacheLifetime,
    bind: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RedisValue<T> {
    pub value: T,
    _lifetime: CacheLifetime,
    _bind: Option<String>,
}

impl<T: Serialize + DeserializeOwned + Send + Sync + Clone> RedisValue<T> {
    async fn new(
        value: T,
        lifetime: CacheLifetime,
        cache: &mut MultiplexedConnection,
    ) -> Result<Self, Error> {
        let bind = lifetime.get_cache_bind(cache).await?;

        Ok(Self {
            value,
            _lifetime: lifetime,
            _bind: bind,
        })
    }

    fn to_envelope(&self) -> Result<CacheEnvelope, Error> {
        let value = serde_json::to_value(&self.value)
            .map_err(|e| CacheError::new(format!("Failed to serialize value: {e}")))?;

        Ok(CacheEnvelope {
            value,
            lifetime: self._lifetime.to_owned(),
            bind: self._bind.to_owned(),
        })
    }

    fn from_envelope(envelope: CacheEnvelope) -> Result<Self, Error> {
        let value = serde_json::from_value(envelope.value)
            .map_err(|e| CacheError::new(format!("Failed to deserialize value: {e}")))?;

        Ok(Self {
            value,
            _lifetime: envelope.lifetime,
            _bind: envelope.bind,
        })
    }

    async fn validate<K: ToString + Serialize>(
        &self,
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
    ) -> Result<bool, Error> {
        self._lifetime
            .validate_cache_bind(&self._bind, key.into(), cache)
            .await
    }

    async fn lookup<K>(
        key: &CacheKey<K>,
        cache: &mut MultiplexedConnection,
    ) -> Result<Option<RedisValue<T>>, Error>
    where
        K: ToString + Serialize + Clone + Send + Sync,
    {
        let value = get_cache_value::<String, CacheEnvelope>(key.into(), cache)
            .await
            .and_then(|envelope| envelope.map(Self::from_envelope).transpose())
            .unwrap_or_else(|_| {
                let mut c = cache.clone();
                let k = key.to_string();
                tokio::spawn(async move {
                    log::error!("> Failed to deserialize cached value. Deleting {}", &k);
                    if let Err(e) = delete_cache_value(k, &mut c).await {
                        log::error!("> Failed to delete cached value! {e}");
                    }
                });
                None
            });
        // * Cannot use .map(|| {...}) due to async closures
        match value {
            Some(value) => {
                log::trace!("> Found {key}");
                match value.validate(key.to_owned(), cache).await? {
                    true => Ok(Some(value)),
                    false => {
                        log::trace!("> Invalidated {key}");
                        Ok(None)
                    }
                }
            }
            None => Ok(None),
        }
    }

    async fn store<K>(
        key: &CacheKey<K>,
        value: T,
        cache: &mut MultiplexedConnection,
    ) -> Result<RedisValue<T>, Error>
    where
        K: ToString + Serialize + Clone + Send + Sync,
    {
        let lifetime: CacheLifetime = key.to_owned().into();
        let value = RedisValue::new(value, lifetime, cache).await?;

        match value.to_envelope() {
            Ok(envelope) => {
                if let Err(e) =
                    set_cache_value::<String, CacheEnvelope>(key.into(), envelope, cache).await
                {
                    log::error!("{e:?}");
                }
            }
            Err(e) => log::error!("{e:?}"),
        }

        Ok(value)
    }

    pub async fn get_or_optional<'a, F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<Option<RedisValue<T>>, Error>
    where
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>, Error>> + Send + 'a,
    {
        if let Some(value) = Self::lookup(&key, cache).await? {
            return Ok(Some(value));
        }

        log::trace!("> Fetching {key}");
        match callback().await? {
            Some(value) => Ok(Some(Self::store(&key, value, cache).await?)),
            None => Ok(None),
        }
    }

    pub async fn get_or<'a, F, Fut, K>(
        key: CacheKey<K>,
        cache: &mut MultiplexedConnection,
        callback: F,
    ) -> Result<RedisValue<T>, Error>
    where
        K: ToString + Serialize + Clone + Send + Sync,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'a,
    {
        if let Some(value) = Self::lookup(&key, cache).await? {
            return Ok(value);
        }

        log::trace!("> Fetching {key}");
        let value = callback().await?;
        Self::store(&key, value, cache).await
    }
}

/// Marks every cached tag and ingredient listing stale. Called after any catalog write.
pub async fn invalidate_catalog_cache(cache: &mut MultiplexedConnection) -> Result<(), Error> {
    CacheLifetime::BindCatalogCache.invalidate(cache).await
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache.set(key, value).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), Error> {
    let _: () = cache.del(key).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, Error> {
    let value: Option<V> = cache.get(key).await.map_err(CacheError::from)?;

    Ok(value)
}
