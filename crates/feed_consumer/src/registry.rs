use crate::error::{FeedError, FeedResult};
use feed_entities::{
    FeedEntity, FixtureMetadataUpdate, HeartbeatUpdate, KeepAliveUpdate, LivescoreUpdate,
    MarketUpdate, OutrightFixtureMarketUpdate, OutrightFixtureUpdate, OutrightLeagueMarketUpdate,
    OutrightLeagueUpdate, OutrightScoreUpdate, OutrightSettlementsUpdate, SettlementUpdate,
};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Identity of one registered entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    key: i32,
    name: &'static str,
    type_id: TypeId,
}

impl EntityDescriptor {
    pub fn of<T: FeedEntity>() -> Self {
        Self {
            key: T::ENTITY_KEY,
            name: T::NAME,
            type_id: TypeId::of::<T>(),
        }
    }

    pub fn key(&self) -> i32 {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

/// Maps `Header.Type` values to entity kinds.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    by_key: HashMap<i32, EntityDescriptor>,
}

impl EntityRegistry {
    pub fn builder() -> EntityRegistryBuilder {
        EntityRegistryBuilder::default()
    }

    /// Registry over every entity kind in `feed_entities`
    pub fn standard() -> FeedResult<Arc<EntityRegistry>> {
        static STANDARD: OnceLock<Arc<EntityRegistry>> = OnceLock::new();

        if let Some(registry) = STANDARD.get() {
            return Ok(registry.clone());
        }

        let registry = Arc::new(
            Self::builder()
                .register::<FixtureMetadataUpdate>()?
                .register::<LivescoreUpdate>()?
                .register::<MarketUpdate>()?
                .register::<KeepAliveUpdate>()?
                .register::<HeartbeatUpdate>()?
                .register::<SettlementUpdate>()?
                .register::<OutrightFixtureUpdate>()?
                .register::<OutrightScoreUpdate>()?
                .register::<OutrightFixtureMarketUpdate>()?
                .register::<OutrightLeagueUpdate>()?
                .register::<OutrightLeagueMarketUpdate>()?
                .register::<OutrightSettlementsUpdate>()?
                .build(),
        );

        Ok(STANDARD.get_or_init(|| registry).clone())
    }

    /// Descriptor for an entity key; `None` when the key is not registered
    pub fn resolve(&self, key: i32) -> Option<&EntityDescriptor> {
        self.by_key.get(&key)
    }

    pub fn contains<T: FeedEntity>(&self) -> bool {
        self.contains_type(TypeId::of::<T>())
    }

    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.by_key.values().any(|d| d.type_id == type_id)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// All descriptors, ordered by key
    pub fn descriptors(&self) -> Vec<&EntityDescriptor> {
        let mut descriptors: Vec<_> = self.by_key.values().collect();
        descriptors.sort_by_key(|d| d.key);
        descriptors
    }
}

#[derive(Debug, Default)]
pub struct EntityRegistryBuilder {
    by_key: HashMap<i32, EntityDescriptor>,
}

impl EntityRegistryBuilder {
    pub fn register<T: FeedEntity>(mut self) -> FeedResult<Self> {
        let descriptor = EntityDescriptor::of::<T>();

        if let Some(existing) = self.by_key.get(&descriptor.key) {
            return Err(FeedError::DuplicateEntityKey {
                key: descriptor.key,
                existing: existing.name,
                duplicate: descriptor.name,
            });
        }

        self.by_key.insert(descriptor.key, descriptor);
        Ok(self)
    }

    pub fn build(self) -> EntityRegistry {
        EntityRegistry {
            by_key: self.by_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_entities::keys;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct ImpostorMarket {}

    impl FeedEntity for ImpostorMarket {
        const ENTITY_KEY: i32 = keys::MARKET;
        const NAME: &'static str = "ImpostorMarket";
    }

    #[test]
    fn test_resolve_registered_key() {
        let registry = EntityRegistry::builder()
            .register::<MarketUpdate>()
            .unwrap()
            .build();

        let descriptor = registry.resolve(keys::MARKET).unwrap();
        assert_eq!(descriptor.name(), "MarketUpdate");
        assert_eq!(descriptor.type_id(), TypeId::of::<MarketUpdate>());
        assert!(registry.contains::<MarketUpdate>());
        assert!(!registry.contains::<LivescoreUpdate>());
    }

    #[test]
    fn test_unknown_key_is_none() {
        let registry = EntityRegistry::builder().build();
        assert!(registry.resolve(999).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let result = EntityRegistry::builder()
            .register::<MarketUpdate>()
            .unwrap()
            .register::<ImpostorMarket>();

        match result {
            Err(FeedError::DuplicateEntityKey {
                key,
                existing,
                duplicate,
            }) => {
                assert_eq!(key, keys::MARKET);
                assert_eq!(existing, "MarketUpdate");
                assert_eq!(duplicate, "ImpostorMarket");
            }
            other => panic!("expected duplicate key error, got {:?}", other),
        }
    }

    #[test]
    fn test_standard_registry_covers_all_entities() {
        let registry = EntityRegistry::standard().unwrap();

        assert_eq!(registry.len(), 12);
        let keys: Vec<i32> = registry.descriptors().iter().map(|d| d.key()).collect();
        assert_eq!(keys, vec![1, 2, 3, 31, 32, 35, 37, 38, 39, 40, 41, 42]);
        assert_eq!(
            registry.resolve(keys::KEEP_ALIVE).map(|d| d.name()),
            Some("KeepAliveUpdate")
        );
    }

    #[test]
    fn test_standard_registry_is_shared() {
        let a = EntityRegistry::standard().unwrap();
        let b = EntityRegistry::standard().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
