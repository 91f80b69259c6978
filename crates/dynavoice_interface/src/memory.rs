//! In-memory implementation of every store trait.
//!
//! Data lives in HashMaps behind a tokio RwLock and is lost when the store
//! is dropped. Useful for unit tests and for running the controller without a
//! database.

use crate::{AliasStore, GuildSettingsStore, PrimaryStore, SecondaryStore};
use async_trait::async_trait;
use dynavoice_core::{
    Alias, ChannelId, GuildId, GuildSettings, Primary, PrimaryPatch, Secondary, SecondaryPatch,
};
use dynavoice_error::{LifecycleError, LifecycleErrorKind, LifecycleResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    primaries: HashMap<ChannelId, Primary>,
    secondaries: HashMap<ChannelId, Secondary>,
    aliases: HashMap<(GuildId, String), Alias>,
    settings: HashMap<GuildId, GuildSettings>,
}

/// In-memory store.
///
/// # Example
/// ```
/// use dynavoice_core::{ChannelId, GuildId};
/// use dynavoice_interface::{InMemoryStore, SecondaryStore};
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = InMemoryStore::new();
/// let count = store.count_by_parent(ChannelId(1), GuildId(1)).await.unwrap();
/// assert_eq!(count, 0);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    fail_secondary_writes: Arc<AtomicBool>,
    fail_settings_reads: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every secondary write fail with a persistence error until reset.
    pub fn fail_secondary_writes(&self, fail: bool) {
        self.fail_secondary_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every settings read time out until reset.
    pub fn fail_settings_reads(&self, fail: bool) {
        self.fail_settings_reads.store(fail, Ordering::SeqCst);
    }

    /// Store guild settings verbatim.
    pub async fn put_settings(&self, settings: GuildSettings) {
        self.tables
            .write()
            .await
            .settings
            .insert(settings.guild_id, settings);
    }

    fn check_secondary_write(&self) -> LifecycleResult<()> {
        if self.fail_secondary_writes.load(Ordering::SeqCst) {
            return Err(LifecycleError::new(LifecycleErrorKind::Persistence(
                "secondary writes disabled".to_string(),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PrimaryStore for InMemoryStore {
    async fn get_primary(&self, id: ChannelId) -> LifecycleResult<Option<Primary>> {
        Ok(self.tables.read().await.primaries.get(&id).cloned())
    }

    async fn list_primaries_by_guild(&self, guild: GuildId) -> LifecycleResult<Vec<Primary>> {
        let tables = self.tables.read().await;
        let mut primaries: Vec<_> = tables
            .primaries
            .values()
            .filter(|p| p.guild_id == guild)
            .cloned()
            .collect();
        primaries.sort_by_key(|p| p.id);
        Ok(primaries)
    }

    async fn list_primaries(&self) -> LifecycleResult<Vec<Primary>> {
        let mut primaries: Vec<_> = self.tables.read().await.primaries.values().cloned().collect();
        primaries.sort_by_key(|p| p.id);
        Ok(primaries)
    }

    async fn create_primary(&self, primary: &Primary) -> LifecycleResult<Primary> {
        let mut tables = self.tables.write().await;
        if tables.primaries.contains_key(&primary.id) {
            return Err(LifecycleError::new(LifecycleErrorKind::Conflict(format!(
                "primary {} already exists",
                primary.id
            ))));
        }
        tables.primaries.insert(primary.id, primary.clone());
        Ok(primary.clone())
    }

    async fn update_primary(
        &self,
        id: ChannelId,
        patch: &PrimaryPatch,
    ) -> LifecycleResult<Primary> {
        let mut tables = self.tables.write().await;
        let primary = tables
            .primaries
            .get_mut(&id)
            .ok_or_else(|| LifecycleError::not_found(format!("primary {id}")))?;
        patch.apply(primary);
        Ok(primary.clone())
    }
}

#[async_trait]
impl SecondaryStore for InMemoryStore {
    async fn create_secondary(&self, secondary: &Secondary) -> LifecycleResult<Secondary> {
        self.check_secondary_write()?;
        let mut tables = self.tables.write().await;
        if !tables.primaries.contains_key(&secondary.parent_id) {
            return Err(LifecycleError::not_found(format!(
                "primary {}",
                secondary.parent_id
            )));
        }
        if tables.secondaries.contains_key(&secondary.id) {
            return Err(LifecycleError::new(LifecycleErrorKind::Conflict(format!(
                "secondary {} already exists",
                secondary.id
            ))));
        }
        tables.secondaries.insert(secondary.id, secondary.clone());
        Ok(secondary.clone())
    }

    async fn get_secondary(&self, id: ChannelId) -> LifecycleResult<Option<Secondary>> {
        Ok(self.tables.read().await.secondaries.get(&id).cloned())
    }

    async fn list_secondaries(&self) -> LifecycleResult<Vec<Secondary>> {
        let mut secondaries: Vec<_> = self
            .tables
            .read()
            .await
            .secondaries
            .values()
            .cloned()
            .collect();
        secondaries.sort_by_key(|s| s.id);
        Ok(secondaries)
    }

    async fn update_secondary(
        &self,
        id: ChannelId,
        patch: &SecondaryPatch,
    ) -> LifecycleResult<Secondary> {
        self.check_secondary_write()?;
        let mut tables = self.tables.write().await;
        let secondary = tables
            .secondaries
            .get_mut(&id)
            .ok_or_else(|| LifecycleError::not_found(format!("secondary {id}")))?;
        patch.apply(secondary);
        Ok(secondary.clone())
    }

    async fn delete_secondary(&self, id: ChannelId) -> LifecycleResult<()> {
        self.check_secondary_write()?;
        self.tables
            .write()
            .await
            .secondaries
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| LifecycleError::not_found(format!("secondary {id}")))
    }

    async fn count_by_parent(&self, parent: ChannelId, guild: GuildId) -> LifecycleResult<usize> {
        Ok(self
            .tables
            .read()
            .await
            .secondaries
            .values()
            .filter(|s| s.parent_id == parent && s.guild_id == guild)
            .count())
    }
}

#[async_trait]
impl AliasStore for InMemoryStore {
    async fn list_aliases(&self, guild: GuildId) -> LifecycleResult<Vec<Alias>> {
        let tables = self.tables.read().await;
        let mut aliases: Vec<_> = tables
            .aliases
            .values()
            .filter(|a| a.guild_id == guild)
            .cloned()
            .collect();
        aliases.sort_by(|a, b| a.activity_name.cmp(&b.activity_name));
        Ok(aliases)
    }

    async fn upsert_alias(&self, alias: &Alias) -> LifecycleResult<Alias> {
        self.tables
            .write()
            .await
            .aliases
            .insert((alias.guild_id, alias.activity_name.clone()), alias.clone());
        Ok(alias.clone())
    }

    async fn delete_alias(&self, guild: GuildId, activity: &str) -> LifecycleResult<()> {
        self.tables
            .write()
            .await
            .aliases
            .remove(&(guild, activity.to_string()))
            .map(|_| ())
            .ok_or_else(|| LifecycleError::not_found(format!("alias {activity}")))
    }
}

#[async_trait]
impl GuildSettingsStore for InMemoryStore {
    async fn get_settings(&self, guild: GuildId) -> LifecycleResult<GuildSettings> {
        if self.fail_settings_reads.load(Ordering::SeqCst) {
            return Err(LifecycleError::new(LifecycleErrorKind::Timeout(
                "settings read".to_string(),
            )));
        }
        Ok(self
            .tables
            .read()
            .await
            .settings
            .get(&guild)
            .copied()
            .unwrap_or_else(|| GuildSettings::defaults_for(guild)))
    }

    async fn set_allow_join_requests(
        &self,
        guild: GuildId,
        enabled: bool,
    ) -> LifecycleResult<GuildSettings> {
        let mut tables = self.tables.write().await;
        let settings = tables
            .settings
            .entry(guild)
            .or_insert_with(|| GuildSettings::defaults_for(guild));
        settings.allow_join_requests = enabled;
        Ok(*settings)
    }

    async fn set_text_channels_enabled(
        &self,
        guild: GuildId,
        enabled: bool,
    ) -> LifecycleResult<GuildSettings> {
        let mut tables = self.tables.write().await;
        let settings = tables
            .settings
            .entry(guild)
            .or_insert_with(|| GuildSettings::defaults_for(guild));
        settings.text_channels_enabled = enabled;
        Ok(*settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynavoice_core::{MemberId, PrimaryBuilder, SecondaryBuilder};

    fn primary(id: u64) -> Primary {
        PrimaryBuilder::default()
            .id(ChannelId(id))
            .guild_id(GuildId(1))
            .creator_id(MemberId(1))
            .build()
            .unwrap()
    }

    fn secondary(id: u64, parent: u64) -> Secondary {
        SecondaryBuilder::default()
            .id(ChannelId(id))
            .guild_id(GuildId(1))
            .parent_id(ChannelId(parent))
            .creator_id(MemberId(2))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_secondary_requires_existing_primary() {
        let store = InMemoryStore::new();
        let err = store.create_secondary(&secondary(10, 1)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_missing_secondary_is_not_found() {
        let store = InMemoryStore::new();
        store.create_primary(&primary(1)).await.unwrap();
        store.create_secondary(&secondary(10, 1)).await.unwrap();

        store.delete_secondary(ChannelId(10)).await.unwrap();
        let err = store.delete_secondary(ChannelId(10)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_count_by_parent() {
        let store = InMemoryStore::new();
        store.create_primary(&primary(1)).await.unwrap();
        store.create_primary(&primary(2)).await.unwrap();
        store.create_secondary(&secondary(10, 1)).await.unwrap();
        store.create_secondary(&secondary(11, 1)).await.unwrap();
        store.create_secondary(&secondary(12, 2)).await.unwrap();

        assert_eq!(store.count_by_parent(ChannelId(1), GuildId(1)).await.unwrap(), 2);
        assert_eq!(store.count_by_parent(ChannelId(2), GuildId(1)).await.unwrap(), 1);
        assert_eq!(store.count_by_parent(ChannelId(1), GuildId(9)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_alias_is_unique_per_guild_and_activity() {
        let store = InMemoryStore::new();
        store
            .upsert_alias(&Alias::new(GuildId(1), "Chess".into(), "Board".into()))
            .await
            .unwrap();
        store
            .upsert_alias(&Alias::new(GuildId(1), "Chess".into(), "Board Games".into()))
            .await
            .unwrap();

        let aliases = store.list_aliases(GuildId(1)).await.unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].alias_text, "Board Games");
    }

    #[tokio::test]
    async fn test_settings_default_when_missing() {
        let store = InMemoryStore::new();
        let settings = store.get_settings(GuildId(5)).await.unwrap();
        assert!(!settings.allow_join_requests);

        store.set_allow_join_requests(GuildId(5), true).await.unwrap();
        assert!(store.get_settings(GuildId(5)).await.unwrap().allow_join_requests);
    }
}
