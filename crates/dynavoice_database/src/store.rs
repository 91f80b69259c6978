//! Store trait implementations backed by PostgreSQL.

use crate::schema::{aliases, guilds, primaries, secondaries};
use crate::{
    AliasRow, DatabaseResult, GuildRow, NewAliasRow, PgPool, PrimaryRow, SecondaryRow,
    UpdatePrimaryRow, UpdateSecondaryRow,
};
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use dynavoice_core::{
    Alias, ChannelId, GuildId, GuildSettings, Primary, PrimaryPatch, Secondary, SecondaryPatch,
};
use dynavoice_error::{DatabaseError, DatabaseErrorKind, LifecycleError, LifecycleErrorKind, LifecycleResult};
use dynavoice_interface::{AliasStore, GuildSettingsStore, PrimaryStore, SecondaryStore};
use tracing::{debug, instrument};

/// PostgreSQL implementation of the Dynavoice stores.
///
/// Diesel is synchronous, so every query runs on the blocking thread pool
/// with a connection checked out of the pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

impl PgStore {
    /// Create a store over a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> LifecycleResult<T>
    where
        F: FnOnce(&mut PgConnection) -> DatabaseResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| DatabaseError::new(DatabaseErrorKind::Connection(e.to_string())))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            LifecycleError::new(LifecycleErrorKind::Persistence(format!(
                "database task failed: {e}"
            )))
        })?
        .map_err(LifecycleError::from)
    }
}

fn missing(what: String) -> DatabaseError {
    debug!(what, "No row matched");
    DatabaseError::new(DatabaseErrorKind::NotFound)
}

#[async_trait]
impl PrimaryStore for PgStore {
    async fn get_primary(&self, id: ChannelId) -> LifecycleResult<Option<Primary>> {
        self.run(move |conn| {
            primaries::table
                .find(id.to_db())
                .select(PrimaryRow::as_select())
                .first(conn)
                .optional()
                .map(|row| row.map(Primary::from))
                .map_err(Into::into)
        })
        .await
    }

    async fn list_primaries_by_guild(&self, guild: GuildId) -> LifecycleResult<Vec<Primary>> {
        self.run(move |conn| {
            primaries::table
                .filter(primaries::guild_id.eq(guild.to_db()))
                .order(primaries::id)
                .select(PrimaryRow::as_select())
                .load(conn)
                .map(|rows| rows.into_iter().map(Primary::from).collect())
                .map_err(Into::into)
        })
        .await
    }

    async fn list_primaries(&self) -> LifecycleResult<Vec<Primary>> {
        self.run(move |conn| {
            primaries::table
                .order(primaries::id)
                .select(PrimaryRow::as_select())
                .load(conn)
                .map(|rows| rows.into_iter().map(Primary::from).collect())
                .map_err(Into::into)
        })
        .await
    }

    #[instrument(skip(self, primary), fields(primary = %primary.id))]
    async fn create_primary(&self, primary: &Primary) -> LifecycleResult<Primary> {
        let row = PrimaryRow::from(primary);
        self.run(move |conn| {
            diesel::insert_into(primaries::table)
                .values(&row)
                .returning(PrimaryRow::as_returning())
                .get_result(conn)
                .map(Primary::from)
                .map_err(Into::into)
        })
        .await
    }

    #[instrument(skip(self, patch))]
    async fn update_primary(
        &self,
        id: ChannelId,
        patch: &PrimaryPatch,
    ) -> LifecycleResult<Primary> {
        let changes = UpdatePrimaryRow::from(patch);
        self.run(move |conn| {
            let target = primaries::table.find(id.to_db());
            let row = if changes.is_empty() {
                target.select(PrimaryRow::as_select()).first(conn)
            } else {
                diesel::update(target)
                    .set(&changes)
                    .returning(PrimaryRow::as_returning())
                    .get_result(conn)
            };
            row.optional()?
                .map(Primary::from)
                .ok_or_else(|| missing(format!("primary {id}")))
        })
        .await
    }
}

#[async_trait]
impl SecondaryStore for PgStore {
    #[instrument(skip(self, secondary), fields(secondary = %secondary.id))]
    async fn create_secondary(&self, secondary: &Secondary) -> LifecycleResult<Secondary> {
        let row = SecondaryRow::from(secondary);
        self.run(move |conn| {
            diesel::insert_into(secondaries::table)
                .values(&row)
                .returning(SecondaryRow::as_returning())
                .get_result(conn)
                .map(Secondary::from)
                .map_err(Into::into)
        })
        .await
    }

    async fn get_secondary(&self, id: ChannelId) -> LifecycleResult<Option<Secondary>> {
        self.run(move |conn| {
            secondaries::table
                .find(id.to_db())
                .select(SecondaryRow::as_select())
                .first(conn)
                .optional()
                .map(|row| row.map(Secondary::from))
                .map_err(Into::into)
        })
        .await
    }

    async fn list_secondaries(&self) -> LifecycleResult<Vec<Secondary>> {
        self.run(move |conn| {
            secondaries::table
                .order(secondaries::id)
                .select(SecondaryRow::as_select())
                .load(conn)
                .map(|rows| rows.into_iter().map(Secondary::from).collect())
                .map_err(Into::into)
        })
        .await
    }

    #[instrument(skip(self, patch))]
    async fn update_secondary(
        &self,
        id: ChannelId,
        patch: &SecondaryPatch,
    ) -> LifecycleResult<Secondary> {
        let changes = UpdateSecondaryRow::from(patch);
        self.run(move |conn| {
            let target = secondaries::table.find(id.to_db());
            let row = if changes.is_empty() {
                target.select(SecondaryRow::as_select()).first(conn)
            } else {
                diesel::update(target)
                    .set(&changes)
                    .returning(SecondaryRow::as_returning())
                    .get_result(conn)
            };
            row.optional()?
                .map(Secondary::from)
                .ok_or_else(|| missing(format!("secondary {id}")))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_secondary(&self, id: ChannelId) -> LifecycleResult<()> {
        self.run(move |conn| {
            let deleted =
                diesel::delete(secondaries::table.find(id.to_db())).execute(conn)?;
            if deleted == 0 {
                return Err(missing(format!("secondary {id}")));
            }
            Ok(())
        })
        .await
    }

    async fn count_by_parent(&self, parent: ChannelId, guild: GuildId) -> LifecycleResult<usize> {
        self.run(move |conn| {
            secondaries::table
                .filter(secondaries::parent_id.eq(parent.to_db()))
                .filter(secondaries::guild_id.eq(guild.to_db()))
                .count()
                .get_result::<i64>(conn)
                .map(|n| n as usize)
                .map_err(Into::into)
        })
        .await
    }
}

#[async_trait]
impl AliasStore for PgStore {
    async fn list_aliases(&self, guild: GuildId) -> LifecycleResult<Vec<Alias>> {
        self.run(move |conn| {
            aliases::table
                .filter(aliases::guild_id.eq(guild.to_db()))
                .order(aliases::activity_name)
                .select(AliasRow::as_select())
                .load(conn)
                .map(|rows| rows.into_iter().map(Alias::from).collect())
                .map_err(Into::into)
        })
        .await
    }

    #[instrument(skip(self, alias), fields(activity = %alias.activity_name))]
    async fn upsert_alias(&self, alias: &Alias) -> LifecycleResult<Alias> {
        let row = NewAliasRow::from(alias);
        self.run(move |conn| {
            diesel::insert_into(aliases::table)
                .values(&row)
                .on_conflict((aliases::guild_id, aliases::activity_name))
                .do_update()
                .set(aliases::alias_text.eq(excluded(aliases::alias_text)))
                .returning(AliasRow::as_returning())
                .get_result(conn)
                .map(Alias::from)
                .map_err(Into::into)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_alias(&self, guild: GuildId, activity: &str) -> LifecycleResult<()> {
        let activity = activity.to_string();
        self.run(move |conn| {
            let deleted = diesel::delete(
                aliases::table
                    .filter(aliases::guild_id.eq(guild.to_db()))
                    .filter(aliases::activity_name.eq(&activity)),
            )
            .execute(conn)?;
            if deleted == 0 {
                return Err(missing(format!("alias {activity}")));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl GuildSettingsStore for PgStore {
    async fn get_settings(&self, guild: GuildId) -> LifecycleResult<GuildSettings> {
        self.run(move |conn| {
            guilds::table
                .find(guild.to_db())
                .select(GuildRow::as_select())
                .first(conn)
                .optional()
                .map(|row| {
                    row.map(GuildSettings::from)
                        .unwrap_or_else(|| GuildSettings::defaults_for(guild))
                })
                .map_err(Into::into)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn set_allow_join_requests(
        &self,
        guild: GuildId,
        enabled: bool,
    ) -> LifecycleResult<GuildSettings> {
        let row = GuildRow::from(&GuildSettings {
            allow_join_requests: enabled,
            ..GuildSettings::defaults_for(guild)
        });
        self.run(move |conn| {
            diesel::insert_into(guilds::table)
                .values(&row)
                .on_conflict(guilds::id)
                .do_update()
                .set(guilds::allow_join_requests.eq(enabled))
                .returning(GuildRow::as_returning())
                .get_result(conn)
                .map(GuildSettings::from)
                .map_err(Into::into)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn set_text_channels_enabled(
        &self,
        guild: GuildId,
        enabled: bool,
    ) -> LifecycleResult<GuildSettings> {
        let row = GuildRow::from(&GuildSettings {
            text_channels_enabled: enabled,
            ..GuildSettings::defaults_for(guild)
        });
        self.run(move |conn| {
            diesel::insert_into(guilds::table)
                .values(&row)
                .on_conflict(guilds::id)
                .do_update()
                .set(guilds::text_channels_enabled.eq(enabled))
                .returning(GuildRow::as_returning())
                .get_result(conn)
                .map(GuildSettings::from)
                .map_err(Into::into)
        })
        .await
    }
}
