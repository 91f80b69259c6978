//! Typed command execution.
//!
//! Commands arrive already parsed; registration and argument completion
//! belong to the platform adapter. Owner-only commands act on the secondary
//! the invoker is connected to.

use crate::{JoinDecision, JoinRequests, JoinTicket, LifecycleController, OwnershipManager, PendingJoin};
use dynavoice_core::{
    Alias, ChannelId, GuildId, GuildSettings, MemberId, Primary, PrimaryBuilder, PrimaryPatch,
    Secondary, validate_template,
};
use dynavoice_error::{LifecycleError, LifecycleErrorKind, LifecycleResult};
use dynavoice_interface::{AliasStore, GuildSettingsStore, PrimaryStore};
use tracing::{debug, info, instrument};

/// Who issued a command and from where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invoker {
    /// Issuing member
    pub member_id: MemberId,
    /// Guild the command was issued in
    pub guild_id: GuildId,
    /// Voice channel the member is connected to
    pub voice_channel: Option<ChannelId>,
    /// Whether the member may manage the guild
    pub is_admin: bool,
}

/// Which primary template `set-template` replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TemplateKind {
    /// Used when no activity is detected
    General,
    /// Used when an activity is detected
    Activity,
}

/// Subject of an `info` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoTarget {
    /// A primary channel
    Primary(ChannelId),
    /// A secondary channel
    Secondary(ChannelId),
    /// The invoker's guild
    Guild,
}

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq, strum::AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Command {
    /// Restrict the invoker's secondary to its current members
    Lock,
    /// Lift the restriction
    Unlock,
    /// Hand the invoker's secondary to another member
    TransferOwner(MemberId),
    /// Set or clear the invoker's secondary name override
    SetName(Option<String>),
    /// Replace a primary's template
    SetTemplate {
        /// Primary to update
        primary: ChannelId,
        /// Template to replace
        kind: TemplateKind,
        /// New template
        template: String,
    },
    /// Map an activity to display text
    AliasAdd {
        /// Activity label as reported by the platform
        activity: String,
        /// Text shown instead
        alias: String,
    },
    /// Remove an alias
    AliasRemove(String),
    /// List the guild's aliases
    AliasList,
    /// Describe a channel or the guild
    Info(InfoTarget),
    /// Ask the owner of a locked secondary to be let in
    JoinRequest(ChannelId),
    /// Answer a join request
    JoinRespond {
        /// Request being answered
        request_id: u64,
        /// The answer
        decision: JoinDecision,
    },
    /// Toggle join requests for the guild
    AllowJoinRequests(bool),
    /// Toggle paired text channels for the guild
    TextChannels(bool),
    /// Register an existing voice channel as a primary
    CreatePrimary {
        /// Voice channel to register
        channel: ChannelId,
        /// General template; the default when absent
        general_name: Option<String>,
        /// Activity template; the default when absent
        activity_template: Option<String>,
    },
}

impl Command {
    /// Command name as typed by members.
    pub fn name(&self) -> &str {
        self.as_ref()
    }
}

/// Read-only view returned by `info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoView {
    /// A primary and its live secondaries
    Primary {
        /// The primary
        primary: Primary,
        /// Secondaries spawned from it
        secondaries: Vec<Secondary>,
    },
    /// A secondary
    Secondary(Secondary),
    /// Guild configuration
    Guild {
        /// Guild flags
        settings: GuildSettings,
        /// Configured primaries
        primaries: Vec<Primary>,
        /// Configured aliases
        aliases: Vec<Alias>,
    },
}

/// Result of a command.
#[derive(Debug)]
pub enum CommandOutcome {
    /// A secondary was changed
    Secondary(Secondary),
    /// A primary was created or changed
    Primary(Primary),
    /// An alias was stored
    Alias(Alias),
    /// An alias was removed
    AliasRemoved,
    /// The guild's aliases
    Aliases(Vec<Alias>),
    /// Requested view
    Info(InfoView),
    /// A join request is waiting for the owner
    JoinRequested(PendingJoin),
    /// A join request was answered
    JoinAnswered(JoinTicket),
    /// Guild flags after a toggle
    Settings(GuildSettings),
}

/// Executes commands against the controller.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    controller: LifecycleController,
    ownership: OwnershipManager,
    join_requests: JoinRequests,
}

impl CommandDispatcher {
    /// Create a dispatcher sharing the controller's state.
    pub fn new(controller: LifecycleController) -> Self {
        Self {
            ownership: OwnershipManager::new(controller.clone()),
            join_requests: JoinRequests::new(controller.clone()),
            controller,
        }
    }

    /// Join request table, for awaiting outcomes of `join-request`.
    pub fn join_requests(&self) -> &JoinRequests {
        &self.join_requests
    }

    /// Execute a command.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` when the invoker lacks the required role or does
    /// not own the secondary, `Validation` for malformed input, and any
    /// collaborator failure.
    #[instrument(skip(self, invoker, command), fields(command = command.name(), member = %invoker.member_id))]
    pub async fn execute(
        &self,
        invoker: &Invoker,
        command: Command,
    ) -> LifecycleResult<CommandOutcome> {
        debug!("Executing command");
        match command {
            Command::Lock => {
                let id = self.owned_secondary(invoker)?;
                Ok(CommandOutcome::Secondary(self.ownership.lock(id).await?))
            }
            Command::Unlock => {
                let id = self.owned_secondary(invoker)?;
                Ok(CommandOutcome::Secondary(self.ownership.unlock(id).await?))
            }
            Command::TransferOwner(new_owner) => {
                let id = self.owned_secondary(invoker)?;
                Ok(CommandOutcome::Secondary(
                    self.ownership.transfer_ownership(id, new_owner).await?,
                ))
            }
            Command::SetName(name) => {
                let id = self.owned_secondary(invoker)?;
                let name = name.map(|n| n.trim().to_string());
                if let Some(name) = &name {
                    validate_template(name).map_err(|v| LifecycleError::validation(v.to_string()))?;
                }
                Ok(CommandOutcome::Secondary(
                    self.ownership.set_name_override(id, name).await?,
                ))
            }
            Command::SetTemplate {
                primary,
                kind,
                template,
            } => {
                require_admin(invoker)?;
                self.set_template(invoker.guild_id, primary, kind, template)
                    .await
                    .map(CommandOutcome::Primary)
            }
            Command::AliasAdd { activity, alias } => {
                require_admin(invoker)?;
                let activity = activity.trim();
                let alias = alias.trim();
                if activity.is_empty() || alias.is_empty() {
                    return Err(LifecycleError::validation(
                        "activity and alias must not be empty",
                    ));
                }
                let store = self.controller.store();
                let row = Alias::new(invoker.guild_id, activity.to_string(), alias.to_string());
                let stored = self
                    .controller
                    .call("upsert_alias", || store.upsert_alias(&row))
                    .await?;
                self.rename_guild(invoker.guild_id);
                Ok(CommandOutcome::Alias(stored))
            }
            Command::AliasRemove(activity) => {
                require_admin(invoker)?;
                let store = self.controller.store();
                let guild = invoker.guild_id;
                self.controller
                    .call("delete_alias", || store.delete_alias(guild, &activity))
                    .await?;
                self.rename_guild(guild);
                Ok(CommandOutcome::AliasRemoved)
            }
            Command::AliasList => {
                require_admin(invoker)?;
                let store = self.controller.store();
                let guild = invoker.guild_id;
                let aliases = self
                    .controller
                    .call("list_aliases", || store.list_aliases(guild))
                    .await?;
                Ok(CommandOutcome::Aliases(aliases))
            }
            Command::Info(target) => self.info(invoker, target).await.map(CommandOutcome::Info),
            Command::JoinRequest(secondary) => {
                let pending = self
                    .join_requests
                    .request(invoker.guild_id, invoker.member_id, secondary)
                    .await?;
                Ok(CommandOutcome::JoinRequested(pending))
            }
            Command::JoinRespond {
                request_id,
                decision,
            } => {
                let ticket = self
                    .join_requests
                    .respond(request_id, invoker.member_id, decision)?;
                Ok(CommandOutcome::JoinAnswered(ticket))
            }
            Command::AllowJoinRequests(enabled) => {
                require_admin(invoker)?;
                let store = self.controller.store();
                let guild = invoker.guild_id;
                let settings = self
                    .controller
                    .call("set_allow_join_requests", || {
                        store.set_allow_join_requests(guild, enabled)
                    })
                    .await?;
                Ok(CommandOutcome::Settings(settings))
            }
            Command::TextChannels(enabled) => {
                require_admin(invoker)?;
                let store = self.controller.store();
                let guild = invoker.guild_id;
                let settings = self
                    .controller
                    .call("set_text_channels_enabled", || {
                        store.set_text_channels_enabled(guild, enabled)
                    })
                    .await?;
                Ok(CommandOutcome::Settings(settings))
            }
            Command::CreatePrimary {
                channel,
                general_name,
                activity_template,
            } => {
                require_admin(invoker)?;
                self.create_primary(invoker, channel, general_name, activity_template)
                    .await
                    .map(CommandOutcome::Primary)
            }
        }
    }

    /// The secondary the invoker is connected to, if they own it.
    fn owned_secondary(&self, invoker: &Invoker) -> LifecycleResult<ChannelId> {
        let secondary = invoker
            .voice_channel
            .and_then(|id| self.controller.registry().secondary(id))
            .ok_or_else(|| {
                LifecycleError::validation("you must be connected to a dynamic voice channel")
            })?;
        if secondary.creator_id != invoker.member_id {
            return Err(LifecycleError::new(LifecycleErrorKind::PermissionDenied(
                format!("{} does not own {}", invoker.member_id, secondary.id),
            )));
        }
        Ok(secondary.id)
    }

    async fn set_template(
        &self,
        guild: GuildId,
        primary: ChannelId,
        kind: TemplateKind,
        template: String,
    ) -> LifecycleResult<Primary> {
        validate_template(&template).map_err(|v| LifecycleError::validation(v.to_string()))?;
        self.guild_primary(guild, primary)?;

        let patch = match kind {
            TemplateKind::General => PrimaryPatch::default().with_general_name(template),
            TemplateKind::Activity => PrimaryPatch::default().with_activity_template(template),
        };
        let store = self.controller.store();
        let updated = self
            .controller
            .call("update_primary", || store.update_primary(primary, &patch))
            .await?;
        self.controller.registry().upsert_primary(updated.clone());

        let secondaries = self.controller.registry().secondaries_of(primary);
        for secondary in &secondaries {
            self.controller.request_rename(secondary.id);
        }
        info!(%primary, %kind, renamed = secondaries.len(), "Template updated");
        Ok(updated)
    }

    async fn create_primary(
        &self,
        invoker: &Invoker,
        channel: ChannelId,
        general_name: Option<String>,
        activity_template: Option<String>,
    ) -> LifecycleResult<Primary> {
        let registry = self.controller.registry();
        if registry.primary(channel).is_some() || registry.is_secondary(channel) {
            return Err(LifecycleError::new(LifecycleErrorKind::Conflict(format!(
                "{channel} is already managed"
            ))));
        }

        let mut builder = PrimaryBuilder::default();
        builder
            .id(channel)
            .guild_id(invoker.guild_id)
            .creator_id(invoker.member_id);
        if let Some(general) = general_name {
            validate_template(&general).map_err(|v| LifecycleError::validation(v.to_string()))?;
            builder.general_name(general);
        }
        if let Some(template) = activity_template {
            validate_template(&template).map_err(|v| LifecycleError::validation(v.to_string()))?;
            builder.activity_template(template);
        }
        let primary = builder
            .build()
            .map_err(|e| LifecycleError::validation(e.to_string()))?;

        // must be an existing voice channel
        self.controller.snapshot(channel).await?;

        let store = self.controller.store();
        let stored = self
            .controller
            .call("create_primary", || store.create_primary(&primary))
            .await?;
        registry.upsert_primary(stored.clone());
        info!(%channel, "Primary registered");
        Ok(stored)
    }

    async fn info(&self, invoker: &Invoker, target: InfoTarget) -> LifecycleResult<InfoView> {
        let registry = self.controller.registry();
        match target {
            InfoTarget::Primary(id) => {
                let primary = self.guild_primary(invoker.guild_id, id)?;
                Ok(InfoView::Primary {
                    secondaries: registry.secondaries_of(id),
                    primary,
                })
            }
            InfoTarget::Secondary(id) => registry
                .secondary(id)
                .filter(|s| s.guild_id == invoker.guild_id)
                .map(InfoView::Secondary)
                .ok_or_else(|| LifecycleError::not_found(format!("secondary {id}"))),
            InfoTarget::Guild => {
                let store = self.controller.store();
                let guild = invoker.guild_id;
                let settings = self
                    .controller
                    .call("get_settings", || store.get_settings(guild))
                    .await?;
                let primaries = self
                    .controller
                    .call("list_primaries_by_guild", || {
                        store.list_primaries_by_guild(guild)
                    })
                    .await?;
                let aliases = self
                    .controller
                    .call("list_aliases", || store.list_aliases(guild))
                    .await?;
                Ok(InfoView::Guild {
                    settings,
                    primaries,
                    aliases,
                })
            }
        }
    }

    fn guild_primary(&self, guild: GuildId, id: ChannelId) -> LifecycleResult<Primary> {
        self.controller
            .registry()
            .primary(id)
            .filter(|p| p.guild_id == guild)
            .ok_or_else(|| LifecycleError::not_found(format!("primary {id}")))
    }

    /// Aliases changed; every secondary of the guild may need a new name.
    fn rename_guild(&self, guild: GuildId) {
        let registry = self.controller.registry();
        for id in registry.secondary_ids() {
            if registry.secondary(id).is_some_and(|s| s.guild_id == guild) {
                self.controller.request_rename(id);
            }
        }
    }
}

fn require_admin(invoker: &Invoker) -> LifecycleResult<()> {
    if invoker.is_admin {
        Ok(())
    } else {
        Err(LifecycleError::new(LifecycleErrorKind::PermissionDenied(
            "this command requires the Manage Server permission".to_string(),
        )))
    }
}
