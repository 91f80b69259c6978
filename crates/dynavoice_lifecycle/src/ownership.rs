//! Lock, unlock and ownership transitions of secondaries.
//!
//! Every operation runs inside the secondary's critical section, the same
//! one the controller uses for renames and deletes.

use crate::LifecycleController;
use dynavoice_core::{ChannelId, MemberId, Secondary, SecondaryPatch};
use dynavoice_error::{LifecycleError, LifecycleResult};
use dynavoice_interface::{OverrideSubject, PermissionOverride, SecondaryStore};
use tracing::{info, instrument};

/// Applies and reverts connect overrides and mutates ownership metadata.
#[derive(Debug, Clone)]
pub struct OwnershipManager {
    controller: LifecycleController,
}

impl OwnershipManager {
    /// Create a manager sharing the controller's locks and registry.
    pub fn new(controller: LifecycleController) -> Self {
        Self { controller }
    }

    /// Restrict connections to the members currently present.
    ///
    /// Every occupant gets an explicit connect allow, then the guild's default
    /// role is denied. A member joining between the snapshot and the deny is
    /// not allowlisted.
    #[instrument(skip(self))]
    pub async fn lock(&self, id: ChannelId) -> LifecycleResult<Secondary> {
        let ctl = &self.controller;
        let _guard = ctl.locks().lock(id).await;
        let secondary = self.known(id)?;
        let platform = ctl.platform();

        let snapshot = ctl.snapshot(id).await?;
        for occupant in &snapshot.members {
            let subject = OverrideSubject::Member(*occupant.id());
            ctl.call("set_permission_override", || {
                platform.set_permission_override(id, subject, PermissionOverride::connect(true))
            })
            .await
            .inspect_err(|e| ctl.note_failure(id, "lock", e))?;
        }
        let everyone = OverrideSubject::Role(secondary.guild_id.everyone_role());
        ctl.call("set_permission_override", || {
            platform.set_permission_override(id, everyone, PermissionOverride::connect(false))
        })
        .await
        .inspect_err(|e| ctl.note_failure(id, "lock", e))?;

        let updated = self
            .persist(id, SecondaryPatch::default().with_locked(true))
            .await?;
        info!(%id, allowed = snapshot.members.len(), "Secondary locked");
        ctl.request_rename(id);
        Ok(updated)
    }

    /// Drop every channel-specific override and mark the secondary unlocked.
    #[instrument(skip(self))]
    pub async fn unlock(&self, id: ChannelId) -> LifecycleResult<Secondary> {
        let ctl = &self.controller;
        let _guard = ctl.locks().lock(id).await;
        self.known(id)?;
        let platform = ctl.platform();

        ctl.call("clear_permission_overrides", || {
            platform.clear_permission_overrides(id)
        })
        .await
        .inspect_err(|e| ctl.note_failure(id, "unlock", e))?;

        let updated = self
            .persist(id, SecondaryPatch::default().with_locked(false))
            .await?;
        info!(%id, "Secondary unlocked");
        ctl.request_rename(id);
        Ok(updated)
    }

    /// Hand the secondary to another member. Only the owner changes; the
    /// name is left alone until the next membership-driven rename.
    #[instrument(skip(self))]
    pub async fn transfer_ownership(
        &self,
        id: ChannelId,
        new_owner: MemberId,
    ) -> LifecycleResult<Secondary> {
        let _guard = self.controller.locks().lock(id).await;
        self.known(id)?;
        let updated = self
            .persist(id, SecondaryPatch::default().with_creator_id(new_owner))
            .await?;
        info!(%id, %new_owner, "Ownership transferred");
        Ok(updated)
    }

    /// Grant one member a connect allow, e.g. after an approved join request.
    #[instrument(skip(self))]
    pub async fn allow_member(&self, id: ChannelId, member: MemberId) -> LifecycleResult<()> {
        let ctl = &self.controller;
        let _guard = ctl.locks().lock(id).await;
        self.known(id)?;
        let platform = ctl.platform();
        ctl.call("set_permission_override", || {
            platform.set_permission_override(
                id,
                OverrideSubject::Member(member),
                PermissionOverride::connect(true),
            )
        })
        .await?;
        info!(%id, %member, "Member allowed");
        Ok(())
    }

    /// Set or clear the name override and schedule a rename.
    #[instrument(skip(self))]
    pub async fn set_name_override(
        &self,
        id: ChannelId,
        name: Option<String>,
    ) -> LifecycleResult<Secondary> {
        let _guard = self.controller.locks().lock(id).await;
        self.known(id)?;
        let updated = self
            .persist(id, SecondaryPatch::default().with_name_override(name))
            .await?;
        self.controller.request_rename(id);
        Ok(updated)
    }

    fn known(&self, id: ChannelId) -> LifecycleResult<Secondary> {
        self.controller
            .registry()
            .secondary(id)
            .ok_or_else(|| LifecycleError::not_found(format!("secondary {id}")))
    }

    async fn persist(&self, id: ChannelId, patch: SecondaryPatch) -> LifecycleResult<Secondary> {
        let ctl = &self.controller;
        let store = ctl.store();
        let updated = ctl
            .call("update_secondary", || store.update_secondary(id, &patch))
            .await
            .inspect_err(|e| ctl.note_failure(id, "update_secondary", e))?;
        ctl.registry().replace(updated.clone());
        Ok(updated)
    }
}
