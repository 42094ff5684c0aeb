//! Local enforcement of command permissions.

use herald_core::{BoxError, Handler, InvokeContext};

/// The administrator permission bit, which satisfies every requirement.
pub const ADMINISTRATOR: u64 = 1 << 3;

/// A check mirroring the remote's own permission rules for a command: in a
/// guild the member must hold every bit of `default_member_permissions`
/// (or be an administrator); outside a guild `dm_permission` decides.
#[derive(Debug, Clone, Copy)]
pub struct PermissionEnforcer {
    pub default_member_permissions: Option<u64>,
    pub dm_permission: bool,
}

impl Handler<InvokeContext> for PermissionEnforcer {
    type Output = Result<bool, BoxError>;

    async fn call(&self, ctx: InvokeContext) -> Result<bool, BoxError> {
        let Some(ctx) = ctx.as_interaction() else {
            return Ok(true);
        };
        if ctx.guild_id.is_none() {
            return Ok(self.dm_permission);
        }
        let Some(required) = self.default_member_permissions else {
            return Ok(true);
        };
        let held = ctx.member_permissions.unwrap_or(0);
        Ok(held & ADMINISTRATOR != 0 || held & required == required)
    }
}
