//! Role resolution for scheduling commands.
//!
//! The acting side of a negotiation is fixed per session and resolved
//! through a chain:
//!
//! 1. `--as <role>` on the command line
//! 2. `RIGCAL_ROLE` env var
//! 3. `role` in `~/.rigcal/config.toml`

use std::env;

use crate::{config::Config, model::Role};

/// Error message shown when the role cannot be resolved.
pub const ROLE_REQUIRED: &str = "role required: pass --as <owner|authority>, \
    set RIGCAL_ROLE, or add `role = \"...\"` to ~/.rigcal/config.toml";

pub fn resolve_role(explicit: Option<Role>, config: &Config) -> Result<Role, String> {
    let from_env = env::var("RIGCAL_ROLE").ok();
    resolve(explicit, from_env.as_deref(), config.role)
}

fn resolve(
    explicit: Option<Role>,
    from_env: Option<&str>,
    configured: Option<Role>,
) -> Result<Role, String> {
    if let Some(role) = explicit {
        return Ok(role);
    }
    if let Some(value) = from_env
        && !value.trim().is_empty()
    {
        return value.parse().map_err(|e| format!("RIGCAL_ROLE: {e}"));
    }
    configured.ok_or_else(|| ROLE_REQUIRED.to_string())
}
