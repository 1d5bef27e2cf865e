//! One-time startup work: seeding the initial admin.

use tracing::info;

use rolodex_core::auth::{AuthError, queries};

use crate::AppState;
use crate::error::AppResult;

/// Insert the configured initial admin, once per process.
///
/// The cell stays empty on failure so a later request retries; a transient
/// database error at boot does not permanently skip seeding.
pub async fn ensure_seed_admin(state: &AppState) -> AppResult<()> {
    let Some(email) = state.config.initial_admin_email.as_deref() else {
        return Ok(());
    };
    state
        .bootstrap
        .get_or_try_init(|| async {
            let inserted = queries::seed_admin(&state.pool, email).await?;
            if inserted {
                info!(email = %email.to_lowercase(), "seeded initial admin");
            }
            Ok::<(), AuthError>(())
        })
        .await?;
    Ok(())
}
