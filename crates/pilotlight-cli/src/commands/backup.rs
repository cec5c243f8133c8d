use pilotlight_backup::{BackupManager, BackupRequest};
use pilotlight_state::BackupKind;

use crate::context::Context;

pub async fn run(ctx: &Context, table: Option<&str>, incremental: bool) -> anyhow::Result<()> {
    // Backups read from whichever region currently serves traffic.
    let state = ctx.controller().status().await?;
    let manager = BackupManager::new(
        ctx.replica(&state.active_region),
        ctx.artifacts.clone(),
        ctx.config.tables.clone(),
    );

    let request = BackupRequest {
        table_name: table.map(str::to_string),
        backup_type: if incremental {
            BackupKind::Incremental
        } else {
            BackupKind::Full
        },
    };
    let responses = manager.handle(&request).await?;
    println!("{}", serde_json::to_string_pretty(&responses)?);
    Ok(())
}
