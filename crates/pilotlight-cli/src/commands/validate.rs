use pilotlight_validate::{ValidationAction, ValidationRequest, ValidationType};

use crate::context::Context;

pub async fn run(ctx: &Context, table: Option<&str>, full: bool, sync: bool) -> anyhow::Result<()> {
    // Read from the active region, check against the other one.
    let state = ctx.controller().status().await?;
    let validator = ctx.validator(&state.active_region);

    let request = ValidationRequest {
        validation_type: if full {
            ValidationType::Full
        } else {
            ValidationType::Incremental
        },
        table_name: table.map(str::to_string),
        action: if sync {
            ValidationAction::Sync
        } else {
            ValidationAction::Report
        },
    };
    let response = validator.handle(&request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
