use chrono::DateTime;
use pilotlight_state::FailoverState;

use crate::context::Context;

pub async fn init(ctx: &Context) -> anyhow::Result<()> {
    let state = ctx
        .control
        .init_failover_state(&ctx.config.primary_region)
        .await?;
    print_state(&state)
}

pub async fn status(ctx: &Context) -> anyhow::Result<()> {
    let state = ctx.controller().status().await?;
    print_state(&state)
}

fn print_state(state: &FailoverState) -> anyhow::Result<()> {
    let rendered = serde_json::json!({
        "currentState": state.current_state,
        "activeRegion": state.active_region,
        "lastTransitionAt": DateTime::from_timestamp(state.last_transition_at as i64, 0)
            .map(|t| t.to_rfc3339()),
        "version": state.version,
        "unhealthyStreak": state.unhealthy_streak,
    });
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}
