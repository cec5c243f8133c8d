use pilotlight_failover::Directive;

use crate::context::Context;

pub async fn evaluate(ctx: &Context) -> anyhow::Result<()> {
    let response = ctx.controller().evaluate().await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

pub async fn failover(ctx: &Context, target: &str, force: bool) -> anyhow::Result<()> {
    execute(ctx, Directive::failover(target, force)).await
}

pub async fn failback(ctx: &Context, target: &str, force: bool) -> anyhow::Result<()> {
    execute(ctx, Directive::failback(target, force)).await
}

async fn execute(ctx: &Context, directive: Directive) -> anyhow::Result<()> {
    let response = ctx.controller().execute(&directive).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
