use pilotlight_health::HealthRequest;

use crate::context::Context;

pub async fn run(ctx: &Context, region: Option<&str>) -> anyhow::Result<()> {
    let request = HealthRequest {
        region: region.map(str::to_string),
    };
    let response = ctx.monitor().handle(&request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
