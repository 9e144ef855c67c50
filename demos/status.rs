use std::env;

use htcc::TccClient;

#[tokio::main]
async fn main() -> htcc::Result<()> {
    tracing_subscriber::fmt::init();

    let (Ok(email), Ok(password)) = (env::var("HTCC_EMAIL"), env::var("HTCC_PASS")) else {
        println!("Warning: HTCC_EMAIL and HTCC_PASS were not set!");
        return Ok(());
    };

    let mut client = TccClient::builder(email, password).build();
    client.authenticate().await?;

    for mut zone in client.get_all_zones().await? {
        let name = zone.name()?.to_string();
        let temp = zone.get_current_temperature().await?;
        let mode = zone.get_system_mode().await?;
        let heat = zone.get_heat_setpoint().await?;
        let cool = zone.get_cool_setpoint().await?;
        println!("[{name}] {temp} | mode: {mode:?} | heat: {heat} | cool: {cool}");
    }

    Ok(())
}
