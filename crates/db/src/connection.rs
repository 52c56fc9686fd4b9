use std::time::Duration;

use mongodb::{Client, Database, options::ClientOptions};
use tracing::info;
use worknest_config::DatabaseSettings;

/// Opens a client for `settings`, pings the deployment and returns the
/// configured database handle.
pub async fn connect(settings: &DatabaseSettings) -> Result<Database, mongodb::error::Error> {
    let mut client_options = ClientOptions::parse(&settings.url).await?;
    client_options.app_name = Some("worknest".to_string());

    if let Some(max_pool) = settings.max_pool_size {
        client_options.max_pool_size = Some(max_pool);
    }
    if let Some(min_pool) = settings.min_pool_size {
        client_options.min_pool_size = Some(min_pool);
    }
    if let Some(secs) = settings.server_selection_timeout_secs {
        client_options.server_selection_timeout = Some(Duration::from_secs(secs));
    }

    let client = Client::with_options(client_options)?;

    client
        .database("admin")
        .run_command(bson::doc! { "ping": 1 })
        .await?;

    info!(db = %settings.name, "Connected to MongoDB");

    Ok(client.database(&settings.name))
}
