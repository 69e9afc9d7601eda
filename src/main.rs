//! Town Hall Presence server binary.
//!
//! Configuration comes from `TOWNHALL__*` environment variables (see
//! [`townhall_presence::config`]).

use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use townhall_presence::adapters::auth::JwksIdentityVerifier;
use townhall_presence::adapters::storage::InMemoryModeratorDirectory;
use townhall_presence::app::{router, Services, StartupError, Storage};
use townhall_presence::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let storage = Storage::from_config(config.database.as_ref()).await?;
    let verifier = Arc::new(JwksIdentityVerifier::new(config.auth.jwks_config())?);
    let moderators = Arc::new(InMemoryModeratorDirectory::with_global_moderators(
        config.auth.moderator_ids(),
    ));

    let services = Services::build(verifier, storage, moderators, &config.breakout);
    let app = router(services.live.clone(), &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Town hall presence listening");

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
