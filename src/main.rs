use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use ecochain_client::actor::{ActorHandle, HttpActorFactory};
use ecochain_client::cli::{self, Command, Invocation, StdinPrompt};
use ecochain_client::config::{ClientConfig, LOGIN_MAX_TIME_TO_LIVE};
use ecochain_client::identity::{KeyfileProvider, LoginOptions};
use ecochain_client::session::{JsonFilePersistence, SessionStore};
use ecochain_client::SessionBootstrap;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("building log filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "ecochain".to_string());
    let rest: Vec<String> = args.collect();
    let invocation = match Invocation::parse(&rest) {
        Ok(Some(inv)) => inv,
        Ok(None) => {
            cli::print_usage(&program);
            return Ok(());
        }
        Err(e) => {
            cli::print_usage(&program);
            return Err(e);
        }
    };

    let mut config = ClientConfig::from_env().context("reading ECOCHAIN_* configuration")?;
    invocation.apply(&mut config)?;
    info!(
        target: "ecochain",
        "ecochain starting: mode={:?}, host={}, canister={}, state_dir='{}'",
        config.mode,
        config.host,
        config.canister_id.as_deref().unwrap_or("<unset>"),
        config.state_dir.display()
    );

    let provider = KeyfileProvider::create(config.identity_path(), Arc::new(StdinPrompt))
        .await
        .context("opening identity provider")?;
    let factory = HttpActorFactory::new(&config).context("configuring backend actor")?;
    let store = SessionStore::restore(Arc::new(JsonFilePersistence::new(config.session_path())));
    let login_options = LoginOptions {
        identity_provider_url: config.identity_provider.clone(),
        max_time_to_live: LOGIN_MAX_TIME_TO_LIVE,
    };
    let boot = SessionBootstrap::new(
        Arc::new(provider),
        ActorHandle::new(Arc::new(factory)),
        Arc::new(store),
        login_options,
    );

    let resolution = boot.bootstrap_on_start().await;
    debug!(target: "ecochain", "startup resolution: {:?}", resolution);

    cli::run(invocation.command.unwrap_or(Command::Status), &boot).await
}
