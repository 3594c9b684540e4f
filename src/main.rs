use anyhow::{Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;
use tracing::info;

use swcache::{
    application::{
        build_registration, handle_config_change, initialize_logger, shutdown_application,
        start_initial_servers,
    },
    cli::Cli,
    config::Settings,
    utils::start_config_watcher,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings = Settings::new(&args.config).with_context(|| "init config failed")?;
    let _guard = initialize_logger(&settings)?;

    let registration = build_registration(&settings).await?;
    let handles = start_initial_servers(&settings, registration.clone()).await?;

    // 启动配置文件监听
    let runtime = tokio::runtime::Handle::current();
    let handles_clone = handles.clone();
    let stop_tx = start_config_watcher(&args.config, move |result| {
        runtime.spawn(handle_config_change(
            result,
            registration.clone(),
            handles_clone.clone(),
        ));
    })
    .with_context(|| "watch config failed")?;

    info!("Server started");

    tokio::signal::ctrl_c().await?;
    shutdown_application(handles, stop_tx).await;

    Ok(())
}
