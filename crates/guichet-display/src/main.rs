use clap::Parser;

mod action;
mod announce;
mod api;
mod app;
mod cli;
mod config;
mod diff;
mod errors;
mod logging;
mod models;
mod poll;
mod tui;
mod ui;
mod ws;

#[cfg(test)]
mod fixtures;

use app::App;
use cli::Cli;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    errors::init()?;
    logging::init()?;

    let args = Cli::parse();
    let config = config::Config::new()?;
    let tenant = config::resolve_tenant(args.tenant.as_deref(), &config, &config::get_data_dir());

    let mut app = App::new(
        args.tick_rate,
        args.frame_rate,
        &args.server,
        &tenant,
        &args.display,
        config,
    )?;
    app.run().await?;
    Ok(())
}
