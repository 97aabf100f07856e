mod app;
mod config;
mod flap;
mod logging;
mod model;
mod net;
mod paging;
mod runtime;
mod storage;
mod translate;
mod ui;
mod viewport;
mod window;

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc;
use std::time::Instant;

use app::App;
use config::parse_args;
use logging::{init as init_logging, restore_panic_output, route_panics_to_log};
use net::{spawn_refresher, ProxyClient};
use runtime::{init_terminal, initial_viewport, restore_terminal, run_app};
use storage::load_airports;
use tracing::{debug, error, info, warn};
use translate::Translator;

fn main() -> Result<()> {
    let config = parse_args()?;
    let _log_guard = init_logging(&config);
    info!("fids-tui starting");
    debug!("config path: {}", config.config_path.display());

    // The table is complete before the first cycle can translate anything.
    let airports = match load_airports(Path::new(&config.airports_file)) {
        Ok(table) => table,
        Err(err) => {
            warn!("{err:#}; airport names will be shown upper-cased");
            HashMap::new()
        }
    };
    let translator = Translator::new(airports);
    info!("loaded {} airport translations", translator.airport_count());

    let client = ProxyClient::new(&config.proxy_url, config.request_timeout).map_err(|err| {
        error!("{err:#}");
        err
    })?;

    let (tx, rx) = mpsc::channel();
    let (command_tx, command_rx) = mpsc::channel();
    let _refresher = spawn_refresher(
        client,
        translator,
        config.fetch_settings(),
        config.refresh,
        tx,
        command_rx,
    );

    let viewport = initial_viewport(config.cell_px)?;
    route_panics_to_log();
    let mut terminal = init_terminal()?;
    let app = App::new(&config, viewport.rows_per_page(), Instant::now());
    info!(
        "viewport {}x{}px, {} rows per page",
        viewport.width,
        viewport.height,
        app.rows_per_page
    );

    let res = run_app(&mut terminal, app, rx, command_tx, config.cell_px);
    restore_terminal(&mut terminal)?;
    restore_panic_output();

    if let Err(err) = res {
        warn!("runtime error: {err}");
        eprintln!("{err}");
    }

    info!("fids-tui exited");
    Ok(())
}
