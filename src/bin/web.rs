//! Single binary web server for court rotation: JSON API behind a login cookie.
//! Run with: cargo run --bin court-rotation
//! Listens on 0.0.0.0:8080 by default. See `court_rotation::config` for the
//! environment variables (HOST, PORT, COURT_COUNT, ACCESS_USERNAME, ...).

use actix_web::{cookie::Key, web::Data, App, HttpServer};
use court_rotation::persistence::{JsonFileStore, StoreSync};
use court_rotation::web::{configure, session_middleware};
use court_rotation::{AllocationEngine, AppConfig};
use std::sync::RwLock;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env();
    let mut engine = AllocationEngine::new(config.court_count);
    let mut mirror = None;
    if let Some(path) = &config.mirror_file {
        let (sync, handle) = StoreSync::spawn(JsonFileStore::new(path.clone()));
        log::info!("Mirroring session to {}", path.display());
        engine = engine.with_sync(sync);
        mirror = Some(handle);
    }

    let bind = (config.host.clone(), config.port);
    log::info!(
        "Starting server at http://{}:{} with {} court(s)",
        bind.0,
        bind.1,
        config.court_count
    );

    let state = Data::new(RwLock::new(engine));
    let app_state = state.clone();
    let config = Data::new(config);
    // Sessions do not survive a restart.
    let key = Key::generate();

    let served = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(config.clone())
            .wrap(session_middleware(&config, key.clone()))
            .configure(configure)
    })
    .bind(bind)?
    .run()
    .await;

    if let Some(handle) = mirror {
        // Closing the channel lets the mirror write out whatever is still queued.
        match state.write() {
            Ok(mut engine) => drop(engine.take_sync()),
            Err(_) => {
                log::warn!("Engine lock poisoned; pending mirror batches may be lost");
                return served;
            }
        }
        match handle.join() {
            Ok(store) => log::info!("Mirror flushed to {} on shutdown", store.path().display()),
            Err(_) => log::warn!("Mirror thread panicked; pending batches lost"),
        }
    }
    served
}
