use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info};

use bonded_inventory::{
    config::Config,
    create_router,
    database::{create_database_pool, ensure_schema},
    store::PgStore,
    AppState,
};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let db = create_database_pool(&config.database_url).await?;
    if config.bootstrap_schema {
        ensure_schema(&db).await?;
    }

    let addr = config.bind_address();
    let prefix = config.service_name.clone();
    let state = AppState::new(Arc::new(PgStore::new(db)), config);
    let app = create_router(state);

    info!("bonded inventory listening on http://{}/{}", addr, prefix);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
