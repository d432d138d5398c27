use std::io;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use labrxiv::application::{BallotUseCase, FreshStreamUseCase, IngestUseCase, ShortlistUseCase};
use labrxiv::domain::error::AppError;
use labrxiv::infrastructure::biorxiv::{BiorxivClient, PreprintSource};
use labrxiv::infrastructure::config::Settings;
use labrxiv::infrastructure::db::connect_store;
use labrxiv::interfaces::http::{start_server, AppState};

fn to_io_err(err: AppError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load().map_err(to_io_err)?;
    let store = connect_store(&settings.storage).await.map_err(to_io_err)?;
    info!(backend = ?settings.storage.backend, "Store ready");

    let source: Arc<dyn PreprintSource> = Arc::new(BiorxivClient::new());

    let state = AppState {
        ingest: IngestUseCase::new(source, store.clone(), settings.ingest.clone()),
        ballot: BallotUseCase::new(store.clone(), settings.roster()),
        shortlist: ShortlistUseCase::new(store.clone()),
        fresh_stream: FreshStreamUseCase::new(store.clone(), settings.ingest.window_days),
        members: settings.members.clone(),
    };

    let server = start_server(state, &settings.server.host, settings.server.port)?;
    info!(
        host = %settings.server.host,
        port = settings.server.port,
        "Listening"
    );

    server.await
}
