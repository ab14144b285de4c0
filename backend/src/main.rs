use std::net::SocketAddr;

use tracing::{info, Level};

mod backend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; the log bridge also captures `log` macro records
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let app_state = backend::initialize_backend().await?;
    let app = backend::create_router(app_state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
