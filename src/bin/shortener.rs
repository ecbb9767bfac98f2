use shortbox::shortener::{build_router, AppState};
use shortbox::utils::logger;
use shortbox::ServiceSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logger::init_service_logger();

    let settings = ServiceSettings::from_env()?;
    let port = settings.api_port;
    let public = format!("{}://{}", settings.protocol, settings.service_domain);

    let state = AppState::from_settings(settings)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(
        "Server started on {} (listening on {})",
        public,
        listener.local_addr()?
    );
    axum::serve(listener, app).await?;
    Ok(())
}
