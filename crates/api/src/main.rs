#[tokio::main]
async fn main() -> anyhow::Result<()> {
    idealab_observability::init();

    let config = idealab_api::config::Config::from_env();
    let app = idealab_api::app::build_app(&config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to build application: {e}"))?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
