use envlaw_assistant::handlers::app_router;
use envlaw_assistant::init::app_init;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("🚀 Starting environmental-law assistant relay...");
    let (config, state) = app_init().await?;
    let app = app_router(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("");
    log::info!("🎉 Server started!");
    log::info!("📍 http://{}", addr);
    log::info!("📡 Chat: http://{}/api/chat", addr);
    log::info!("❤️  Health: http://{}/health", addr);
    log::info!("🤖 Model: {} @ {}", config.llm.model, config.llm.base_url);
    match &config.retrieval {
        Some(retrieval) => log::info!(
            "📚 Retrieval: {} (timeout {:?})",
            retrieval.url,
            retrieval.timeout
        ),
        None => log::info!("📚 Retrieval: disabled"),
    }
    log::info!("⏱️  Upstream idle timeout: {:?}", config.idle_timeout);
    log::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
