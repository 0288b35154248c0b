use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;

use meal_scanner::{Config, ImageInput, Recognizer};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables first so RUST_LOG from .env applies
    dotenv().ok();

    // Initialize logger
    env_logger::init();

    log::info!("🚀 Starting Meal Scanner...");

    let config = Config::from_env()?;
    let recognizer = Arc::new(Recognizer::from_config(&config)?);
    log::info!(
        "✅ Recognizer initialized (model: {}, fallback policy: {}, nutrition: {:?})",
        recognizer.model().unwrap_or("<none>"),
        recognizer.policy(),
        config.nutrition_strategy
    );

    // One-shot mode: meal-scanner <image-path>
    if let Some(image_path) = std::env::args().nth(1) {
        let bytes = std::fs::read(&image_path)
            .with_context(|| format!("Failed to read image file {}", image_path))?;
        log::debug!("📊 Image file size: {} bytes", bytes.len());

        let result = recognizer.recognize(ImageInput::from(bytes)).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    serve(recognizer, &config).await
}

#[cfg(feature = "http-server")]
async fn serve(recognizer: Arc<Recognizer>, config: &Config) -> Result<()> {
    use meal_scanner::api::server::create_router;

    let app = create_router(recognizer);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    log::info!("🌐 HTTP server listening on {}", config.bind_addr);
    log::info!("📸 POST images to http://{}/analyze_food", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("❌ Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    log::info!("🛑 Shutting down...");
    Ok(())
}

#[cfg(not(feature = "http-server"))]
async fn serve(_recognizer: Arc<Recognizer>, _config: &Config) -> Result<()> {
    anyhow::bail!("Usage: meal-scanner <image-path> (build with the http-server feature to serve HTTP)")
}
