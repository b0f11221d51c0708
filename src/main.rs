#[tokio::main]
async fn main() {
    if let Err(e) = reqgen::run().await {
        tracing::error!("[Startup] {}", e);
        eprintln!("reqgen: {}", e);
        std::process::exit(1);
    }
}
