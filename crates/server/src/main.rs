#[tokio::main]
async fn main() {
    if let Err(e) = lib_server::init().await {
        eprintln!("❌ Server failed: {e}");
        std::process::exit(1);
    }
}
