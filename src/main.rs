#[tokio::main]
async fn main() {
    std::process::exit(phiscan::app::startup::startup().await);
}
