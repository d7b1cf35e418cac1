use tracing::error;

use videotube::config::{load_config, print_schema};
use videotube::startup;
use videotube::utils::logger::init_logging;

#[tokio::main]
async fn main() {
    if std::env::args().any(|arg| arg == "--config-schema") {
        print_schema();
        return;
    }

    let config = load_config();
    init_logging(&config.logging);

    if let Err(e) = startup::run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
