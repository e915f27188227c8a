use clap::Parser;

use grader::config::CliArgs;
use grader::web_server::build_server;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = CliArgs::parse();
    let config = cli.to_config().expect("Failed to load configuration");

    if cli.flush_log {
        let path = &config.grading.failure_log;
        if let Err(e) = std::fs::remove_file(path) {
            log::warn!("Unable to remove failure log at {}: {e}", path.display());
        } else {
            log::info!("Removed failure log at {}", path.display());
        }
    }

    if !config.grading.tests_dir.is_dir() {
        log::warn!(
            "Fixed test suite not found at {}; submissions will be rejected until it is deployed",
            config.grading.tests_dir.display()
        );
    }

    std::fs::create_dir_all(&config.grading.submissions_dir)
        .expect("Failed to create submissions directory");

    // ======= PREPARATION END, EXECUTION START =======

    let server = build_server(config).expect("Failed to build server");
    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Ctrl-c received, shutting down...");
        }
        res_server = server_task => {
            log::error!("Server terminated unexpectedly: {res_server:?}");
        }
    }

    server_handle.stop(true).await;
    log::info!("Shutdown complete");
    Ok(())
}
