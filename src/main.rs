use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

mod models;
mod services;
mod state;
mod api;
mod cli;
mod metrics;

use state::new_state;
use api::{get_metrics, not_found};
use cli::CommandArgs;
use services::SupervisorClient;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandArgs::parse();
    let bind_address = args.bind_address();
    let timeout = Duration::from_secs(args.timeout);

    let client = SupervisorClient::new(args.supervisord_url.clone(), timeout)
        .context("Failed to build supervisord XML-RPC client")?;
    let state = new_state(Arc::new(client), timeout);

    print_banner(&args, &bind_address);
    log::info!("Listening on {}", bind_address);

    let metrics_path = args.metrics_path.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .route(&metrics_path, web::get().to(get_metrics))
            .default_service(web::to(not_found))
    })
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run()
        .await
        .context("HTTP server terminated with an error")?;

    log::info!("Server stopped");
    Ok(())
}

fn print_banner(args: &CommandArgs, bind_address: &str) {
    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║      Supervisord Exporter v{:<31}║", env!("CARGO_PKG_VERSION"));
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();
    println!("🚀 Server starting on http://{}", bind_address);
    println!("🔗 Polling supervisord at {} (timeout {}s)", args.supervisord_url, args.timeout);
    println!();
    println!("📋 Available endpoints:");
    println!("  GET    {:<24}- Prometheus metrics", args.metrics_path);
    println!("═══════════════════════════════════════════════════════════");
}
