use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tire_booking::cli::{self, Commands, WorkshopCommands};
use tire_booking::config::{self, Config};
use tire_booking::registry::Registry;
use tire_booking::store::sqlite::SqliteStore;
use tire_booking::{api, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    // OTLP export only when a collector endpoint is configured
    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "tirebook"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "tire_booking=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(Commands::Migrate) => {
            let db = SqliteStore::connect(&cfg.database_url).await?;
            db.migrate().await?;
            println!("Migrations applied.");
            Ok(())
        }
        Some(Commands::Workshop { command }) => {
            let db = SqliteStore::connect(&cfg.database_url).await?;
            db.migrate().await?;
            handle_workshop_command(&db, &cfg, command).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = SqliteStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let state = Arc::new(AppState::new(db, cfg)?);
    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("tirebook listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_workshop_command(
    db: &SqliteStore,
    cfg: &Config,
    cmd: WorkshopCommands,
) -> anyhow::Result<()> {
    let registry = Registry::new(cfg);
    let mut uow = db.begin().await?;

    match cmd {
        WorkshopCommands::List { all } => {
            let workshops = registry.list(&mut uow, !all).await?;
            if workshops.is_empty() {
                println!("No workshops found.");
            } else {
                println!("{:<6} {:<28} {:<16} {:<10} {:<8}", "ID", "NAME", "CITY", "FORMAT", "ACTIVE");
                for w in workshops {
                    println!(
                        "{:<6} {:<28} {:<16} {:<10} {:<8}",
                        w.id_workshop, w.name, w.city, w.response_type, w.is_active
                    );
                }
            }
        }
        WorkshopCommands::Toggle { id } => {
            let is_active = registry.toggle_active(&mut uow, id).await?;
            println!(
                "Workshop {} is now {}.",
                id,
                if is_active { "active" } else { "inactive" }
            );
        }
        add @ WorkshopCommands::Add { .. } => {
            let fields = add
                .into_fields()
                .ok_or_else(|| anyhow::anyhow!("expected workshop fields"))?;
            let workshop = registry.create(&mut uow, fields).await?;
            println!(
                "Workshop created:\n  ID:   {}\n  Name: {}",
                workshop.id_workshop, workshop.name
            );
        }
    }

    uow.commit().await?;
    Ok(())
}
