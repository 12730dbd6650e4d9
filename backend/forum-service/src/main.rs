use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use db_pool::{create_pool, DbConfig};
use forum_service::handlers;
use forum_service::migration::{MigrateOpts, MigrationPipeline};
use forum_service::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct HealthState {
    db_pool: sqlx::Pool<sqlx::Postgres>,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize)]
struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    checks: HashMap<String, ComponentCheck>,
    timestamp: String,
}

impl HealthState {
    async fn check_postgres(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.db_pool)
            .await
            .map(|_| ())
    }
}

async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match state.check_postgres().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "forum-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "forum-service"
        })),
    }
}

async fn readiness_summary(state: web::Data<HealthState>) -> HttpResponse {
    let mut checks = HashMap::new();

    let start = Instant::now();
    let pg_result = state.check_postgres().await;
    let pg_latency = Some(start.elapsed().as_millis() as u64);
    let ready = pg_result.is_ok();
    let postgres_check = match pg_result {
        Ok(_) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "PostgreSQL connection successful".to_string(),
            latency_ms: pg_latency,
        },
        Err(e) => ComponentCheck {
            status: ComponentStatus::Unhealthy,
            message: format!("PostgreSQL connection failed: {}", e),
            latency_ms: pg_latency,
        },
    };
    checks.insert("postgresql".to_string(), postgres_check);

    let response = ReadinessResponse {
        ready,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config() -> Config {
    match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run the legacy transfer. Flags select streams; no flags runs all four
/// in order: users, posts, votes, subscriptions.
async fn run_migrate(args: Vec<String>) -> io::Result<()> {
    init_tracing();
    dotenv::dotenv().ok();
    let config = load_config();

    let mut opts = MigrateOpts::default();
    for arg in &args {
        match arg.as_str() {
            "--users" => opts.users = true,
            "--posts" => opts.posts = true,
            "--votes" => opts.votes = true,
            "--subs" => opts.subs = true,
            other => {
                eprintln!("unknown migrate flag: {}", other);
                eprintln!("usage: forum-service migrate [--users] [--posts] [--votes] [--subs]");
                return Err(io::Error::new(io::ErrorKind::InvalidInput, "bad flag"));
            }
        }
    }

    let target_cfg = DbConfig::for_pool("transfer-target", &config.database.url);
    target_cfg.log_config();
    let target = create_pool(target_cfg)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("target pool: {}", e)))?;

    sqlx::migrate!("./migrations")
        .run(&target)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("schema migration: {}", e)))?;

    let source_cfg = DbConfig::for_pool("transfer-source", &config.transfer.legacy_database_url);
    source_cfg.log_config();
    let source = create_pool(source_cfg)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("source pool: {}", e)))?;

    let pipeline = MigrationPipeline::new(
        target,
        source,
        config.transfer.batch_size,
        config.transfer.progress_step,
    );

    pipeline
        .run(opts)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("transfer failed: {}", e)))?;

    Ok(())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // CLI subcommands: `migrate` for the legacy transfer, `healthcheck` /
    // `healthcheck-http` for container health probes.
    {
        let mut args = std::env::args();
        let _bin = args.next();
        if let Some(cmd) = args.next() {
            if cmd == "migrate" {
                return run_migrate(args.collect()).await;
            }
            if cmd == "healthcheck" || cmd == "healthcheck-http" {
                let port = std::env::var("FORUM_SERVICE_PORT")
                    .ok()
                    .and_then(|v| v.parse::<u16>().ok())
                    .unwrap_or(8080);
                let url = format!("http://127.0.0.1:{}/api/v1/health", port);
                match reqwest::Client::new().get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => return Ok(()),
                    Ok(resp) => {
                        eprintln!("healthcheck HTTP status: {}", resp.status());
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"));
                    }
                    Err(e) => {
                        eprintln!("healthcheck HTTP error: {}", e);
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"));
                    }
                }
            }
        }
    }

    init_tracing();
    dotenv::dotenv().ok();

    let config = load_config();

    tracing::info!("Starting forum-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let db_cfg = DbConfig::for_pool("forum-service", &config.database.url);
    db_cfg.log_config();
    let db_pool = match create_pool(db_cfg).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {:#}", e);
            eprintln!("ERROR: Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("schema migration: {}", e)))?;

    tracing::info!("Connected to database via db-pool crate");

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let health_state = web::Data::new(HealthState {
        db_pool: db_pool.clone(),
    });
    let config_data = web::Data::new(config.clone());

    HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in config.cors.allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(config_data.clone())
            .app_data(health_state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route(
                "/metrics",
                web::get().to(forum_service::metrics::serve_metrics),
            )
            // Health check endpoints
            .route("/api/v1/health", web::get().to(health_summary))
            .route("/api/v1/health/ready", web::get().to(readiness_summary))
            .route("/api/v1/health/live", web::get().to(liveness_check))
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/posts")
                            .service(
                                web::resource("")
                                    .route(web::post().to(handlers::create_post))
                                    .route(web::get().to(handlers::list_posts)),
                            )
                            .service(
                                web::resource("/{post_id}")
                                    .route(web::get().to(handlers::get_post))
                                    .route(web::patch().to(handlers::edit_post))
                                    .route(web::delete().to(handlers::delete_post)),
                            )
                            .route(
                                "/{post_id}/status",
                                web::patch().to(handlers::set_post_status),
                            )
                            .route("/{post_id}/thread", web::get().to(handlers::get_thread))
                            .route("/{post_id}/votes", web::post().to(handlers::toggle_vote))
                            .service(
                                web::resource("/{post_id}/subscriptions")
                                    .route(web::post().to(handlers::subscribe))
                                    .route(web::get().to(handlers::list_subscriptions)),
                            )
                            .route(
                                "/{post_id}/subscriptions/{user_id}",
                                web::delete().to(handlers::unsubscribe),
                            ),
                    )
                    .service(
                        web::scope("/messages")
                            .service(
                                web::resource("").route(web::post().to(handlers::send_message)),
                            )
                            .route("/inbox/{user_id}", web::get().to(handlers::inbox))
                            .route("/outbox/{user_id}", web::get().to(handlers::outbox))
                            .route("/{message_id}/read", web::patch().to(handlers::mark_read)),
                    ),
            )
    })
    .bind(&bind_address)?
    .workers(4)
    .run()
    .await
}
