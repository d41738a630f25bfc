use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{web, App, HttpServer};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixtap::TapController;
use pixtap_server::actuator::{self, ActuatorConfig};
use pixtap_server::config::ServerConfig;
use pixtap_server::orders::OrderClient;
use pixtap_server::routes;
use pixtap_server::state::AppState;

fn build_cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        // Default: allow localhost on any port
        Cors::default()
            .allowed_origin_fn(|origin, _| {
                origin
                    .to_str()
                    .map(|o| o == "http://localhost" || o.starts_with("http://localhost:"))
                    .unwrap_or(false)
            })
            .allow_any_method()
            .allowed_headers(vec!["content-type", "x-authenticity-token", "x-device-key"])
            .max_age(3600)
    } else {
        let mut cors = Cors::default();
        for origin in origins {
            cors = cors.allowed_origin(origin);
        }
        cors.allow_any_method()
            .allowed_headers(vec!["content-type", "x-authenticity-token", "x-device-key"])
            .max_age(3600)
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    let http_client = actuator::actuator_client();

    let orders = config
        .orders
        .clone()
        .map(|orders_config| OrderClient::new(reqwest::Client::new(), orders_config));

    let state = web::Data::new(AppState {
        controller: TapController::new(config.condition.clone(), config.pour_duration),
        webhook_secret: config.webhook_secret.clone(),
        device_key: config.device_key.clone(),
        pour_duration: config.pour_duration,
        actuator: config.actuator_url.clone().map(|url| ActuatorConfig {
            url,
            token: config.actuator_token.clone(),
        }),
        http_client,
        orders,
        metrics_token: config.metrics_token.clone(),
        public_metrics: config.public_metrics,
    });

    let port = config.port;
    tracing::info!("pixtap server listening on port {port}");
    tracing::info!(
        amount_cents = config.condition.amount_cents,
        method = %config.condition.method,
        status = %config.condition.status,
        pour_secs = config.pour_duration.as_secs(),
        "release condition"
    );
    tracing::info!("Rate limit: {} req/min per IP", config.rate_limit_rpm);
    tracing::info!("  POST http://localhost:{port}/pagbank/webhook");
    tracing::info!("  GET  http://localhost:{port}/pour");

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(config.rate_limit_rpm)
        .finish()
        .expect("failed to build rate limiter config");

    let cors_origins = config.allowed_origins.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors_origins))
            .wrap(Governor::new(&governor_conf))
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(65_536))
            .service(routes::health)
            .service(routes::metrics_endpoint)
            .service(routes::pagbank_webhook)
            .service(routes::pour)
            .service(routes::tap_test)
            .service(routes::create_order)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
