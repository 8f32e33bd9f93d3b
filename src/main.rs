use actix_web::{http, web, App, HttpServer};
use actix_cors::Cors;
use dotenv::dotenv;
use log::info;

use learning_platform_backend::{handlers, services};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let db_pool = services::init_db_pool().await;
    let app_state = web::Data::new(services::app_state_from_pool(db_pool));

    info!("Starting HTTP server on 0.0.0.0:5050");
    HttpServer::new(move || {
        let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
            .supports_credentials();

        // Add each origin from the comma-separated list
        for origin in allowed_origins.split(',') {
            cors = cors.allowed_origin(origin.trim());
        }

        App::new()
            .wrap(cors)
            .app_data(app_state.clone())
            .configure(handlers::configure_routes)
    })
    .bind(("0.0.0.0", 5050))?
    .run()
    .await
}
