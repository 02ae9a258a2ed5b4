//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::DbAdapter, placement_llm::OpenAiPlacementAdapter},
    config::Config,
    error::ApiError,
    web::{
        create_exam_handler, delete_exam_handler, generate_schedule_handler,
        get_rest_days_handler, list_exams_handler, list_sessions_handler,
        middleware::require_auth, reset_schedule_handler, rest::ApiDoc, state::AppState,
        today_handler, update_exam_handler, update_rest_days_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use study_planner_core::{PlacementOrchestrator, ScheduleGenerator};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Placement Capability ---
    let orchestrator = match config.openai_api_key.as_ref() {
        Some(api_key) => {
            let openai_client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
            let placement_adapter = Arc::new(OpenAiPlacementAdapter::new(
                openai_client,
                config.placement_model.clone(),
            ));
            info!(
                model = %config.placement_model,
                timeout_secs = config.placement_timeout.as_secs(),
                "Placement capability enabled"
            );
            PlacementOrchestrator::new(placement_adapter, config.placement_timeout)
        }
        None => {
            warn!("OPENAI_API_KEY not set; every schedule uses the deterministic generator");
            PlacementOrchestrator::deterministic()
        }
    };

    // --- 4. Build the Shared AppState ---
    let generator = Arc::new(ScheduleGenerator::new(db_adapter.clone(), orchestrator));
    let app_state = Arc::new(AppState {
        db: db_adapter,
        generator,
    });

    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Every API route requires an auth session.
    let api_router = Router::new()
        .route("/exams", get(list_exams_handler).post(create_exam_handler))
        .route(
            "/exams/{id}",
            put(update_exam_handler).delete(delete_exam_handler),
        )
        .route(
            "/exams/{id}/schedule",
            post(generate_schedule_handler).delete(reset_schedule_handler),
        )
        .route("/exams/{id}/sessions", get(list_sessions_handler))
        .route(
            "/settings/rest-days",
            get(get_rest_days_handler).put(update_rest_days_handler),
        )
        .route("/today", get(today_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
