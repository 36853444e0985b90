use std::time::Duration;

use anyhow::Context;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use storage::Database;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod features;
mod state;
mod worker;

use config::Config;
use state::AppState;
use worker::WorkerPool;

#[derive(OpenApi)]
#[openapi(
    paths(
        features::rankings::handlers::get_rankings,
        features::rankings::handlers::get_cached_rankings,
        features::jobs::handlers::create_job,
        features::jobs::handlers::list_jobs,
        features::jobs::handlers::get_job,
        features::regions::handlers::list_regions,
        health,
    ),
    components(
        schemas(
            storage::dto::ranking::RankingsResponse,
            storage::dto::ranking::RankingEntry,
            storage::dto::ranking::SwimmerInfo,
            storage::dto::ranking::MeetInfo,
            storage::dto::job::CreateJobRequest,
            storage::dto::region::RegionResponse,
            storage::dto::region::LscResponse,
            storage::models::FilterPayload,
            storage::models::RankingJob,
            storage::models::JobStatus,
        )
    ),
    tags(
        (name = "rankings", description = "Dynamic and cached swim rankings"),
        (name = "rankings-jobs", description = "Cache materialization jobs"),
        (name = "regions", description = "Region and LSC directory"),
        (name = "health", description = "Liveness"),
    )
)]
struct ApiDoc;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up")
    ),
    tag = "health"
)]
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    let api = Router::new()
        .merge(features::rankings::routes::routes())
        .merge(features::jobs::routes::routes())
        .merge(features::regions::routes::routes());

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting swim rankings API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!(
        "Connecting to database at: {}",
        config
            .database_url
            .split('@')
            .next_back()
            .unwrap_or("unknown")
    );
    let db = Database::with_max_connections(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations");
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed successfully");

    let state = AppState::from_database(&db).with_job_lease(config.job_lease);

    let materializer = state.materializer().with_fetch_timeout(config.fetch_timeout);
    let workers = WorkerPool::spawn(
        &state,
        materializer,
        config.job_workers,
        config.job_poll_interval,
    );
    tracing::info!("Started {} ranking job workers", config.job_workers.max(1));

    let bind_address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!(
        "Swagger UI available at http://{}/swagger-ui/",
        bind_address
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Waiting for ranking job workers to finish");
    workers.shutdown().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        response::Response,
    };
    use chrono::NaiveDate;
    use storage::{
        memory::{MemoryCacheStore, MemoryJobStore, MemoryRecordSource},
        models::{Course, Gender, PerformanceRecord, Stroke},
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    fn swim(name: &str, seconds: &str, age: i32) -> PerformanceRecord {
        let swum_at = NaiveDate::from_ymd_opt(2025, 1, 18)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        PerformanceRecord {
            time_id: Uuid::new_v4(),
            swimmer_id: Uuid::new_v4(),
            swimmer_name: name.to_string(),
            club: Some("Dynamo Swim Club".to_string()),
            age: Some(age),
            region: Some("Southern".to_string()),
            lsc: Some("GA".to_string()),
            meet_id: Uuid::from_u128(1),
            meet_name: "Winter Age Group Champs".to_string(),
            meet_date: swum_at,
            season: Some("2024-2025".to_string()),
            event_id: Uuid::from_u128(2),
            stroke: Stroke::Back,
            distance: 50,
            course: Course::Lcm,
            gender: Some(Gender::F),
            age_group: Some("10 and under".to_string()),
            time_seconds: seconds.parse().unwrap(),
            time_formatted: seconds.to_string(),
            is_personal_best: false,
            recorded_at: swum_at,
        }
    }

    fn test_state() -> AppState {
        let records = vec![
            swim("Maya Chen", "34.50", 10),
            swim("Ava Brooks", "33.31", 9),
            swim("Lena Ortiz", "34.27", 10),
        ];

        AppState::new(
            Arc::new(MemoryRecordSource::new(records)),
            Arc::new(MemoryCacheStore::new()),
            Arc::new(MemoryJobStore::new()),
        )
    }

    const QUERY: &str =
        "stroke=Back&distance=50&course=LCM&gender=F&ageGroup=10%20and%20under&season=2024-2025";

    async fn send(state: AppState, request: Request<Body>) -> Response {
        app(state).oneshot(request).await.unwrap()
    }

    async fn get_uri(state: AppState, uri: &str) -> Response {
        send(state, Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_dynamic_rankings_rank_by_time() {
        let response = get_uri(test_state(), &format!("/api/rankings?{}", QUERY)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["count"], 3);
        assert_eq!(body["total_swimmers"], 3);
        assert_eq!(body["data"][0]["rank"], 1);
        assert_eq!(body["data"][0]["time_formatted"], "33.31");
        assert_eq!(body["data"][2]["time_formatted"], "34.50");
        assert_eq!(body["filters"]["ageGroup"], "10 and under");
    }

    #[tokio::test]
    async fn test_limit_truncates_but_keeps_total() {
        let response = get_uri(test_state(), &format!("/api/rankings?{}&limit=1", QUERY)).await;

        let body = body_json(response).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["total_swimmers"], 3);
    }

    #[tokio::test]
    async fn test_cached_rankings_empty_until_materialized() {
        let state = test_state();

        let response = get_uri(state.clone(), &format!("/api/rankings-cache?{}", QUERY)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["count"], 0);

        let request = Request::post("/api/rankings-jobs")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "filters": {
                        "stroke": "Back",
                        "distance": 50,
                        "course": "LCM",
                        "gender": "F",
                        "ageGroup": "10 and under",
                        "season": "2024-2025"
                    }
                })
                .to_string(),
            ))
            .unwrap();
        let response = send(state.clone(), request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let job = body_json(response).await;
        assert_eq!(job["status"], "pending");

        state
            .coordinator
            .run_pending(&state.materializer())
            .await
            .unwrap();

        let response = get_uri(state.clone(), &format!("/api/rankings-cache?{}", QUERY)).await;
        let body = body_json(response).await;
        assert_eq!(body["count"], 3);
        assert_eq!(body["data"][1]["time_formatted"], "34.27");
        assert_eq!(body["data"][1]["total_swimmers"], 3);

        let job_uri = format!("/api/rankings-jobs/{}", job["id"].as_str().unwrap());
        let finished = body_json(get_uri(state, &job_uri).await).await;
        assert_eq!(finished["status"], "completed");
        assert_eq!(finished["total_records"], 3);
    }

    #[tokio::test]
    async fn test_invalid_filters_are_rejected() {
        let missing_stroke = get_uri(
            test_state(),
            "/api/rankings?distance=50&course=LCM&season=2024-2025",
        )
        .await;
        assert_eq!(missing_stroke.status(), StatusCode::BAD_REQUEST);

        let bad_limit = get_uri(test_state(), &format!("/api/rankings?{}&limit=0", QUERY)).await;
        assert_eq!(bad_limit.status(), StatusCode::BAD_REQUEST);

        let request = Request::post("/api/rankings-jobs")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "filters": { "stroke": "Back", "distance": 50, "course": "LCM", "club": "X" } })
                    .to_string(),
            ))
            .unwrap();
        let response = send(test_state(), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_query_gets_json_error() {
        for uri in [
            format!("/api/rankings?{}&limit=abc", QUERY),
            format!("/api/rankings-cache?{}&limit=-1", QUERY),
            "/api/rankings-jobs?limit=many".to_string(),
        ] {
            let response = get_uri(test_state(), &uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body_json(response).await["error"].is_string(), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let response = get_uri(test_state(), &format!("/api/rankings-jobs/{}", Uuid::new_v4())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_regions_and_health() {
        let regions = body_json(get_uri(test_state(), "/api/regions").await).await;
        assert_eq!(regions.as_array().map(Vec::len), Some(4));

        let health = get_uri(test_state(), "/health").await;
        assert_eq!(health.status(), StatusCode::OK);
    }
}
