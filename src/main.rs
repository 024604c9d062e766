use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::{delete, get, post, put};
use axum::{extract::State, middleware as axum_middleware, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use filmnexus::cache::{Cache, CacheBackend, MemoryBackend, RedisBackend};
use filmnexus::config;
use filmnexus::database::manager;
use filmnexus::handlers::{self, AppState};
use filmnexus::middleware::jwt_auth_middleware;
use filmnexus::storage::NullStorage;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, REDIS_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("starting filmnexus in {:?} mode", config.environment);

    let pool = match manager::connect(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("database startup failed: {}", e);
            std::process::exit(1);
        }
    };

    let backend: Arc<dyn CacheBackend> = match &config.redis.url {
        Some(url) => match RedisBackend::connect(url, config.redis.pool_size).await {
            Ok(redis) => Arc::new(redis),
            Err(e) => {
                tracing::warn!("redis unavailable, using in-memory cache: {}", e);
                Arc::new(MemoryBackend::new())
            }
        },
        None => {
            tracing::info!("no REDIS_URL configured, using in-memory cache");
            Arc::new(MemoryBackend::new())
        }
    };
    let cache = Cache::new(backend, Duration::from_secs(config.cache.ttl_secs));

    let state = AppState {
        pool: pool.clone(),
        cache,
        storage: Arc::new(NullStorage),
    };

    let app = app(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("listening on http://{}", bind_addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server error: {}", e);
        std::process::exit(1);
    }

    manager::close(&pool).await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_routes())
        .merge(protected_routes())
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/link", post(auth::link_identity))
}

fn protected_routes() -> Router<AppState> {
    use handlers::{files, members, messages, projects, users};

    Router::new()
        // Current user
        .route(
            "/api/users/me",
            get(users::get_current_user)
                .put(users::update_current_user)
                .delete(users::delete_current_user),
        )
        // Projects
        .route(
            "/api/projects",
            get(projects::get_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/:projectId",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        // Members and the invite picker
        .route("/api/projects/:projectId/users", get(users::search_users))
        .route("/api/projects/:projectId/members", post(members::create_member))
        .route(
            "/api/projects/:projectId/members/:userId",
            put(members::update_member).delete(members::delete_member),
        )
        // Messages
        .route(
            "/api/projects/:projectId/messages",
            get(messages::get_messages)
                .post(messages::create_message)
                .delete(messages::delete_messages),
        )
        .route(
            "/api/projects/:projectId/messages/:messageId",
            delete(messages::delete_message),
        )
        // Files
        .route(
            "/api/projects/:projectId/files",
            get(files::get_files)
                .post(files::create_file)
                .delete(files::delete_files),
        )
        .route(
            "/api/projects/:projectId/files/:fileId",
            put(files::update_file).delete(files::delete_file),
        )
        .layer(axum_middleware::from_fn(jwt_auth_middleware))
}

fn cors_layer() -> CorsLayer {
    let origins = &config::config().security.cors_origins;
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let database = manager::health_check(&state.pool).await.is_ok();

    // A failed round trip means the backend is down; the cache facade
    // swallows the error, so round-trip a nonce value instead.
    let nonce = uuid::Uuid::new_v4().to_string();
    state.cache.put_json("fn:health", &nonce).await;
    let cache =
        state.cache.get_json::<String>("fn:health").await.as_deref() == Some(nonce.as_str());

    Json(json!({
        "status": if database { "ok" } else { "degraded" },
        "database": database,
        "cache": cache,
    }))
}
