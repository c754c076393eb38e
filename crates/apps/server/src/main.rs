use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path as AxumPath, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use catalog::IndicatorCatalog;
use clap::Parser;
use serde_json::json;
use streaming::FsDataSource;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Serves the indicator data layout and the web bundle")]
struct Args {
    /// Directory holding aggregates/, timeseries/, legends/ and admin/
    #[arg(long, env = "ATLAS_DATA_ROOT", default_value = "data")]
    data_root: PathBuf,

    /// Directory holding index.html and the wasm package
    #[arg(long, env = "ATLAS_WEB_ROOT", default_value = "web")]
    web_root: PathBuf,

    /// Listen address
    #[arg(long, env = "ATLAS_ADDR", default_value = "127.0.0.1:8080")]
    addr: SocketAddr,
}

#[derive(Clone)]
struct AppState {
    data: Arc<FsDataSource>,
    web: Arc<FsDataSource>,
    /// Served when the data root has no catalog.json of its own.
    fallback_catalog: Arc<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        error!("server failed: {err}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), String> {
    if !args.data_root.is_dir() {
        warn!("data root {:?} does not exist; every data request will 404", args.data_root);
    }
    check_catalog(&args.data_root).await;

    let builtin = IndicatorCatalog::builtin().map_err(|e| format!("builtin catalog: {e}"))?;
    let fallback_catalog =
        serde_json::to_string_pretty(&builtin.to_document()).map_err(|e| e.to_string())?;

    let state = AppState {
        data: Arc::new(FsDataSource::new(&args.data_root)),
        web: Arc::new(FsDataSource::new(&args.web_root)),
        fallback_catalog: Arc::new(fallback_catalog),
    };

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|e| format!("bind {}: {e}", args.addr))?;
    info!(
        "atlas server listening on http://{} (data {:?}, web {:?})",
        args.addr, args.data_root, args.web_root
    );
    axum::serve(listener, router(state))
        .await
        .map_err(|e| e.to_string())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS]);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/data/*path", get(get_data))
        .fallback(get_web)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Logs whether a custom catalog.json parses, so a broken one is caught at
/// startup rather than in the browser.
async fn check_catalog(data_root: &Path) {
    let path = data_root.join("catalog.json");
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => match IndicatorCatalog::from_json_str(&text) {
            Ok(c) => info!("catalog.json: {} indicators", c.indicators().count()),
            Err(err) => warn!("catalog.json is invalid: {err}"),
        },
        Err(_) => info!("no catalog.json in data root; serving the built-in catalog"),
    }
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

async fn get_catalog(State(state): State<AppState>) -> Response {
    match state.data.resolve("catalog.json") {
        Some(path) if path.is_file() => serve_file(&path).await,
        _ => {
            let mut headers = HeaderMap::new();
            headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            (StatusCode::OK, headers, state.fallback_catalog.as_str().to_owned()).into_response()
        }
    }
}

async fn get_data(State(state): State<AppState>, AxumPath(path): AxumPath<String>) -> Response {
    if path == "catalog.json" {
        return get_catalog(State(state)).await;
    }
    match state.data.resolve(&path) {
        Some(full) => serve_file(&full).await,
        None => not_found(&path),
    }
}

async fn get_web(State(state): State<AppState>, uri: Uri) -> Response {
    let mut path = uri.path().trim_start_matches('/').to_string();
    if path.is_empty() || path.ends_with('/') {
        path.push_str("index.html");
    }
    match state.web.resolve(&path) {
        Some(full) => serve_file(&full).await,
        None => not_found(&path),
    }
}

fn not_found(path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        axum::Json(json!({ "error": "not found", "path": path })),
    )
        .into_response()
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "tif" | "tiff" => "image/tiff",
        "json" => "application/json",
        "geojson" => "application/geo+json",
        "png" => "image/png",
        "html" => "text/html; charset=utf-8",
        "js" | "mjs" => "text/javascript",
        "wasm" => "application/wasm",
        "css" => "text/css",
        _ => "application/octet-stream",
    }
}

async fn serve_file(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(data) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static(content_type_for(path)),
            );
            (StatusCode::OK, headers, Body::from(data)).into_response()
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            not_found(&path.display().to_string())
        }
        Err(err) => {
            error!("file read failed: {path:?} -> {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "read failed").into_response()
        }
    }
}
