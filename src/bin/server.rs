#![forbid(unsafe_code)]

//! TubeKit backend: serves the web client and proxies the two YouTube
//! endpoints it needs (Atom feeds and oEmbed) so the browser never talks to
//! YouTube directly and no API key is involved.

use std::{
    env,
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use axum::{
    Json, Router,
    body::Body,
    extract::{RawQuery, State},
    http::{HeaderMap, HeaderValue, Method, Request, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use mime_guess::MimeGuess;
use serde_json::{Value, json};
use tokio::{fs::File, signal};
use tokio_util::io::ReaderStream;
use tubekit::config::{DEFAULT_CONFIG_PATH, RuntimeSettings, load_runtime_settings_from};
use tubekit::model::FeedSource;
use tubekit::upstream::{Upstream, UpstreamConfig};
use url::Url;

const WATCH_BASE: &str = "https://www.youtube.com/watch";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "TubeKit: a tiny YouTube web client using embeds + public RSS feeds (no YouTube Data API)."
)]
struct ServerArgs {
    #[arg(long = "host", value_name = "ADDR", help = "Address to listen on")]
    host: Option<String>,
    #[arg(long = "port", value_name = "PORT", help = "Port to listen on")]
    port: Option<u16>,
    #[arg(
        long = "web-root",
        value_name = "DIR",
        help = "Directory holding the static web client"
    )]
    web_root: Option<PathBuf>,
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH, help = "Path to the config file")]
    config: PathBuf,
}

#[derive(Clone)]
struct AppState {
    upstream: Upstream,
    web_root: Arc<PathBuf>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            detail: None,
        }
    }

    fn bad_gateway(message: impl Into<String>, detail: impl ToString) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
            detail: Some(detail.to_string()),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            detail: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.message });
        if let Some(detail) = self.detail {
            body["detail"] = Value::String(detail);
        }
        json_response(self.status, body)
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[tokio::main]
async fn main() -> Result<()> {
    tubekit::init_logging();
    let settings = resolve_settings(ServerArgs::parse())?;

    if !settings.web_root.is_dir() {
        bail!("Missing web root: {}", settings.web_root.display());
    }

    let state = AppState {
        upstream: Upstream::new(UpstreamConfig {
            timeout: settings.upstream_timeout,
            cache_ttl: settings.cache_ttl,
            ..UpstreamConfig::default()
        }),
        web_root: Arc::new(settings.web_root.clone()),
    };

    let host: IpAddr = settings
        .host
        .parse()
        .with_context(|| format!("parsing listen host {}", settings.host))?;
    let addr = SocketAddr::new(host, settings.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    println!("TubeKit running on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running TubeKit server")?;

    Ok(())
}

/// Command-line flags win over `TUBEKIT_*` environment variables, which win
/// over the env file.
fn resolve_settings(args: ServerArgs) -> Result<RuntimeSettings> {
    let mut settings = load_runtime_settings_from(&args.config)?;

    if let Some(port) = env::var("TUBEKIT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        settings.port = port;
    }
    if let Ok(host) = env::var("TUBEKIT_HOST") {
        if !host.trim().is_empty() {
            settings.host = host.trim().to_string();
        }
    }

    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(web_root) = args.web_root {
        settings.web_root = web_root;
    }
    Ok(settings)
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/feed", get(feed).options(preflight))
        .route("/api/oembed", get(oembed).options(preflight))
        .fallback(fallback)
        .layer(middleware::map_response(security_headers))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        eprintln!("Failed to install Ctrl+C handler: {}", err);
    }
}

async fn security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );
    response
}

async fn preflight() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    (StatusCode::NO_CONTENT, headers).into_response()
}

async fn fallback(State(state): State<AppState>, req: Request<Body>) -> Response {
    let path = req.uri().path();
    let is_api = path == "/api" || path.starts_with("/api/");

    if req.method() == Method::OPTIONS {
        return if is_api {
            preflight().await
        } else {
            ApiError::not_found("Not found").into_response()
        };
    }
    if is_api {
        return ApiError::not_found("endpoint not found").into_response();
    }

    match serve_www_path(&state.web_root, path).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn feed(State(state): State<AppState>, RawQuery(query): RawQuery) -> ApiResult<Response> {
    let query = query.unwrap_or_default();
    let provided: Vec<(&'static str, String)> = ["channel_id", "playlist_id", "user"]
        .into_iter()
        .map(|key| (key, first_param(&query, key)))
        .filter(|(_, value)| !value.is_empty())
        .collect();

    let [(kind, value)] = provided.as_slice() else {
        return Err(ApiError::bad_request(
            "Provide exactly one of channel_id, playlist_id, or user",
        ));
    };
    let source = FeedSource::Raw {
        param: *kind,
        value: value.clone(),
    };

    let feed = state.upstream.feed(&source).await.map_err(|err| {
        tracing::warn!(%source, error = %err, "feed fetch failed");
        ApiError::bad_gateway("Failed to fetch/parse feed", err)
    })?;

    let body = serde_json::to_value(&feed)
        .map_err(|err| ApiError::bad_gateway("Failed to fetch/parse feed", err))?;
    Ok(json_response(StatusCode::OK, body))
}

async fn oembed(State(state): State<AppState>, RawQuery(query): RawQuery) -> ApiResult<Response> {
    let query = query.unwrap_or_default();
    let video = first_param(&query, "v");
    let mut target = first_param(&query, "url");

    if target.is_empty() && !video.is_empty() {
        target = Url::parse_with_params(WATCH_BASE, &[("v", video.as_str())])
            .map(String::from)
            .map_err(|err| ApiError::bad_request(err.to_string()))?;
    }
    if target.is_empty() {
        return Err(ApiError::bad_request("Provide v or url"));
    }

    let payload = state.upstream.oembed(&target).await.map_err(|err| {
        tracing::warn!(url = %target, error = %err, "oEmbed fetch failed");
        ApiError::bad_gateway("Failed to fetch oEmbed", err)
    })?;
    Ok(json_response(StatusCode::OK, payload))
}

/// Trimmed first non-empty value of `key` in a raw query string.
fn first_param(query: &str, key: &str) -> String {
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(name, _)| name == key)
        .map(|(_, value)| value.trim().to_owned())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn json_response(status: StatusCode, body: Value) -> Response {
    (
        status,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ),
        ],
        Json(body),
    )
        .into_response()
}

async fn serve_www_path(root: &Path, request_path: &str) -> ApiResult<Response> {
    let target = resolve_www_path(root, request_path)?;
    match tokio::fs::metadata(&target).await {
        Ok(meta) if meta.is_dir() => stream_file(target.join("index.html")).await,
        Ok(_) => stream_file(target).await,
        Err(_) => Err(ApiError::not_found("File not found")),
    }
}

fn resolve_www_path(root: &Path, request_path: &str) -> ApiResult<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Ok(root.join("index.html"));
    }
    let candidate = Path::new(trimmed);
    if candidate
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err(ApiError::not_found("File not found"));
    }
    Ok(root.join(candidate))
}

async fn stream_file(path: PathBuf) -> ApiResult<Response> {
    let file = File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("File not found"))?;

    let stream = ReaderStream::new(file);
    let mut response = Body::from_stream(stream).into_response();
    if let Some(mime) = MimeGuess::from_path(&path).first() {
        if let Ok(value) = mime.to_string().parse() {
            response.headers_mut().insert(header::CONTENT_TYPE, value);
        }
    }

    Ok(response)
}
