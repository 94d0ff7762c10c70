use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use super::config::{CrawlConfig, DEFAULT_MAX_DEPTH};
use super::crawl::Crawler;
use super::data_io::{DataFormat, LatestReport, write_report};
use super::error::CrawlError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CrawlError> for AppError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::NoReportAvailable => AppError::NotFound(err.to_string()),
            CrawlError::InvalidSeedUrl { .. } | CrawlError::ClientSetup(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

/// Problem body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    title: String,
    status: u16,
    detail: String,
}

impl ErrorResponse {
    pub fn from_error(err: &AppError) -> Self {
        let status = err.status_code();
        Self {
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            status: status.as_u16(),
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(ErrorResponse::from_error(&self))).into_response()
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub crawler: Crawler,
    pub latest: LatestReport,
}

impl AppState {
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            crawler: Crawler::new(config),
            latest: LatestReport::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScrapeParams {
    url: Option<String>,
    depth: Option<usize>,
}

async fn scrape(
    State(state): State<AppState>,
    Query(params): Query<ScrapeParams>,
) -> Result<Response> {
    let Some(url) = params.url.filter(|url| !url.trim().is_empty()) else {
        return Err(AppError::BadRequest("missing 'url' parameter".to_string()));
    };
    let depth = params.depth.unwrap_or(DEFAULT_MAX_DEPTH);

    let crawler = Crawler::new(state.crawler.config().clone().with_max_depth(depth));
    let report = crawler.run(&url).await?;
    let report = state.latest.store(report).await;
    Ok(Json(&*report).into_response())
}

async fn export(state: &AppState, format: DataFormat) -> Result<Response> {
    let report = state.latest.get().await?;
    let mut body = Vec::new();
    write_report(&report, format, &mut body)
        .map_err(|err| AppError::Internal(format!("failed to render export: {err}")))?;

    let (content_type, disposition) = match format {
        DataFormat::Json => (
            "application/json",
            "attachment; filename=\"scrape_result.json\"",
        ),
        DataFormat::Csv => ("text/csv", "attachment; filename=\"scrape_result.csv\""),
        DataFormat::Sitemap => ("application/xml", "attachment; filename=\"sitemap.xml\""),
    };
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn export_json(State(state): State<AppState>) -> Result<Response> {
    export(&state, DataFormat::Json).await
}

async fn export_csv(State(state): State<AppState>) -> Result<Response> {
    export(&state, DataFormat::Csv).await
}

async fn export_sitemap(State(state): State<AppState>) -> Result<Response> {
    export(&state, DataFormat::Sitemap).await
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/scrape", get(scrape))
        .route("/export/json", get(export_json))
        .route("/export/csv", get(export_csv))
        .route("/export/sitemap", get(export_sitemap));

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(addr: SocketAddr, config: CrawlConfig) -> anyhow::Result<()> {
    let app = create_router(AppState::new(config));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "linkscope server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_router() -> Router {
        create_router(AppState::new(
            CrawlConfig::default()
                .with_max_jitter(Duration::ZERO)
                .with_request_timeout(Duration::from_secs(5)),
        ))
    }

    async fn get_response(app: Router, uri: &str) -> (StatusCode, Vec<u8>, Option<String>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec(), disposition)
    }

    #[tokio::test]
    async fn scrape_without_url_is_bad_request() {
        let (status, body, _) = get_response(test_router(), "/api/scrape").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let problem: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(problem["status"], 400);
        assert_eq!(problem["title"], "Bad Request");
    }

    #[tokio::test]
    async fn invalid_seed_is_internal_error() {
        let (status, body, _) = get_response(test_router(), "/api/scrape?url=ftp%3A%2F%2Fx").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let problem: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(
            problem["detail"]
                .as_str()
                .unwrap()
                .contains("unsupported scheme")
        );
    }

    #[tokio::test]
    async fn export_before_any_crawl_is_not_found() {
        for uri in ["/api/export/json", "/api/export/csv", "/api/export/sitemap"] {
            let (status, _, _) = get_response(test_router(), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn scrape_then_export_serves_latest_report() {
        let site = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<html><head><title>Mock Site Home</title></head>
                   <body><a href="/about">About</a></body></html>"#,
                "text/html",
            ))
            .mount(&site)
            .await;
        Mock::given(method("GET"))
            .and(path("/about"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&site)
            .await;

        let app = test_router();
        let seed = format!("{}/", site.uri());
        let uri = format!("/api/scrape?url={seed}&depth=1");
        let (status, body, _) = get_response(app.clone(), &uri).await;
        assert_eq!(status, StatusCode::OK);

        let report: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(report["totalLinks"], 2);
        assert_eq!(report["stats"]["success"], 1);
        assert_eq!(report["stats"]["errors"], 1);

        let (status, body, disposition) = get_response(app.clone(), "/api/export/csv").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            disposition.as_deref(),
            Some("attachment; filename=\"scrape_result.csv\"")
        );
        let csv = String::from_utf8(body).unwrap();
        assert!(csv.starts_with("URL,Title,Status,Visited"));
        assert!(csv.contains(&format!("{seed},Mock Site Home,200,true")));

        let (status, body, _) = get_response(app, "/api/export/sitemap").await;
        assert_eq!(status, StatusCode::OK);
        let xml = String::from_utf8(body).unwrap();
        assert!(xml.contains(&format!("<loc>{seed}about</loc>")));
    }
}
