use crate::infra::{
    page_frame, read_session_cookie, session_cookie, AppState, NavigationRequest, Session,
};
use axum::extract::Query;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use disclosure_reports::disclosure::{NavigationPath, Rendered, ReportGroup};
use disclosure_reports::error::AppError;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NavigationQuery {
    /// Institution search text.
    #[serde(default)]
    pub(crate) q: Option<String>,
    /// Present when the user asked to retry a failed lookup.
    #[serde(default)]
    pub(crate) retry: Option<String>,
}

impl NavigationQuery {
    fn into_request(self, path: NavigationPath) -> NavigationRequest {
        NavigationRequest {
            path,
            query: self.q,
            retry: self
                .retry
                .is_some_and(|flag| !matches!(flag.as_str(), "0" | "false")),
            today: None,
        }
    }
}

const VIEW_PREFIX: &str = "/api/v1/disclosure/view";
const TABLE_PREFIX: &str = "/api/v1/disclosure/table";

/// Navigation path below `prefix`, read from the still-encoded request path
/// so identifiers holding an encoded `/` keep it.
fn path_below(uri: &Uri, prefix: &str) -> NavigationPath {
    NavigationPath::parse(uri.path().strip_prefix(prefix).unwrap_or_default())
}

pub(crate) fn disclosure_routes() -> Router {
    Router::new()
        .route("/disclosure-reports", get(page_root))
        .route("/disclosure-reports/", get(page_root))
        .route("/disclosure-reports/*rest", get(page_at))
        .route(VIEW_PREFIX, get(view_root))
        .route("/api/v1/disclosure/view/*rest", get(view_at))
        .route("/api/v1/disclosure/table/*rest", get(table_csv))
        .route("/api/v1/disclosure/catalog", get(catalog_endpoint))
        .route("/api/v1/disclosure/session/reset", post(reset_session))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

async fn page_root(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Query(query): Query<NavigationQuery>,
) -> Response {
    render_page(state, &headers, NavigationPath::root(), query).await
}

async fn page_at(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<NavigationQuery>,
) -> Response {
    render_page(state, &headers, NavigationPath::parse(uri.path()), query).await
}

async fn render_page(
    state: AppState,
    headers: &HeaderMap,
    path: NavigationPath,
    query: NavigationQuery,
) -> Response {
    let (session, rendered) = drive_session(&state, headers, query.into_request(path)).await;

    let response = match rendered {
        Rendered::Page(page) => Html(page_frame(&page.to_html())).into_response(),
        Rendered::Redirect { location, .. } => {
            (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response()
        }
    };
    with_session_cookie(response, &session)
}

async fn view_root(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Query(query): Query<NavigationQuery>,
) -> Response {
    render_view(state, &headers, NavigationPath::root(), query).await
}

async fn view_at(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<NavigationQuery>,
) -> Response {
    render_view(state, &headers, path_below(&uri, VIEW_PREFIX), query).await
}

async fn render_view(
    state: AppState,
    headers: &HeaderMap,
    path: NavigationPath,
    query: NavigationQuery,
) -> Response {
    let (session, rendered) = drive_session(&state, headers, query.into_request(path)).await;
    with_session_cookie(Json(rendered).into_response(), &session)
}

async fn table_csv(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, AppError> {
    let path = path_below(&uri, TABLE_PREFIX);
    let (session, rendered) =
        drive_session(&state, &headers, NavigationRequest::to(path.clone())).await;

    let table = rendered
        .into_page()
        .and_then(|page| page.report)
        .and_then(|viewer| viewer.table)
        .ok_or_else(|| AppError::NotFound(format!("no table for {path}")))?;
    let csv = table.to_csv()?;

    let response = (
        [(header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.as_ref())],
        csv,
    )
        .into_response();
    Ok(with_session_cookie(response, &session))
}

async fn catalog_endpoint(Extension(state): Extension<AppState>) -> Json<Vec<ReportGroup>> {
    Json(state.disclosure.catalog.groups().to_vec())
}

async fn reset_session(Extension(state): Extension<AppState>, headers: HeaderMap) -> Response {
    let session = checkout(&state, &headers);
    session.controller.lock().await.reset();
    info!(session = %session.id, "session reset requested");
    with_session_cookie(StatusCode::NO_CONTENT.into_response(), &session)
}

fn checkout(state: &AppState, headers: &HeaderMap) -> Session {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(read_session_cookie);
    state.sessions.checkout(cookie, &state.disclosure)
}

async fn drive_session(
    state: &AppState,
    headers: &HeaderMap,
    request: NavigationRequest,
) -> (Session, Rendered) {
    let session = checkout(state, headers);
    let rendered = {
        let mut controller = session.controller.lock().await;
        state.disclosure.drive(&mut controller, request).await
    };
    (session, rendered)
}

fn with_session_cookie(mut response: Response, session: &Session) -> Response {
    if !session.created {
        return response;
    }
    match HeaderValue::try_from(session_cookie(&session.id)) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(err) => warn!(error = %err, "session cookie is not a valid header value"),
    }
    response
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready", "sessions": state.sessions.len() })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
