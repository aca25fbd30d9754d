use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::client::CatalogClient;
use crate::config::AdminConfig;
use crate::downloader;
use crate::error::{CatalogError, Result};
use crate::listing::{
    CategoryListing, CategoryRowView, ListingQuery, PAGE_SIZE, Page, StatusFilter, paginate,
    parse_expanded,
};

const SCREEN_PATH: &str = "/admin/catalog/categories";
const CSV_PATH: &str = "/admin/api/categories.csv";
const SCREEN_TEMPLATE: &str = "categories";

pub struct AppState {
    client: CatalogClient,
    templates: Handlebars<'static>,
}

impl AppState {
    pub fn new(client: CatalogClient) -> Result<Self> {
        let mut templates = Handlebars::new();
        templates
            .register_template_string(SCREEN_TEMPLATE, include_str!("./templates/categories.hbs"))
            .map_err(|e| CatalogError::Template(e.to_string()))?;
        Ok(AppState { client, templates })
    }
}

/// Raw query string of the category screen. Everything is optional so that a
/// bare `GET` shows the first page with nothing expanded.
#[derive(Debug, Default, Deserialize)]
pub struct ScreenParams {
    search: Option<String>,
    status: Option<String>,
    page: Option<String>,
    expanded: Option<String>,
}

impl ScreenParams {
    fn parse(&self) -> Result<(ListingQuery, HashSet<i64>)> {
        let page = match self.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => raw
                .parse()
                .map_err(|_| CatalogError::InvalidQuery(format!("page '{}'", raw)))?,
        };
        let query = ListingQuery {
            search: self.search.clone().unwrap_or_default(),
            status: self.status.as_deref().unwrap_or("all").parse()?,
            page,
        };
        let expanded = parse_expanded(self.expanded.as_deref().unwrap_or(""))?;
        Ok((query, expanded))
    }
}

/// JSON view model of the category screen.
#[derive(Debug, Serialize)]
pub struct ScreenModel {
    pub search: String,
    pub status: String,
    pub expanded: Vec<i64>,
    pub page: Page<CategoryRowView>,
    pub orphans: Vec<i64>,
    /// Rows left out of the tree: the orphans plus everything below them.
    pub hidden: usize,
    /// Set when the category list could not be fetched.
    pub error: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

/// Wraps [`CatalogError`] so handlers can return it with `?`.
pub struct ApiError(CatalogError);

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::InvalidStatus(_) | CatalogError::InvalidQuery(_) => {
                StatusCode::BAD_REQUEST
            }
            CatalogError::Upstream { .. } | CatalogError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            log::error!("{}", self.0);
        }
        let body = StatusResponse {
            status: "error".to_string(),
            message: Some(self.0.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to(SCREEN_PATH) }))
        .route(SCREEN_PATH, get(serve_screen))
        .route("/admin/api/categories", get(get_screen_model))
        .route(CSV_PATH, get(export_csv))
        .route(
            "/admin/api/categories/:id",
            get(get_category).delete(delete_category),
        )
        .with_state(state)
}

pub async fn run(config: AdminConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let client = CatalogClient::new(&config.upstream, config.timeout())?;
    let state = Arc::new(AppState::new(client)?);
    let app = build_router(state);

    let listener = TcpListener::bind(config.listen).await?;
    log::info!(
        "Listening on http://{} (catalog api at {})",
        listener.local_addr()?,
        config.upstream
    );
    axum::serve(listener, app).await?;

    Ok(())
}

// Fetch errors are shown inline instead of failing the request.
async fn screen_model(state: &AppState, query: ListingQuery, expanded: HashSet<i64>) -> ScreenModel {
    let mut expanded_ids: Vec<i64> = expanded.iter().copied().collect();
    expanded_ids.sort_unstable();

    let (page, orphans, hidden, error) = match state.client.list_categories().await {
        Ok(rows) => {
            let listing = CategoryListing::new(&rows);
            let forest = listing.forest();
            let orphans = forest.orphans.clone();
            let hidden = forest.hidden_count();
            (listing.view(&expanded, &query), orphans, hidden, None)
        }
        Err(e) => {
            log::warn!("failed to load categories: {}", e);
            (
                paginate::<CategoryRowView>(&[], query.page, PAGE_SIZE),
                Vec::new(),
                0,
                Some(format!("Failed to load categories: {}", e)),
            )
        }
    };

    ScreenModel {
        search: query.search,
        status: query.status.to_string(),
        expanded: expanded_ids,
        page,
        orphans,
        hidden,
        error,
    }
}

async fn get_screen_model(
    Query(params): Query<ScreenParams>,
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<ScreenModel>, ApiError> {
    let (query, expanded) = params.parse()?;
    Ok(Json(screen_model(&state, query, expanded).await))
}

#[derive(Serialize)]
struct ScreenRow {
    #[serde(flatten)]
    row: CategoryRowView,
    indent: usize,
    toggle_href: Option<String>,
}

#[derive(Serialize)]
struct ScreenPage {
    #[serde(flatten)]
    model: ScreenModel,
    rows: Vec<ScreenRow>,
    expanded_param: String,
    export_href: String,
    prev_href: Option<String>,
    next_href: Option<String>,
    status_all: bool,
    status_active: bool,
    status_inactive: bool,
}

/// Link back to the screen with the given query and expansion set.
pub fn screen_href(query: &ListingQuery, expanded: &HashSet<i64>) -> String {
    href_with(SCREEN_PATH, query, expanded)
}

fn href_with(path: &str, query: &ListingQuery, expanded: &HashSet<i64>) -> String {
    let mut href = format!(
        "{}?page={}&status={}&expanded={}",
        path,
        query.page,
        query.status,
        join_ids(expanded)
    );
    if !query.search.trim().is_empty() {
        href.push_str("&search=");
        href.push_str(&urlencoding::encode(&query.search));
    }
    href
}

fn join_ids(ids: &HashSet<i64>) -> String {
    let mut ids: Vec<i64> = ids.iter().copied().collect();
    ids.sort_unstable();
    ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",")
}

async fn serve_screen(
    Query(params): Query<ScreenParams>,
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Html<String>, ApiError> {
    let (query, expanded) = params.parse()?;
    let model = screen_model(&state, query.clone(), expanded.clone()).await;

    let rows = model
        .page
        .items
        .iter()
        .map(|row| {
            let toggle_href = row.has_children.then(|| {
                let mut toggled = expanded.clone();
                if !toggled.remove(&row.id) {
                    toggled.insert(row.id);
                }
                screen_href(&query, &toggled)
            });
            ScreenRow {
                row: row.clone(),
                indent: row.level * 20,
                toggle_href,
            }
        })
        .collect();

    let with_page = |page: usize| {
        screen_href(
            &ListingQuery {
                page,
                ..query.clone()
            },
            &expanded,
        )
    };
    let prev_href = (query.page > 1).then(|| with_page(query.page - 1));
    let next_href = (query.page < model.page.total_pages).then(|| with_page(query.page + 1));

    let page = ScreenPage {
        expanded_param: join_ids(&expanded),
        export_href: href_with(CSV_PATH, &query, &expanded),
        status_all: query.status == StatusFilter::All,
        status_active: query.status == StatusFilter::Active,
        status_inactive: query.status == StatusFilter::Inactive,
        rows,
        prev_href,
        next_href,
        model,
    };

    let html = state
        .templates
        .render(SCREEN_TEMPLATE, &page)
        .map_err(|e| CatalogError::Template(e.to_string()))?;
    Ok(Html(html))
}

async fn export_csv(
    Query(params): Query<ScreenParams>,
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Response, ApiError> {
    let (query, expanded) = params.parse()?;
    let rows = state.client.list_categories().await?;
    let listing = CategoryListing::new(&rows);
    let csv = downloader::to_csv(&listing.visible(&expanded, &query));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"categories.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

async fn get_category(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    Ok(Json(state.client.get_category(id).await?))
}

async fn delete_category(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> std::result::Result<StatusCode, ApiError> {
    state.client.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_default_to_first_page() {
        let (query, expanded) = ScreenParams::default().parse().unwrap();
        assert_eq!(query, ListingQuery::default());
        assert!(expanded.is_empty());
    }

    #[test]
    fn params_reject_bad_values() {
        let params = ScreenParams {
            page: Some("two".to_string()),
            ..ScreenParams::default()
        };
        assert!(matches!(params.parse(), Err(CatalogError::InvalidQuery(_))));

        let params = ScreenParams {
            status: Some("archived".to_string()),
            ..ScreenParams::default()
        };
        assert!(matches!(params.parse(), Err(CatalogError::InvalidStatus(_))));
    }

    #[test]
    fn href_encodes_search_and_sorts_ids() {
        let query = ListingQuery {
            search: "shoes & bags".to_string(),
            status: StatusFilter::Active,
            page: 2,
        };
        let expanded: HashSet<i64> = [9, 3].into_iter().collect();
        assert_eq!(
            screen_href(&query, &expanded),
            "/admin/catalog/categories?page=2&status=active&expanded=3,9&search=shoes%20%26%20bags"
        );
    }

    #[test]
    fn template_compiles() {
        let client = CatalogClient::new("http://127.0.0.1:1", std::time::Duration::from_secs(1))
            .unwrap();
        assert!(AppState::new(client).is_ok());
    }
}
