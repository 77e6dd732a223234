use axum::extract::{Extension, Query};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::common::pagination::normalize_limit;
use crate::common::ServiceError;
use crate::domains::cities::models::city::{City, ListCitiesRequest};
use crate::server::app::AppState;
use crate::server::error::ApiResult;

#[derive(Deserialize)]
pub struct ListCitiesQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub cursor: i16,
}

#[derive(Serialize)]
pub struct ListCitiesResponse {
    pub items: Vec<City>,
    pub has_next: bool,
}

pub async fn list_cities_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<ListCitiesQuery>,
) -> ApiResult<Json<ListCitiesResponse>> {
    let req = ListCitiesRequest {
        search: query.search,
        limit: normalize_limit(query.limit)?,
        cursor: query.cursor,
    };

    let page = City::list(&req, state.db.reads())
        .await
        .map_err(ServiceError::Internal)?;

    Ok(Json(ListCitiesResponse {
        items: page.items,
        has_next: page.has_next,
    }))
}
