use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use facmap_core::{parse_facility_id, Facility, FuzzyMatch, MapObject, TagField};
use facmap_search::SearchError;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::params::{parse_paging, parse_selection};
use super::{map_search_error, ApiError, AppState};

type Pairs = Query<Vec<(String, String)>>;

#[derive(Debug, Serialize)]
pub(super) struct ObjectsResponse<T> {
    pub objects: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FuzzyParams {
    pub input: Option<String>,
}

pub(super) async fn map_query(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(pairs): Pairs,
) -> Result<Json<ObjectsResponse<MapObject>>, ApiError> {
    let fail = |e: SearchError| map_search_error(&req_id.0, e);

    let selection = parse_selection(&pairs).map_err(|e| fail(e.into()))?;
    let objects = state.service.map_query(&selection).await.map_err(fail)?;

    Ok(Json(ObjectsResponse { objects }))
}

pub(super) async fn full_search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(pairs): Pairs,
) -> Result<Json<ObjectsResponse<Facility>>, ApiError> {
    let fail = |e: SearchError| map_search_error(&req_id.0, e);

    let selection = parse_selection(&pairs).map_err(|e| fail(e.into()))?;
    let (order, page) = parse_paging(&pairs).map_err(|e| fail(e.into()))?;
    let objects = state
        .service
        .full_search(&selection, order, page)
        .await
        .map_err(fail)?;

    Ok(Json(ObjectsResponse { objects }))
}

pub(super) async fn fuzzy_search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<FuzzyParams>,
) -> Result<Json<Vec<FuzzyMatch>>, ApiError> {
    let hits = state
        .service
        .fuzzy_search(params.input.as_deref().unwrap_or_default())
        .await
        .map_err(|e| map_search_error(&req_id.0, e))?;

    Ok(Json(hits))
}

async fn distinct(
    state: &AppState,
    req_id: &RequestId,
    field: TagField,
) -> Result<Json<Vec<String>>, ApiError> {
    let values = state
        .service
        .distinct_values(field)
        .await
        .map_err(|e| map_search_error(&req_id.0, e))?;

    Ok(Json(values.to_vec()))
}

pub(super) async fn service_types(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<Vec<String>>, ApiError> {
    distinct(&state, &req_id, TagField::ServiceTypes).await
}

pub(super) async fn filters(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<Vec<String>>, ApiError> {
    distinct(&state, &req_id, TagField::Filters).await
}

pub(super) async fn cards(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<Vec<String>>, ApiError> {
    distinct(&state, &req_id, TagField::Cards).await
}

pub(super) async fn get_facility(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(raw_id): Path<String>,
) -> Result<Json<Facility>, ApiError> {
    let fail = |e: SearchError| map_search_error(&req_id.0, e);

    let id = parse_facility_id(&raw_id).map_err(|e| fail(e.into()))?;
    let facility = state.service.get_facility(id).await.map_err(fail)?;

    Ok(Json(facility))
}
