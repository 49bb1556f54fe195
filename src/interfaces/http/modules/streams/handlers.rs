//! Stream management handlers (unary gateway calls)

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use super::dto::{
    CreateStreamRequest, DataEventDto, DeleteStreamResponse, ListStreamsParams, PageDto,
    PageParams, StreamDto, UpdateStreamRequest,
};
use crate::interfaces::gateway::StreamGateway;
use crate::interfaces::http::common::{ApiError, ApiResponse, ApiResult, ValidatedJson};

#[derive(Clone)]
pub struct StreamsState {
    pub gateway: Arc<StreamGateway>,
}

#[utoipa::path(
    post,
    path = "/api/v1/streams",
    tag = "Streams",
    request_body = CreateStreamRequest,
    responses(
        (status = 201, description = "Stream created in DRAFT status", body = ApiResponse<StreamDto>),
        (status = 400, description = "Invalid owner id or stream type"),
        (status = 409, description = "A stream with this name already exists"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_stream(
    State(state): State<StreamsState>,
    ValidatedJson(request): ValidatedJson<CreateStreamRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StreamDto>>), ApiError> {
    let view = state.gateway.create_stream(request.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(StreamDto::from(view))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/streams",
    tag = "Streams",
    params(ListStreamsParams),
    responses(
        (status = 200, description = "Page of streams", body = ApiResponse<PageDto<StreamDto>>),
        (status = 400, description = "Invalid filter value")
    )
)]
pub async fn list_streams(
    State(state): State<StreamsState>,
    Query(params): Query<ListStreamsParams>,
) -> ApiResult<PageDto<StreamDto>> {
    let page = state.gateway.list_streams(params.into()).await?;
    Ok(Json(ApiResponse::success(PageDto::from_page(
        page,
        StreamDto::from,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/v1/streams/{id}",
    tag = "Streams",
    params(("id" = String, Path, description = "Stream id")),
    responses(
        (status = 200, description = "Stream details", body = ApiResponse<StreamDto>),
        (status = 404, description = "Stream not found")
    )
)]
pub async fn get_stream(
    State(state): State<StreamsState>,
    Path(id): Path<String>,
) -> ApiResult<StreamDto> {
    let view = state.gateway.get_stream(&id).await?;
    Ok(Json(ApiResponse::success(view.into())))
}

#[utoipa::path(
    patch,
    path = "/api/v1/streams/{id}",
    tag = "Streams",
    params(("id" = String, Path, description = "Stream id")),
    request_body = UpdateStreamRequest,
    responses(
        (status = 200, description = "Updated stream", body = ApiResponse<StreamDto>),
        (status = 404, description = "Stream not found"),
        (status = 409, description = "Name already taken"),
        (status = 412, description = "Status transition not allowed")
    )
)]
pub async fn update_stream(
    State(state): State<StreamsState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateStreamRequest>,
) -> ApiResult<StreamDto> {
    let view = state.gateway.update_stream(request.into_command(id)).await?;
    Ok(Json(ApiResponse::success(view.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/streams/{id}",
    tag = "Streams",
    params(("id" = String, Path, description = "Stream id")),
    responses(
        (status = 200, description = "Stream soft-deleted", body = ApiResponse<DeleteStreamResponse>),
        (status = 404, description = "Stream not found"),
        (status = 412, description = "Stream already deleted")
    )
)]
pub async fn delete_stream(
    State(state): State<StreamsState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteStreamResponse> {
    let result = state.gateway.delete_stream(&id).await?;
    Ok(Json(ApiResponse::success(result.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/streams/{id}/events",
    tag = "Streams",
    params(("id" = String, Path, description = "Stream id"), PageParams),
    responses(
        (status = 200, description = "Stored events, newest first", body = ApiResponse<PageDto<DataEventDto>>),
        (status = 404, description = "Stream not found")
    )
)]
pub async fn list_events(
    State(state): State<StreamsState>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<PageDto<DataEventDto>> {
    let page = state
        .gateway
        .events()
        .list_for_stream(&id, params.page, params.size)
        .await?;
    Ok(Json(ApiResponse::success(PageDto::from_page(page, |e| {
        DataEventDto::from(&e)
    }))))
}
