use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::object::{CreateRequest, DynamicObject, ObjectType, UpdateRequest};
use crate::server::AppState;
use crate::service::ObjectService;
use crate::storage::DbStats;
use crate::{Error, ErrorKind};

/// Uniform response envelope
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseViewModel<T> {
    pub is_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ResponseViewModel<T> {
    fn ok(message: &str, data: T) -> Json<Self> {
        Json(Self {
            is_success: true,
            message: Some(message.to_string()),
            error_message: None,
            data: Some(data),
        })
    }
}

#[derive(Serialize)]
pub struct CreatedObject {
    pub id: i64,
}

#[derive(Serialize)]
pub struct UpdatedObject {
    pub id: i64,
    pub fields: usize,
}

#[derive(Serialize)]
pub struct DeletedObject {
    pub id: i64,
    pub cascaded: usize,
}

/// An error on its way out as an HTTP response
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::SchemaEvolution | ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ResponseViewModel::<()> {
            is_success: false,
            message: None,
            error_message: Some(self.message),
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ResponseViewModel<T>>, ApiError>;

/// Run a store call off the async workers
async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&ObjectService) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state.service))
        .await
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("Worker failed: {}", e),
        })?
        .map_err(ApiError::from)
}

pub async fn create_object(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRequest>,
) -> ApiResult<CreatedObject> {
    let tree = request.into_tree();
    let id = blocking(&state, move |service| service.create(&tree)).await?;
    Ok(ResponseViewModel::ok(
        "Dynamic object type created and data inserted successfully.",
        CreatedObject { id },
    ))
}

pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path((object_type, id)): Path<(String, i64)>,
) -> ApiResult<DynamicObject> {
    let object = blocking(&state, move |service| service.get(&object_type, id)).await?;
    Ok(ResponseViewModel::ok("Object found successfully.", object))
}

pub async fn update_object(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateRequest>,
) -> ApiResult<UpdatedObject> {
    let fields = request.fields.len();
    blocking(&state, move |service| service.update(id, &request.fields)).await?;
    Ok(ResponseViewModel::ok("Object updated successfully.", UpdatedObject { id, fields }))
}

pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<DeletedObject> {
    let cascaded = blocking(&state, move |service| service.delete(id)).await?;
    Ok(ResponseViewModel::ok("Object deleted successfully.", DeletedObject { id, cascaded }))
}

pub async fn list_types(State(state): State<Arc<AppState>>) -> ApiResult<Vec<ObjectType>> {
    let types = blocking(&state, |service| service.list_types()).await?;
    Ok(ResponseViewModel::ok("Types listed.", types))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<DbStats> {
    let stats = blocking(&state, |service| service.stats()).await?;
    Ok(ResponseViewModel::ok("Statistics collected.", stats))
}
