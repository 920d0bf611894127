use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, FromRef, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use axum_macros::debug_handler;
use utoipa::OpenApi;

use std::sync::Arc;

use crate::{
    dto::{
        AddMemberRequest, CreateGroupRequest, GroupResponse, MemberResponse, RecipientsRequest,
        RecipientsResponse, SendMessageForm, SendMessageResponse,
    },
    mail::Attachment,
    service::{GroupService, SendRequest, SendService, ServiceError},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        create_group,
        list_groups,
        delete_group,
        add_member,
        list_members,
        remove_member,
        preview_recipients,
        send_message
    ),
    components(schemas(
        GroupResponse,
        CreateGroupRequest,
        MemberResponse,
        AddMemberRequest,
        RecipientsRequest,
        RecipientsResponse,
        SendMessageForm,
        SendMessageResponse
    )),
    servers(
        (url = "/rest", description = "Operator API")
    ),
    tags(
        (name = "groups", description = "Recipient groups and their members"),
        (name = "messages", description = "Sending messages to groups")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub groups: Arc<GroupService>,
    pub sender: Arc<SendService>,
}

impl FromRef<AppState> for Arc<GroupService> {
    fn from_ref(state: &AppState) -> Self {
        state.groups.clone()
    }
}

impl FromRef<AppState> for Arc<SendService> {
    fn from_ref(state: &AppState) -> Self {
        state.sender.clone()
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/{id}", delete(delete_group))
        .route("/groups/{id}/members", get(list_members).post(add_member))
        .route("/groups/{id}/members/{member_id}", delete(remove_member))
        .route("/recipients", post(preview_recipients))
        .route("/send", post(send_message))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

fn error_response(e: &ServiceError, action: &str) -> Response {
    tracing::error!("failed to {}: {}", action, e);

    let status = match e {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Store(_) | ServiceError::Mail(_) => StatusCode::BAD_GATEWAY,
    };

    (status, format!("Failed to {action}: {e}")).into_response()
}

#[utoipa::path(
    post,
    path = "/groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created successfully", body = GroupResponse),
        (status = 400, description = "Blank group name"),
        (status = 502, description = "Database error")
    ),
    tag = "groups"
)]
#[debug_handler(state = AppState)]
pub async fn create_group(
    State(service): State<Arc<GroupService>>,
    Json(payload): Json<CreateGroupRequest>,
) -> Response {
    match service.create_group(&payload.name).await {
        Ok(group) => (StatusCode::CREATED, Json(group)).into_response(),
        Err(e) => error_response(&e, "create group"),
    }
}

#[utoipa::path(
    get,
    path = "/groups",
    responses(
        (status = 200, description = "Groups ordered by creation time", body = Vec<GroupResponse>),
        (status = 502, description = "Database error")
    ),
    tag = "groups"
)]
#[debug_handler(state = AppState)]
pub async fn list_groups(State(service): State<Arc<GroupService>>) -> Response {
    match service.list_groups().await {
        Ok(groups) => (StatusCode::OK, Json(groups)).into_response(),
        Err(e) => error_response(&e, "list groups"),
    }
}

#[utoipa::path(
    delete,
    path = "/groups/{id}",
    params(
        ("id" = i64, Path, description = "Group ID")
    ),
    responses(
        (status = 204, description = "Group and its members deleted"),
        (status = 404, description = "Group not found"),
        (status = 502, description = "Database error")
    ),
    tag = "groups"
)]
#[debug_handler(state = AppState)]
pub async fn delete_group(
    State(service): State<Arc<GroupService>>,
    Path(id): Path<i64>,
) -> Response {
    match service.delete_group(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Group not found").into_response(),
        Err(e) => error_response(&e, "delete group"),
    }
}

#[utoipa::path(
    post,
    path = "/groups/{id}/members",
    params(
        ("id" = i64, Path, description = "Group ID")
    ),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added", body = MemberResponse),
        (status = 400, description = "Blank e-mail"),
        (status = 404, description = "Group not found"),
        (status = 502, description = "Database error")
    ),
    tag = "groups"
)]
#[debug_handler(state = AppState)]
pub async fn add_member(
    State(service): State<Arc<GroupService>>,
    Path(id): Path<i64>,
    Json(payload): Json<AddMemberRequest>,
) -> Response {
    match service.add_member(id, &payload.email).await {
        Ok(member) => (StatusCode::CREATED, Json(member)).into_response(),
        Err(e) => error_response(&e, "add member"),
    }
}

#[utoipa::path(
    get,
    path = "/groups/{id}/members",
    params(
        ("id" = i64, Path, description = "Group ID")
    ),
    responses(
        (status = 200, description = "Members ordered by creation time", body = Vec<MemberResponse>),
        (status = 502, description = "Database error")
    ),
    tag = "groups"
)]
#[debug_handler(state = AppState)]
pub async fn list_members(
    State(service): State<Arc<GroupService>>,
    Path(id): Path<i64>,
) -> Response {
    match service.list_members(id).await {
        Ok(members) => (StatusCode::OK, Json(members)).into_response(),
        Err(e) => error_response(&e, "list members"),
    }
}

#[utoipa::path(
    delete,
    path = "/groups/{id}/members/{member_id}",
    params(
        ("id" = i64, Path, description = "Group ID"),
        ("member_id" = i64, Path, description = "Member ID")
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 404, description = "Member not found in this group"),
        (status = 502, description = "Database error")
    ),
    tag = "groups"
)]
#[debug_handler(state = AppState)]
pub async fn remove_member(
    State(service): State<Arc<GroupService>>,
    Path((id, member_id)): Path<(i64, i64)>,
) -> Response {
    match service.remove_member(id, member_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Member not found").into_response(),
        Err(e) => error_response(&e, "remove member"),
    }
}

#[utoipa::path(
    post,
    path = "/recipients",
    request_body = RecipientsRequest,
    responses(
        (status = 200, description = "Resolved recipients", body = RecipientsResponse),
        (status = 404, description = "Unknown group"),
        (status = 502, description = "Database error")
    ),
    tag = "messages"
)]
#[debug_handler(state = AppState)]
pub async fn preview_recipients(
    State(service): State<Arc<GroupService>>,
    Json(payload): Json<RecipientsRequest>,
) -> Response {
    match service.resolve_recipients(&payload.groups).await {
        Ok(recipients) => (StatusCode::OK, Json(RecipientsResponse { recipients })).into_response(),
        Err(e) => error_response(&e, "resolve recipients"),
    }
}

/// Reads the send form. Unknown parts are ignored.
async fn read_send_form(mut multipart: Multipart) -> Result<SendRequest, ServiceError> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        ServiceError::Validation(format!("invalid form data: {e}"))
    };

    let mut request = SendRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "subject" => request.subject = field.text().await.map_err(invalid)?,
            "text" => request.text = Some(field.text().await.map_err(invalid)?),
            "html" => request.html = Some(field.text().await.map_err(invalid)?),
            "groups" => request.groups.push(field.text().await.map_err(invalid)?),
            "attachments" => {
                let filename = field.file_name().unwrap_or_default().trim().to_string();
                let content = field.bytes().await.map_err(invalid)?;
                // Browsers submit an unnamed, empty part for an untouched file input
                if filename.is_empty() && content.is_empty() {
                    continue;
                }
                let filename = if filename.is_empty() {
                    "attachment".to_string()
                } else {
                    filename
                };
                request.attachments.push(Attachment::new(filename, content));
            }
            other => tracing::debug!("Ignoring unknown form field '{}'", other),
        }
    }

    Ok(request)
}

#[utoipa::path(
    post,
    path = "/send",
    request_body(content = SendMessageForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Message sent", body = SendMessageResponse),
        (status = 400, description = "Missing subject, body or recipients"),
        (status = 404, description = "Unknown group"),
        (status = 502, description = "Transport or database failure"),
        (status = 503, description = "No transport configured")
    ),
    tag = "messages"
)]
#[debug_handler(state = AppState)]
pub async fn send_message(
    State(service): State<Arc<SendService>>,
    multipart: Multipart,
) -> Response {
    let request = match read_send_form(multipart).await {
        Ok(request) => request,
        Err(e) => return error_response(&e, "read message form"),
    };

    match service.send(request).await {
        Ok(report) => (
            StatusCode::OK,
            Json(SendMessageResponse {
                recipients: report.recipients,
                transport: report.transport.to_string(),
                message: format!("Email sent to {} recipient(s).", report.recipients),
            }),
        )
            .into_response(),
        Err(e) => error_response(&e, "send message"),
    }
}
