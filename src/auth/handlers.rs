use std::collections::HashMap;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Router,
};
use tracing::{debug, instrument};

use crate::{
    auth::{
        cookies::{self, clear_session_cookies, session_cookies},
        dto::{
            ApiJson, ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest,
            RegisterInput, TokenPair, UpdateAccountRequest,
        },
        extractors::AuthUser,
        services,
    },
    error::ApiError,
    media::{MediaKind, UploadItem},
    response::{ApiResponse, Empty},
    state::AppState,
    users::repo_types::PublicUser,
};

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
        .route("/changePassword", post(change_password))
        .route("/current-user", get(current_user))
        .route("/update_account", patch(update_account))
}

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/avatar", patch(update_avatar))
        .route("/cover-image", patch(update_cover_image))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

/// Text fields and single files from a multipart body.
#[derive(Default)]
struct Form {
    text: HashMap<String, String>,
    files: HashMap<String, UploadItem>,
}

impl Form {
    async fn read(mut mp: Multipart) -> Result<Self, ApiError> {
        let mut form = Form::default();
        while let Some(field) = mp.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if field.file_name().is_some() {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let body = field.bytes().await?;
                // browsers send an empty part when no file was picked
                if body.is_empty() {
                    continue;
                }
                form.files
                    .entry(name)
                    .or_insert(UploadItem { body, content_type });
            } else {
                form.text.insert(name, field.text().await?);
            }
        }
        debug!(
            text = form.text.len(),
            files = form.files.len(),
            "multipart form read"
        );
        Ok(form)
    }

    fn text(&mut self, names: &[&str]) -> String {
        names
            .iter()
            .find_map(|n| self.text.remove(*n))
            .unwrap_or_default()
    }

    fn file(&mut self, kind: MediaKind) -> Option<UploadItem> {
        self.files.remove(kind.field())
    }
}

#[instrument(skip(state, mp))]
pub async fn register(
    State(state): State<AppState>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let mut form = Form::read(mp?).await?;
    let input = RegisterInput {
        full_name: form.text(&["fullName", "fullname"]),
        email: form.text(&["email"]),
        username: form.text(&["username"]),
        password: form.text(&["password"]),
        avatar: form.file(MediaKind::Avatar),
        cover_image: form.file(MediaKind::CoverImage),
    };
    let user = services::register(&state, input).await?;
    Ok(ApiResponse::new(
        StatusCode::CREATED,
        user,
        "User registered successfully",
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<(HeaderMap, ApiResponse<LoginResponse>), ApiError> {
    let (user, pair) = services::login(&state, payload).await?;
    let headers = session_cookies(&pair, state.keys.access_ttl(), state.keys.refresh_ttl());
    Ok((
        headers,
        ApiResponse::ok(
            LoginResponse {
                user,
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<(HeaderMap, ApiResponse<Empty>), ApiError> {
    services::logout(&state, user_id).await?;
    Ok((
        clear_session_cookies(),
        ApiResponse::ok(Empty {}, "User logged out"),
    ))
}

/// Token comes from the `refreshToken` cookie, else the JSON body.
#[instrument(skip(state, headers, body))]
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<ApiJson<RefreshRequest>>,
) -> Result<(HeaderMap, ApiResponse<TokenPair>), ApiError> {
    let incoming = cookies::read_cookie(&headers, cookies::REFRESH_COOKIE)
        .map(str::to_string)
        .or_else(|| body.and_then(|ApiJson(b)| b.refresh_token));

    let pair = services::refresh(&state, incoming).await?;
    let headers = session_cookies(&pair, state.keys.access_ttl(), state.keys.refresh_ttl());
    Ok((headers, ApiResponse::ok(pair, "Access token refreshed")))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<ApiResponse<Empty>, ApiError> {
    services::change_password(&state, user_id, payload).await?;
    Ok(ApiResponse::ok(Empty {}, "Password changed successfully"))
}

#[instrument(skip(state))]
pub async fn current_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let user = services::current_user(&state, user_id).await?;
    Ok(ApiResponse::ok(user, "Current user fetched successfully"))
}

#[instrument(skip(state, payload))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<UpdateAccountRequest>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let user = services::update_account(&state, user_id, payload).await?;
    Ok(ApiResponse::ok(user, "Account details updated successfully"))
}

async fn update_media(
    state: &AppState,
    user_id: uuid::Uuid,
    kind: MediaKind,
    mp: Multipart,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    let mut form = Form::read(mp).await?;
    let user = services::update_media(state, user_id, kind, form.file(kind)).await?;
    Ok(ApiResponse::ok(
        user,
        format!("{} updated successfully", kind.label()),
    ))
}

#[instrument(skip(state, mp))]
pub async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    update_media(&state, user_id, MediaKind::Avatar, mp?).await
}

#[instrument(skip(state, mp))]
pub async fn update_cover_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<PublicUser>, ApiError> {
    update_media(&state, user_id, MediaKind::CoverImage, mp?).await
}
