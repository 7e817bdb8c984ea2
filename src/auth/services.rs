use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{ChangePasswordRequest, LoginRequest, RegisterInput, TokenPair, UpdateAccountRequest},
        jwt::TokenError,
        password::{hash_password, verify_password},
    },
    error::ApiError,
    media::{upload_media, MediaKind, UploadItem},
    state::AppState,
    users::repo_types::{NewUser, PublicUser, User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trimmed, non-empty value or `None`.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn normalized_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }
    Ok(email)
}

#[instrument(skip(st, input), fields(username = %input.username))]
pub async fn register(st: &AppState, input: RegisterInput) -> Result<PublicUser, ApiError> {
    let fields = [
        input.full_name.as_str(),
        input.email.as_str(),
        input.username.as_str(),
        input.password.as_str(),
    ];
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(ApiError::validation("All fields are required"));
    }

    let username = input.username.trim().to_lowercase();
    let email = normalized_email(&input.email)?;

    if st
        .store
        .find_by_login(Some(&username), Some(&email))
        .await?
        .is_some()
    {
        warn!(%username, %email, "username or email already registered");
        return Err(ApiError::Conflict(
            "User with email or username already exists".into(),
        ));
    }

    let avatar_item = input
        .avatar
        .ok_or_else(|| ApiError::validation("Avatar file is required"))?;
    let avatar = upload_media(st.storage.as_ref(), MediaKind::Avatar, avatar_item).await?;
    let cover_image = match input.cover_image {
        Some(item) => Some(upload_media(st.storage.as_ref(), MediaKind::CoverImage, item).await?),
        None => None,
    };

    let password_hash = hash_password(&input.password).await?;
    let created = st
        .store
        .create(NewUser {
            username,
            email,
            full_name: input.full_name.trim().to_string(),
            password_hash,
            avatar,
            cover_image,
        })
        .await?;

    let user = st
        .store
        .find_by_id(created.id)
        .await?
        .ok_or_else(|| ApiError::persistence("Something went wrong while registering user"))?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user.into())
}

/// Sign a new pair and make its refresh token the only live one.
async fn issue_session(st: &AppState, user: &User) -> Result<TokenPair, ApiError> {
    let pair = st.keys.issue(user)?;
    if !st
        .store
        .set_refresh_token(user.id, Some(&pair.refresh_token))
        .await?
    {
        return Err(ApiError::persistence(
            "Something went wrong while generating refresh and access token",
        ));
    }
    Ok(pair)
}

#[instrument(skip(st, req))]
pub async fn login(st: &AppState, req: LoginRequest) -> Result<(PublicUser, TokenPair), ApiError> {
    let username = present(req.username.as_deref()).map(str::to_lowercase);
    let email = present(req.email.as_deref()).map(str::to_lowercase);
    if username.is_none() && email.is_none() {
        return Err(ApiError::validation("username or email is required"));
    }

    let user = st
        .store
        .find_by_login(username.as_deref(), email.as_deref())
        .await?
        .ok_or_else(|| {
            warn!(?username, ?email, "login for unknown user");
            ApiError::not_found("User does not exist")
        })?;

    if !verify_password(&req.password, &user.password_hash).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid user credentials"));
    }

    let pair = issue_session(st, &user).await?;
    info!(user_id = %user.id, "user logged in");
    Ok((user.into(), pair))
}

#[instrument(skip(st))]
pub async fn logout(st: &AppState, user_id: Uuid) -> Result<(), ApiError> {
    let cleared = st.store.set_refresh_token(user_id, None).await?;
    info!(%user_id, cleared, "user logged out");
    Ok(())
}

/// Rotate the session: the presented refresh token must be the stored one,
/// and it is swapped for the new one in a single conditional write.
#[instrument(skip(st, incoming))]
pub async fn refresh(st: &AppState, incoming: Option<String>) -> Result<TokenPair, ApiError> {
    let incoming = present(incoming.as_deref())
        .map(str::to_string)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

    let claims = st.keys.verify_refresh(&incoming).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        ApiError::from(e)
    })?;

    let user = st
        .store
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid refresh token"))?;

    if user.refresh_token.as_deref() != Some(incoming.as_str()) {
        warn!(user_id = %user.id, "superseded refresh token presented");
        return Err(TokenError::Mismatch.into());
    }

    let pair = st.keys.issue(&user)?;
    if !st
        .store
        .swap_refresh_token(user.id, &incoming, &pair.refresh_token)
        .await?
    {
        warn!(user_id = %user.id, "refresh token rotated concurrently");
        return Err(TokenError::Mismatch.into());
    }

    info!(user_id = %user.id, "session refreshed");
    Ok(pair)
}

/// Existing refresh token stays valid after a password change.
#[instrument(skip(st, req))]
pub async fn change_password(
    st: &AppState,
    user_id: Uuid,
    req: ChangePasswordRequest,
) -> Result<(), ApiError> {
    if req.old_password.trim().is_empty() || req.new_password.trim().is_empty() {
        return Err(ApiError::validation("oldPassword and newPassword are required"));
    }

    let user = st
        .store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User does not exist"))?;

    if !verify_password(&req.old_password, &user.password_hash).await? {
        warn!(%user_id, "change password with wrong old password");
        return Err(ApiError::unauthorized("Invalid old password"));
    }

    let hash = hash_password(&req.new_password).await?;
    if !st.store.update_password(user_id, &hash).await? {
        return Err(ApiError::not_found("User does not exist"));
    }
    info!(%user_id, "password changed");
    Ok(())
}

#[instrument(skip(st))]
pub async fn current_user(st: &AppState, user_id: Uuid) -> Result<PublicUser, ApiError> {
    st.store
        .find_by_id(user_id)
        .await?
        .map(PublicUser::from)
        .ok_or_else(|| ApiError::unauthorized("Invalid access token"))
}

#[instrument(skip(st, req))]
pub async fn update_account(
    st: &AppState,
    user_id: Uuid,
    req: UpdateAccountRequest,
) -> Result<PublicUser, ApiError> {
    let (Some(full_name), Some(email)) = (
        present(req.full_name.as_deref()),
        present(req.email.as_deref()),
    ) else {
        return Err(ApiError::validation("All fields are required"));
    };
    let email = normalized_email(email)?;

    let user = st
        .store
        .update_account(user_id, full_name, &email)
        .await?
        .ok_or_else(|| ApiError::not_found("User does not exist"))?;
    info!(%user_id, "account details updated");
    Ok(user.into())
}

/// Upload first, then point the profile at the new object.
#[instrument(skip(st, item))]
pub async fn update_media(
    st: &AppState,
    user_id: Uuid,
    kind: MediaKind,
    item: Option<UploadItem>,
) -> Result<PublicUser, ApiError> {
    let item =
        item.ok_or_else(|| ApiError::validation(format!("{} file is missing", kind.label())))?;
    let url = upload_media(st.storage.as_ref(), kind, item).await?;

    let user = st
        .store
        .update_media(user_id, kind, &url)
        .await?
        .ok_or_else(|| ApiError::not_found("User does not exist"))?;
    info!(%user_id, ?kind, "profile media updated");
    Ok(user.into())
}
