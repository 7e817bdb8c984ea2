use axum::{extract::FromRequest, Json};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, media::UploadItem, users::repo_types::PublicUser};

/// `Json` whose rejection renders as the standard error envelope.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Registration input, assembled from the multipart form.
pub struct RegisterInput {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub avatar: Option<UploadItem>,
    pub cover_image: Option<UploadItem>,
}

/// Request body for login; either identifier may be given.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[serde(alias = "fullname")]
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_pair_is_camel_case() {
        let json = serde_json::to_value(TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
        })
        .unwrap();
        assert_eq!(json["accessToken"], "a");
        assert_eq!(json["refreshToken"], "r");
    }

    #[test]
    fn update_account_accepts_both_spellings() {
        let a: UpdateAccountRequest =
            serde_json::from_str(r#"{"fullName":"Ann A","email":"a@x.com"}"#).unwrap();
        let b: UpdateAccountRequest =
            serde_json::from_str(r#"{"fullname":"Ann A","email":"a@x.com"}"#).unwrap();
        assert_eq!(a.full_name.as_deref(), Some("Ann A"));
        assert_eq!(b.full_name.as_deref(), Some("Ann A"));
    }
}
