use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database. Not serializable; see [`PublicUser`].
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,              // lowercased, unique
    pub email: String,                 // lowercased, unique
    pub full_name: String,
    pub password_hash: String,         // argon2 PHC string
    pub avatar: String,
    pub cover_image: Option<String>,
    pub refresh_token: Option<String>, // latest issued refresh token, if any
    pub watch_history: Vec<Uuid>,      // video ids, oldest first
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Insert payload for registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar: String,
    pub cover_image: Option<String>,
}

/// The only user shape that leaves the service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub watch_history: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            full_name: u.full_name,
            avatar: u.avatar,
            cover_image: u.cover_image,
            watch_history: u.watch_history,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[cfg(test)]
impl User {
    pub fn sample(username: &str) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{}@x.com", username),
            full_name: format!("{} test", username),
            password_hash: String::new(),
            avatar: format!("https://cdn.test/avatars/{}.png", username),
            cover_image: None,
            refresh_token: Some("secret-refresh".into()),
            watch_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_hides_credentials() {
        let mut user = User::sample("ann");
        user.password_hash = "$argon2id$v=19$hash".into();
        let json = serde_json::to_value(PublicUser::from(user)).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj["username"], "ann");
        assert_eq!(obj["fullName"], "ann test");
        assert!(!obj.contains_key("password"));
        assert!(!obj.contains_key("passwordHash"));
        assert!(!obj.contains_key("refreshToken"));
        assert!(!json.to_string().contains("argon2"));
        assert!(!json.to_string().contains("secret-refresh"));
    }
}
