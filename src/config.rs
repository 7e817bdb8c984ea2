#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// S3/MinIO bucket that receives avatars and cover images.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Base URL under which uploaded objects are publicly reachable.
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            access_secret: std::env::var("ACCESS_TOKEN_SECRET")?,
            refresh_secret: std::env::var("REFRESH_TOKEN_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "vidtube".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "vidtube-users".into()),
            access_ttl_minutes: minutes_from_env("ACCESS_TOKEN_EXPIRY_MINUTES", 60),
            refresh_ttl_minutes: minutes_from_env("REFRESH_TOKEN_EXPIRY_MINUTES", 60 * 24 * 14),
        };
        jwt.validate()?;

        let endpoint = std::env::var("MINIO_ENDPOINT")?;
        let bucket = std::env::var("MINIO_BUCKET")?;
        let public_url = std::env::var("MEDIA_PUBLIC_URL")
            .unwrap_or_else(|_| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
        let storage = StorageConfig {
            endpoint,
            bucket,
            access_key: std::env::var("MINIO_ACCESS_KEY")?,
            secret_key: std::env::var("MINIO_SECRET_KEY")?,
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
            public_url,
        };

        Ok(Self {
            database_url,
            jwt,
            storage,
        })
    }
}

impl JwtConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.access_secret.is_empty(), "ACCESS_TOKEN_SECRET is empty");
        anyhow::ensure!(!self.refresh_secret.is_empty(), "REFRESH_TOKEN_SECRET is empty");
        anyhow::ensure!(
            self.access_secret != self.refresh_secret,
            "access and refresh token secrets must differ"
        );
        anyhow::ensure!(
            self.access_ttl_minutes > 0 && self.refresh_ttl_minutes > 0,
            "token expiries must be positive"
        );
        Ok(())
    }
}

fn minutes_from_env(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(access: &str, refresh: &str) -> JwtConfig {
        JwtConfig {
            access_secret: access.into(),
            refresh_secret: refresh.into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            access_ttl_minutes: 15,
            refresh_ttl_minutes: 60,
        }
    }

    #[test]
    fn accepts_distinct_secrets() {
        assert!(jwt("access", "refresh").validate().is_ok());
    }

    #[test]
    fn rejects_shared_secret() {
        let err = jwt("same", "same").validate().unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn rejects_non_positive_ttl() {
        let mut cfg = jwt("a", "b");
        cfg.refresh_ttl_minutes = 0;
        assert!(cfg.validate().is_err());
    }
}
