use crate::adapters::database::DbPool;
use crate::adapters::database::refresh_token_repo::RefreshTokenRepository;
use crate::adapters::database::user_repo::UserRepository;
use crate::config::AuthConfig;
use crate::domain::auth::{Claims, OpaqueToken, Password};
use crate::domain::auth_session::{AuthSession, LoginOutcome};
use crate::error::{AppError, Result};
use opentelemetry::{global, metrics::Counter};
use sqlx::SqliteConnection;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Metrics {
    login_total: Counter<u64>,
    refresh_total: Counter<u64>,
    refresh_rejected_total: Counter<u64>,
    logout_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("herdbook");
        Self {
            login_total: meter
                .u64_counter("auth_login_total")
                .with_description("Total number of successful login attempts")
                .build(),
            refresh_total: meter
                .u64_counter("auth_refresh_total")
                .with_description("Total number of successful token rotations")
                .build(),
            refresh_rejected_total: meter
                .u64_counter("auth_refresh_rejected_total")
                .with_description("Refresh attempts with an unknown, reused or expired token")
                .build(),
            logout_total: meter
                .u64_counter("auth_logout_total")
                .with_description("Total number of successful logout attempts")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthService {
    config: AuthConfig,
    pool: DbPool,
    user_repo: UserRepository,
    refresh_repo: RefreshTokenRepository,
    metrics: Metrics,
}

impl AuthService {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        pool: DbPool,
        user_repo: UserRepository,
        refresh_repo: RefreshTokenRepository,
    ) -> Self {
        Self { config, pool, user_repo, refresh_repo, metrics: Metrics::new() }
    }

    /// Verifies credentials and opens a new session.
    ///
    /// # Errors
    /// Returns `AppError::AuthError` for an unknown user or wrong password.
    #[tracing::instrument(
        skip(self, username, password),
        fields(user_id = tracing::field::Empty),
        err(level = "warn")
    )]
    pub async fn login(&self, username: String, password: String) -> Result<LoginOutcome> {
        let mut conn = self.pool.acquire().await?;
        let Some(user) = self.user_repo.find_by_username(&mut conn, username.trim()).await? else {
            tracing::warn!("Login failed: user not found");
            return Err(AppError::AuthError);
        };

        tracing::Span::current().record("user_id", tracing::field::display(user.id));

        if !self.verify_password(&password, &user.password_hash).await? {
            tracing::warn!("Login failed: invalid password");
            return Err(AppError::AuthError);
        }

        let session = self.create_session(&mut conn, user.id).await?;
        self.metrics.login_total.add(1, &[]);
        Ok(LoginOutcome { user, session })
    }

    /// # Errors
    /// Returns `AppError::Internal` if hashing fails or the blocking task panics.
    #[tracing::instrument(err, skip(self, password))]
    pub async fn hash_password(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || Password::hash(&password)).await.map_err(|_| AppError::Internal)?
    }

    /// # Errors
    /// Returns `AppError::Internal` if the stored hash is malformed or the blocking task panics.
    #[tracing::instrument(err, skip(self, password, password_hash))]
    pub async fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool> {
        let password = password.to_string();
        let password_hash = password_hash.to_string();
        tokio::task::spawn_blocking(move || Password::verify(&password, &password_hash))
            .await
            .map_err(|_| AppError::Internal)?
    }

    /// Issues an access token and persists a new refresh token for the user.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the refresh token cannot be stored.
    #[tracing::instrument(err, skip(self, conn), fields(user_id = %user_id))]
    pub(crate) async fn create_session(&self, conn: &mut SqliteConnection, user_id: Uuid) -> Result<AuthSession> {
        let claims = Claims::new(user_id, self.config.access_token_ttl_secs);
        let access_token = claims.encode(&self.config.jwt_secret)?;

        let refresh_token = OpaqueToken::generate();
        let refresh_hash = OpaqueToken::hash(&refresh_token);
        self.refresh_repo.create(conn, user_id, &refresh_hash, self.config.refresh_token_ttl_days).await?;

        Ok(AuthSession { access_token, refresh_token, expires_at: claims.exp })
    }

    /// Exchanges a refresh token for a new token pair.
    ///
    /// The presented token is consumed and its replacement stored in one
    /// transaction, so every refresh token is single-use: replaying a rotated
    /// token is rejected exactly like an unknown one.
    ///
    /// # Errors
    /// Returns `AppError::AuthError` if the token is unknown, already used or expired.
    #[tracing::instrument(err(level = "warn"), skip(self, refresh_token), fields(user_id = tracing::field::Empty))]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession> {
        let old_hash = OpaqueToken::hash(refresh_token);
        let mut tx = self.pool.begin().await?;

        let Some(stored) = self.refresh_repo.consume(&mut tx, &old_hash).await? else {
            self.metrics.refresh_rejected_total.add(1, &[]);
            return Err(AppError::AuthError);
        };

        if stored.is_expired() {
            // Keep the deletion of the stale row.
            tx.commit().await?;
            self.metrics.refresh_rejected_total.add(1, &[]);
            tracing::debug!("Refresh token expired");
            return Err(AppError::AuthError);
        }

        tracing::Span::current().record("user_id", tracing::field::display(stored.user_id));

        let session = self.create_session(&mut tx, stored.user_id).await?;
        tx.commit().await?;

        tracing::info!("Tokens rotated successfully");
        self.metrics.refresh_total.add(1, &[]);
        Ok(session)
    }

    /// Revokes a refresh token. Unknown tokens are accepted silently so logout is idempotent.
    ///
    /// # Errors
    /// Returns `AppError::Database` if the deletion fails.
    #[tracing::instrument(err, skip(self, refresh_token))]
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let revoked = self.refresh_repo.delete(&mut conn, &OpaqueToken::hash(refresh_token)).await?;
        if revoked {
            self.metrics.logout_total.add(1, &[]);
        }
        Ok(())
    }

    /// Verifies a JWT access token and returns the user ID (subject).
    ///
    /// # Errors
    /// Returns `AppError::AuthError` if the token is invalid or expired.
    pub fn verify_token(&self, token: &str) -> Result<Uuid> {
        Claims::decode(token, &self.config.jwt_secret).map(|claims| claims.sub)
    }
}
