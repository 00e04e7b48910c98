use crate::adapters::database::DbPool;
use crate::adapters::database::user_repo::UserRepository;
use crate::domain::auth_session::LoginOutcome;
use crate::domain::user::User;
use crate::error::{AppError, Result};
use crate::services::auth_service::AuthService;
use opentelemetry::{global, metrics::Counter};
use uuid::Uuid;

#[derive(Clone, Debug)]
struct AccountMetrics {
    users_registered_total: Counter<u64>,
}

impl AccountMetrics {
    fn new() -> Self {
        let meter = global::meter("herdbook");
        Self {
            users_registered_total: meter
                .u64_counter("users_registered_total")
                .with_description("Total number of successful user registrations")
                .build(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AccountService {
    pool: DbPool,
    user_repo: UserRepository,
    auth_service: AuthService,
    metrics: AccountMetrics,
}

impl AccountService {
    #[must_use]
    pub fn new(pool: DbPool, user_repo: UserRepository, auth_service: AuthService) -> Self {
        Self { pool, user_repo, auth_service, metrics: AccountMetrics::new() }
    }

    /// Creates the account and signs it in.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` for a blank username or password.
    /// Returns `AppError::Conflict` if the username is taken.
    #[tracing::instrument(skip(self, username, password), fields(user_id = tracing::field::Empty), err(level = "warn"))]
    pub async fn register(&self, username: String, password: String) -> Result<LoginOutcome> {
        let username = username.trim().to_string();
        if username.is_empty() || password.is_empty() {
            return Err(AppError::BadRequest("username and password are required".into()));
        }

        let password_hash = self.auth_service.hash_password(&password).await?;

        let mut conn = self.pool.acquire().await?;
        let user = self.user_repo.create(&mut conn, &username, &password_hash).await?;
        tracing::Span::current().record("user_id", tracing::field::display(user.id));

        let session = self.auth_service.create_session(&mut conn, user.id).await?;
        self.metrics.users_registered_total.add(1, &[]);
        tracing::info!("User registered");

        Ok(LoginOutcome { user, session })
    }

    /// # Errors
    /// Returns `AppError::NotFound` if the user no longer exists.
    #[tracing::instrument(skip(self), err)]
    pub async fn profile(&self, user_id: Uuid) -> Result<User> {
        let mut conn = self.pool.acquire().await?;
        self.user_repo.find_by_id(&mut conn, user_id).await?.ok_or(AppError::NotFound)
    }
}
