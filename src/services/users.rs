//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::{AuthConfig, BootstrapConfig},
    error::{AppError, AppResult},
    models::{
        borrow::BorrowDetails,
        user::{RegisterUser, Role, TokenType, User, UserClaims, UserQuery},
    },
    repository::Repository,
};

/// Tokens handed out at login
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new member. The account stays inactive until an admin approves it.
    pub async fn register(&self, request: RegisterUser) -> AppResult<User> {
        request.validate()?;

        if self.repository.users.username_exists(&request.username).await?
            || self.repository.users.email_exists(&request.email).await?
        {
            return Err(AppError::Conflict(
                "User with provided username or email already exists".to_string(),
            ));
        }

        let password = hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(&request.username, &request.email, &password, Role::Member, false)
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered, awaiting approval");
        Ok(user)
    }

    /// Authenticate by username or email and issue an access/refresh token pair
    pub async fn login(&self, identifier: &str, password: &str) -> AppResult<(TokenPair, User)> {
        let user = self
            .repository
            .users
            .get_by_identifier(identifier)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

        if !verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid credentials".to_string()));
        }

        if !user.is_active {
            return Err(AppError::Authentication("Account is awaiting approval".to_string()));
        }

        let tokens = TokenPair {
            access: self.issue(&user, TokenType::Access)?,
            refresh: self.issue(&user, TokenType::Refresh)?,
        };

        self.repository.users.touch_last_login(user.id).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok((tokens, user))
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<String> {
        let claims = UserClaims::from_token(refresh_token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        if claims.token_type != TokenType::Refresh {
            return Err(AppError::Authentication("Not a refresh token".to_string()));
        }

        // Role or activation may have changed since the refresh token was issued
        let user = self
            .repository
            .users
            .get_by_id(claims.user_id())
            .await
            .map_err(|_| AppError::Authentication("User no longer exists".to_string()))?;

        if !user.is_active {
            return Err(AppError::Authentication("Account is not active".to_string()));
        }

        self.issue(&user, TokenType::Access)
    }

    /// Re-read the token's user so role changes and deactivation apply at once
    pub async fn current_claims(&self, mut claims: UserClaims) -> AppResult<UserClaims> {
        let user = match self.repository.users.get_by_id(claims.user_id()).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Authentication("User no longer exists".to_string()))
            }
            Err(e) => return Err(e),
        };

        if !user.is_active {
            return Err(AppError::Authentication("Account is not active".to_string()));
        }

        claims.role = user.role;
        claims.username = user.username;
        Ok(claims)
    }

    fn issue(&self, user: &User, token_type: TokenType) -> AppResult<String> {
        let lifetime = match token_type {
            TokenType::Access => Duration::minutes(self.config.access_token_minutes),
            TokenType::Refresh => Duration::days(self.config.refresh_token_days),
        };

        UserClaims::new(user, token_type, lifetime)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Search users
    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.search(query).await
    }

    /// Activate a registered account (idempotent)
    pub async fn approve_user(&self, id: Uuid) -> AppResult<User> {
        let user = self.repository.users.activate(id).await?;
        tracing::info!(user_id = %user.id, "User approved");
        Ok(user)
    }

    /// Change a user's role
    pub async fn update_role(&self, id: Uuid, role: Role) -> AppResult<User> {
        let user = self.repository.users.update_role(id, role).await?;
        tracing::info!(user_id = %user.id, role = %role, "User role updated");
        Ok(user)
    }

    /// Borrow history of a user, optionally for one book
    pub async fn borrow_history(&self, id: Uuid, book_id: Option<Uuid>) -> AppResult<Vec<BorrowDetails>> {
        self.repository.users.get_by_id(id).await?;
        self.repository.borrows.list_for_user(id, book_id).await
    }

    /// Create the configured administrator if it does not exist yet
    pub async fn ensure_admin(&self, bootstrap: &BootstrapConfig) -> AppResult<()> {
        let (Some(username), Some(password)) = (&bootstrap.admin_username, &bootstrap.admin_password) else {
            return Ok(());
        };

        if self.repository.users.username_exists(username).await? {
            return Ok(());
        }

        let email = bootstrap
            .admin_email
            .clone()
            .unwrap_or_else(|| format!("{}@localhost", username));

        let hash = hash_password(password)?;
        let admin = self
            .repository
            .users
            .create(username, &email, &hash, Role::Admin, true)
            .await?;

        tracing::info!(user_id = %admin.id, username = %admin.username, "Bootstrap administrator created");
        Ok(())
    }
}

/// Verify user password
fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}
