//! Registration, login and request authentication flows

use tracing::{error, info, warn};

use crate::error::AuthError;
use crate::jwt::TokenService;
use crate::models::{NewUser, Registration, User};
use crate::password::PasswordService;
use crate::repositories::UserRepository;
use crate::validation::{validate_email, validate_password, validate_username};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    passwords: PasswordService,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(users: UserRepository, passwords: PasswordService, tokens: TokenService) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register a new account
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        info!(
            "Registration attempt for username '{}' ({})",
            registration.username, registration.email
        );

        validate_username(&registration.username).map_err(AuthError::Validation)?;
        validate_email(&registration.email).map_err(AuthError::Validation)?;
        validate_password(&registration.password).map_err(AuthError::Validation)?;

        if self
            .users
            .find_by_username(&registration.username)
            .await?
            .is_some()
        {
            warn!("Username '{}' already exists", registration.username);
            return Err(AuthError::DuplicateUsername);
        }

        if self
            .users
            .find_by_email(&registration.email)
            .await?
            .is_some()
        {
            warn!("Email '{}' already exists", registration.email);
            return Err(AuthError::DuplicateEmail);
        }

        let hashed_password = self.hash_password(registration.password).await?;

        self.users
            .create(&NewUser {
                username: registration.username,
                email: registration.email,
                hashed_password,
            })
            .await
    }

    /// Check credentials and issue a login token
    ///
    /// An exact username match wins; otherwise a case-insensitive match is
    /// accepted. The token subject is always the stored username.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        info!("Login attempt for username: {}", username);

        let user = match self.users.find_by_username(username).await? {
            Some(user) => Some(user),
            None => {
                let user = self.users.find_by_username_ignore_case(username).await?;
                if let Some(user) = &user {
                    info!(
                        "Matched '{}' to stored username '{}' ignoring case",
                        username, user.username
                    );
                }
                user
            }
        };

        let Some(user) = user else {
            warn!("Login failed: no user named '{}'", username);
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .verify_password(password.to_string(), user.hashed_password.clone())
            .await?
        {
            warn!("Login failed: wrong password for '{}'", user.username);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(&user.username, Some(self.tokens.access_token_expiry()))
            .map_err(|e| {
                error!("Failed to issue token for '{}': {}", user.username, e);
                AuthError::Internal(e.to_string())
            })?;

        info!("Authentication successful for user: {}", user.username);
        Ok(token)
    }

    /// Resolve a bearer token to its user
    ///
    /// Every failure collapses into [`AuthError::Unauthenticated`]; the
    /// precise reason only goes to the log.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let subject = self.tokens.verify(token).map_err(|e| {
            warn!("Token rejected: {}", e);
            AuthError::Unauthenticated
        })?;

        match self.users.find_by_username(&subject).await? {
            Some(user) => Ok(user),
            None => {
                warn!("Token subject '{}' does not match any user", subject);
                Err(AuthError::Unauthenticated)
            }
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let passwords = self.passwords.clone();
        tokio::task::spawn_blocking(move || passwords.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .map_err(|e| {
                error!("Failed to hash password: {}", e);
                AuthError::Internal(e.to_string())
            })
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, AuthError> {
        let passwords = self.passwords.clone();
        tokio::task::spawn_blocking(move || passwords.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))
    }
}
