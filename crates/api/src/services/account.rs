//! Account workflow: registration, login, profile and role management.

use tracing::instrument;

use bookshop_core::{Email, Role};

use crate::db::{self, Store};
use crate::models::{CurrentCustomer, Customer, NewCustomer};
use crate::services::auth::{
    AuthError, TokenService, hash_password, validate_password, verify_password,
};

/// Profile changes requested through `update_account`.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    /// Account to change. Required for admins, optional (and must be the
    /// caller's own) for users.
    pub username: Option<String>,
    pub new_username: Option<String>,
    pub email: Option<String>,
}

/// Account operations against a [`Store`].
pub struct AccountService<'a> {
    store: &'a dyn Store,
    tokens: &'a TokenService,
}

impl<'a> AccountService<'a> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, tokens: &'a TokenService) -> Self {
        Self { store, tokens }
    }

    /// Register a customer.
    ///
    /// A request for the admin role is honoured only while no admin exists.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername`, `InvalidEmail` or `WeakPassword`
    /// for bad input, `AuthError::Conflict` if the username or email is
    /// taken, and `AuthError::AdminAlreadyExists` for a second admin.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        requested_role: Option<&str>,
    ) -> Result<Customer, AuthError> {
        let username = require_username(Some(username))?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        if self.store.customer_by_username(username).await?.is_some() {
            return Err(AuthError::Conflict("username already exists".to_owned()));
        }
        if self.store.customer_by_email(&email).await?.is_some() {
            return Err(AuthError::Conflict("email already exists".to_owned()));
        }

        let role = match Role::normalize(requested_role) {
            Role::Admin if db::admin_exists(self.store).await? => {
                return Err(AuthError::AdminAlreadyExists);
            }
            role => role,
        };

        let customer = self
            .store
            .insert_customer(NewCustomer {
                username: username.to_owned(),
                email,
                password_hash: hash_password(password)?,
                role,
            })
            .await
            .map_err(AuthError::from_write)?;

        tracing::info!(customer_id = %customer.id, role = %customer.role, "Customer registered");
        Ok(customer)
    }

    /// Check credentials and return a `Bearer <token>` string.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown username or a
    /// wrong password.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let customer = self
            .store
            .customer_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &customer.password_hash)?;

        let token = self.tokens.issue(&customer)?;
        tracing::info!(customer_id = %customer.id, "Customer logged in");
        Ok(format!("Bearer {token}"))
    }

    /// Change a username and/or email.
    ///
    /// Admins name the target account; users may only change their own.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` when an admin omits the target,
    /// `AuthError::Forbidden` when a user names someone else,
    /// `AuthError::UserNotFound` for an unknown target and
    /// `AuthError::Conflict` if the new values are taken.
    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    pub async fn update_account(
        &self,
        caller: &CurrentCustomer,
        update: AccountUpdate,
    ) -> Result<Customer, AuthError> {
        let target = match caller.role {
            Role::Admin => {
                let username = require_username(update.username.as_deref())?;
                self.store
                    .customer_by_username(username)
                    .await?
                    .ok_or(AuthError::UserNotFound)?
            }
            Role::User => {
                let own = self
                    .store
                    .customer_by_id(caller.id)
                    .await?
                    .ok_or(AuthError::UserNotFound)?;
                if let Some(named) = update.username.as_deref().map(str::trim)
                    && !named.is_empty()
                    && !own.has_username(named)
                {
                    return Err(AuthError::Forbidden(
                        "You can only update your own account",
                    ));
                }
                own
            }
        };

        let username = match update.new_username.as_deref().map(str::trim) {
            Some(new) if !new.is_empty() => new.to_owned(),
            _ => target.username.clone(),
        };
        let email = match update.email.as_deref().map(str::trim) {
            Some(new) if !new.is_empty() => Email::parse(new)?,
            _ => target.email.clone(),
        };

        if !target.has_username(&username)
            && let Some(other) = self.store.customer_by_username(&username).await?
            && other.id != target.id
        {
            return Err(AuthError::Conflict("username already exists".to_owned()));
        }
        if email != target.email
            && let Some(other) = self.store.customer_by_email(&email).await?
            && other.id != target.id
        {
            return Err(AuthError::Conflict("email already exists".to_owned()));
        }

        let updated = self
            .store
            .update_profile(target.id, &username, &email)
            .await
            .map_err(AuthError::from_write)?;

        tracing::info!(customer_id = %updated.id, "Account updated");
        Ok(updated)
    }

    /// Replace the password of the account registered under `email`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for an unknown email,
    /// `AuthError::Forbidden` when a user targets someone else,
    /// `AuthError::PasswordUnchanged` if the new password is the current one
    /// and `AuthError::WeakPassword` if it is too short.
    #[instrument(skip(self, caller, new_password), fields(caller_id = %caller.id))]
    pub async fn reset_password(
        &self,
        caller: &CurrentCustomer,
        email: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        let target = self
            .store
            .customer_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !caller.can_act_for(target.id) {
            return Err(AuthError::Forbidden(
                "You can only reset your own password",
            ));
        }

        match verify_password(new_password, &target.password_hash) {
            Ok(()) => return Err(AuthError::PasswordUnchanged),
            Err(AuthError::InvalidCredentials) => {}
            Err(other) => return Err(other),
        }
        validate_password(new_password)?;

        self.store
            .update_password_hash(target.id, &hash_password(new_password)?)
            .await
            .map_err(AuthError::from_write)?;

        tracing::info!(customer_id = %target.id, "Password reset");
        Ok(())
    }

    /// Assign a role. Callers must already be known to be admins.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for an unknown username and
    /// `AuthError::LastAdmin` when demoting the only admin.
    #[instrument(skip(self, caller), fields(caller_id = %caller.id))]
    pub async fn change_role(
        &self,
        caller: &CurrentCustomer,
        username: &str,
        new_role: &str,
    ) -> Result<Customer, AuthError> {
        if !caller.role.is_admin() {
            return Err(AuthError::Forbidden("Admin role required"));
        }

        let role = Role::normalize(Some(new_role));
        let target = self
            .store
            .customer_by_username(username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if target.role.is_admin()
            && !role.is_admin()
            && db::admin_count(self.store).await? <= 1
        {
            return Err(AuthError::LastAdmin);
        }

        let updated = self
            .store
            .update_role(target.id, role)
            .await
            .map_err(AuthError::from_write)?;

        tracing::info!(customer_id = %updated.id, role = %updated.role, "Role changed");
        Ok(updated)
    }
}

/// Create an admin directly, bypassing the bootstrap rule.
///
/// Used by operator tooling, never exposed over HTTP.
///
/// # Errors
///
/// Same validation and conflict errors as [`AccountService::register`].
#[instrument(skip(store, password))]
pub async fn create_admin(
    store: &dyn Store,
    username: &str,
    email: &str,
    password: &str,
) -> Result<Customer, AuthError> {
    let username = require_username(Some(username))?;
    let email = Email::parse(email)?;
    validate_password(password)?;

    let customer = store
        .insert_customer(NewCustomer {
            username: username.to_owned(),
            email,
            password_hash: hash_password(password)?,
            role: Role::Admin,
        })
        .await
        .map_err(AuthError::from_write)?;

    tracing::info!(customer_id = %customer.id, "Admin created");
    Ok(customer)
}

fn require_username(username: Option<&str>) -> Result<&str, AuthError> {
    username
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(AuthError::InvalidUsername)
}
