//! Customer and administrator accounts: registration, login and profiles.
//!
//! Tokens are stateless, so logout only exists for clients that expect the route.

pub mod password;
pub mod token;

use bson::{Bson, DateTime, Document as BsonDocument, Uuid};
use shopdesk_store::{
    collection::DynTypedCollection,
    document::new_document_id,
    error::DocumentStoreError,
    query::Filter,
    store::DynDocumentStore,
};

use crate::{
    config::Config,
    error::{AppError, auth::AuthError},
    model::account::{
        Admin, AdminAuthDto, AdminCredentialsDto, LoginUserDto, RegisterUserDto, UpdateProfileDto,
        User, UserAuthDto, UserDto,
    },
    resource::dispatcher::next_timestamp,
    service::auth::{
        password::{DecoyHash, hash_password, verify_account_password},
        token::{Role, TokenService},
    },
    state::AppState,
};

const PHONE_FORMAT: &str = "Phone must be in format +998XXXXXXXXX";

/// Whether `phone` is `+998` followed by exactly nine digits.
pub fn is_valid_phone(phone: &str) -> bool {
    phone
        .strip_prefix("+998")
        .is_some_and(|rest| rest.len() == 9 && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// Trimmed, non-empty text.
fn filled(value: Option<&String>) -> Option<&str> {
    value.map(|text| text.trim()).filter(|text| !text.is_empty())
}

/// Customer accounts in the `users` collection.
pub struct UserAuthService<'a> {
    store: &'a DynDocumentStore,
    tokens: &'a TokenService,
    decoy_hash: &'a DecoyHash,
    bcrypt_cost: u32,
}

impl<'a> UserAuthService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            store: &state.store,
            tokens: &state.tokens,
            decoy_hash: &state.decoy_hash,
            bcrypt_cost: state.config.bcrypt_cost,
        }
    }

    fn users(&self) -> DynTypedCollection<'a, User> {
        self.store.typed_collection::<User>()
    }

    async fn find_other(&self, field: &str, value: &str, except: Option<Uuid>) -> Result<Option<User>, AppError> {
        let found = self
            .users()
            .find_one(Filter::eq(field, value))
            .await?;

        Ok(found.filter(|user| Some(user.id) != except))
    }

    fn issue(&self, user: User) -> Result<UserAuthDto, AppError> {
        let token = self.tokens.issue(&user.id, &user.name, Role::User)?;

        Ok(UserAuthDto {
            token,
            user: user.into_dto(),
        })
    }

    /// Creates a customer account and signs it in.
    ///
    /// # Arguments
    /// - `body` - Name, phone and password are required; email is optional
    ///
    /// # Returns
    /// - `Ok(UserAuthDto)` - Token plus the new account
    /// - `Err(AppError::Validation)` - Missing field or malformed phone
    /// - `Err(AppError::Conflict)` - Phone or email already registered
    pub async fn register(&self, body: RegisterUserDto) -> Result<UserAuthDto, AppError> {
        let (Some(name), Some(phone), Some(password)) = (
            filled(body.name.as_ref()),
            filled(body.phone.as_ref()),
            body.password.as_deref().filter(|password| !password.is_empty()),
        ) else {
            return Err(AppError::validation("Name, phone, and password are required"));
        };

        if !is_valid_phone(phone) {
            return Err(AppError::validation(PHONE_FORMAT));
        }

        let email = filled(body.email.as_ref());

        if self.find_other("phone", phone, None).await?.is_some() {
            return Err(AppError::Conflict("User with this phone number already exists".to_string()));
        }

        if let Some(email) = email {
            if self.find_other("email", email, None).await?.is_some() {
                return Err(AppError::Conflict("User with this email already exists".to_string()));
            }
        }

        let now = DateTime::now();
        let user = User {
            id: new_document_id(),
            name: name.to_string(),
            phone: phone.to_string(),
            email: email.map(str::to_string),
            password: hash_password(password, self.bcrypt_cost).await?,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        };

        match self.users().insert(vec![user.clone()]).await {
            Ok(()) => {}
            Err(DocumentStoreError::DocumentAlreadyExists(..)) => {
                return Err(AppError::Conflict("User with this phone number already exists".to_string()));
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!("Registered user {}", user.id);

        self.issue(user)
    }

    /// Signs a customer in by phone and password.
    ///
    /// An unknown phone and a wrong password fail with the same error.
    ///
    /// # Returns
    /// - `Ok(UserAuthDto)` - Token plus the account, with `last_login` refreshed
    /// - `Err(AuthError::InvalidCredentials)` - Unknown phone or wrong password
    /// - `Err(AuthError::AccountDeactivated)` - Right password, inactive account
    pub async fn login(&self, body: LoginUserDto) -> Result<UserAuthDto, AppError> {
        let (Some(phone), Some(password)) = (
            filled(body.phone.as_ref()),
            body.password.as_deref().filter(|password| !password.is_empty()),
        ) else {
            return Err(AppError::validation("Phone and password are required"));
        };

        if !is_valid_phone(phone) {
            return Err(AppError::validation(PHONE_FORMAT));
        }

        let user = self.find_other("phone", phone, None).await?;
        let stored = user.as_ref().map(|user| user.password.as_str());
        let verified = verify_account_password(password, stored, self.decoy_hash).await?;

        let (Some(mut user), true) = (user, verified) else {
            return Err(AuthError::InvalidCredentials.into());
        };

        if !user.is_active {
            return Err(AuthError::AccountDeactivated.into());
        }

        let now = DateTime::now();
        let mut touched = BsonDocument::new();
        touched.insert("last_login", now);
        self.users().patch(user.id, touched).await?;
        user.last_login = Some(now);

        self.issue(user)
    }

    pub async fn profile(&self, id: Uuid) -> Result<UserDto, AppError> {
        let user = self
            .users()
            .get_one(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(user.into_dto())
    }

    /// Updates the caller's own account.
    ///
    /// Omitted fields are kept; an empty email clears it. Phone and email stay unique
    /// across accounts.
    pub async fn update_profile(&self, id: Uuid, body: UpdateProfileDto) -> Result<UserDto, AppError> {
        let current = self
            .users()
            .get_one(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let mut patch = BsonDocument::new();

        if let Some(name) = filled(body.name.as_ref()) {
            patch.insert("name", name);
        }

        if let Some(phone) = filled(body.phone.as_ref()) {
            if !is_valid_phone(phone) {
                return Err(AppError::validation(PHONE_FORMAT));
            }

            if self.find_other("phone", phone, Some(id)).await?.is_some() {
                return Err(AppError::Conflict("Phone number already exists for another user".to_string()));
            }

            patch.insert("phone", phone);
        }

        if let Some(email) = body.email.as_ref() {
            match email.trim() {
                "" => {
                    patch.insert("email", Bson::Null);
                }
                email => {
                    if self.find_other("email", email, Some(id)).await?.is_some() {
                        return Err(AppError::Conflict("User with this email already exists".to_string()));
                    }

                    patch.insert("email", email);
                }
            }
        }

        if let Some(password) = body.password.as_deref().filter(|password| !password.is_empty()) {
            patch.insert("password", hash_password(password, self.bcrypt_cost).await?);
        }

        let previous = Bson::DateTime(current.updated_at);
        patch.insert("updated_at", next_timestamp(Some(&previous)));

        if !self.users().patch(id, patch).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        self.profile(id).await
    }
}

/// Administrator accounts in the `admins` collection.
pub struct AdminAuthService<'a> {
    store: &'a DynDocumentStore,
    tokens: &'a TokenService,
    decoy_hash: &'a DecoyHash,
    bcrypt_cost: u32,
}

impl<'a> AdminAuthService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            store: &state.store,
            tokens: &state.tokens,
            decoy_hash: &state.decoy_hash,
            bcrypt_cost: state.config.bcrypt_cost,
        }
    }

    fn admins(&self) -> DynTypedCollection<'a, Admin> {
        self.store.typed_collection::<Admin>()
    }

    fn credentials(body: &AdminCredentialsDto) -> Result<(&str, &str), AppError> {
        match (
            filled(body.name.as_ref()),
            body.password.as_deref().filter(|password| !password.is_empty()),
        ) {
            (Some(name), Some(password)) => Ok((name, password)),
            _ => Err(AppError::validation("Name and password are required")),
        }
    }

    fn issue(&self, admin: Admin) -> Result<AdminAuthDto, AppError> {
        let token = self.tokens.issue(&admin.id, &admin.name, Role::Admin)?;

        Ok(AdminAuthDto {
            token,
            admin: admin.into_dto(),
        })
    }

    /// Signs an administrator in.
    ///
    /// # Returns
    /// - `Ok(AdminAuthDto)` - Token plus the account
    /// - `Err(AuthError::InvalidCredentials)` - Unknown name or wrong password
    pub async fn login(&self, body: AdminCredentialsDto) -> Result<AdminAuthDto, AppError> {
        let (name, password) = Self::credentials(&body)?;

        let admin = self.admins().find_one(Filter::eq("name", name)).await?;
        let stored = admin.as_ref().map(|admin| admin.password.as_str());
        let verified = verify_account_password(password, stored, self.decoy_hash).await?;

        let (Some(admin), true) = (admin, verified) else {
            return Err(AuthError::InvalidCredentials.into());
        };

        self.issue(admin)
    }

    /// Creates another administrator. The caller must already be one.
    pub async fn register(&self, body: AdminCredentialsDto) -> Result<AdminAuthDto, AppError> {
        let (name, password) = Self::credentials(&body)?;

        let admin = create_admin(self.store, name, password, self.bcrypt_cost).await?;

        self.issue(admin)
    }

    pub async fn profile(&self, id: Uuid) -> Result<Admin, AppError> {
        self.admins()
            .get_one(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Admin not found".to_string()))
    }

    /// Replaces the caller's name and password and issues a token for the new name.
    pub async fn update_profile(&self, id: Uuid, body: AdminCredentialsDto) -> Result<AdminAuthDto, AppError> {
        let (name, password) = Self::credentials(&body)?;
        let current = self.profile(id).await?;

        let taken = self
            .admins()
            .find_one(Filter::eq("name", name))
            .await?
            .is_some_and(|other| other.id != id);
        if taken {
            return Err(AppError::Conflict("Admin with this name already exists".to_string()));
        }

        let previous = Bson::DateTime(current.updated_at);
        let mut patch = BsonDocument::new();
        patch.insert("name", name);
        patch.insert("password", hash_password(password, self.bcrypt_cost).await?);
        patch.insert("updated_at", next_timestamp(Some(&previous)));

        if !self.admins().patch(id, patch).await? {
            return Err(AppError::NotFound("Admin not found".to_string()));
        }

        let admin = self.profile(id).await?;
        self.issue(admin)
    }
}

/// Stores a new administrator, rejecting a name that is already taken.
pub async fn create_admin(store: &DynDocumentStore, name: &str, password: &str, cost: u32) -> Result<Admin, AppError> {
    let admins = store.typed_collection::<Admin>();

    if admins.find_one(Filter::eq("name", name)).await?.is_some() {
        return Err(AppError::Conflict("Admin with this name already exists".to_string()));
    }

    let now = DateTime::now();
    let admin = Admin {
        id: new_document_id(),
        name: name.to_string(),
        password: hash_password(password, cost).await?,
        created_at: now,
        updated_at: now,
    };

    match admins.insert(vec![admin.clone()]).await {
        Ok(()) => {}
        Err(DocumentStoreError::DocumentAlreadyExists(..)) => {
            return Err(AppError::Conflict("Admin with this name already exists".to_string()));
        }
        Err(err) => return Err(err.into()),
    }

    tracing::info!("Created admin '{}'", admin.name);

    Ok(admin)
}

/// Creates the administrator named by `ADMIN_NAME`/`ADMIN_PASSWORD` if it does not exist.
///
/// Does nothing when either variable is unset.
///
/// # Returns
/// - `Ok(true)` - The admin was created
/// - `Ok(false)` - Not configured, or it already exists
/// - `Err(AppError)` - Store or hashing failure
pub async fn bootstrap_admin(store: &DynDocumentStore, config: &Config) -> Result<bool, AppError> {
    let (Some(name), Some(password)) = (config.admin_name.as_deref(), config.admin_password.as_deref()) else {
        tracing::debug!("ADMIN_NAME/ADMIN_PASSWORD not set, skipping admin bootstrap");
        return Ok(false);
    };

    match create_admin(store, name, password, config.bcrypt_cost).await {
        Ok(_) => Ok(true),
        Err(AppError::Conflict(_)) => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_uzbek_mobile_numbers() {
        assert!(is_valid_phone("+998901234567"));
        assert!(!is_valid_phone("998901234567"));
        assert!(!is_valid_phone("+99890123456"));
        assert!(!is_valid_phone("+9989012345678"));
        assert!(!is_valid_phone("+99890123456a"));
    }
}
