//! Profile and onboarding use-case service.
//!
//! # Responsibility
//! - Load/save the user profile shown on the settings screen.
//! - Derive the list-screen greeting.
//! - Track whether onboarding has been completed.
//!
//! # Invariants
//! - A saved profile always has a non-blank name.
//! - First launch is assumed until explicitly completed.

use crate::settings::{
    SettingsError, SettingsStore, KEY_IS_FIRST_LAUNCH, KEY_USER_BIO, KEY_USER_EMAIL,
    KEY_USER_NAME,
};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_GREETING_NAME: &str = "User";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Profile fields as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub bio: String,
}

/// Settings-screen input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileInput {
    pub name: String,
    pub email: String,
    pub bio: String,
}

#[derive(Debug)]
pub enum ProfileError {
    EmptyName,
    InvalidEmail(String),
    Settings(SettingsError),
}

impl Display for ProfileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name cannot be empty"),
            Self::InvalidEmail(value) => write!(f, "invalid email address: `{value}`"),
            Self::Settings(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProfileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Settings(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SettingsError> for ProfileError {
    fn from(value: SettingsError) -> Self {
        Self::Settings(value)
    }
}

/// Profile facade over a [`SettingsStore`].
pub struct ProfileService<S: SettingsStore> {
    store: S,
}

impl<S: SettingsStore> ProfileService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads the profile; unset fields read as empty strings.
    pub fn load_profile(&self) -> Result<UserProfile, ProfileError> {
        Ok(UserProfile {
            name: self.store.get_string(KEY_USER_NAME)?.unwrap_or_default(),
            email: self.store.get_string(KEY_USER_EMAIL)?.unwrap_or_default(),
            bio: self.store.get_string(KEY_USER_BIO)?.unwrap_or_default(),
        })
    }

    /// Trims and stores all profile fields.
    ///
    /// # Errors
    /// - `EmptyName` when the trimmed name is empty; nothing is written.
    /// - `InvalidEmail` when a non-empty email is not address-shaped.
    pub fn save_profile(&self, input: ProfileInput) -> Result<UserProfile, ProfileError> {
        let profile = UserProfile {
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            bio: input.bio.trim().to_string(),
        };

        if profile.name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        if !profile.email.is_empty() && !EMAIL_RE.is_match(&profile.email) {
            return Err(ProfileError::InvalidEmail(profile.email));
        }

        self.store.set_string(KEY_USER_NAME, &profile.name)?;
        self.store.set_string(KEY_USER_EMAIL, &profile.email)?;
        self.store.set_string(KEY_USER_BIO, &profile.bio)?;
        info!(
            "event=profile_save module=service status=ok has_email={} has_bio={}",
            !profile.email.is_empty(),
            !profile.bio.is_empty()
        );
        Ok(profile)
    }

    /// `Hello {name}`, falling back to `User`.
    pub fn greeting(&self) -> Result<String, ProfileError> {
        let name = self
            .store
            .get_string(KEY_USER_NAME)?
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GREETING_NAME.to_string());
        Ok(format!("Hello {name}"))
    }

    pub fn is_first_launch(&self) -> Result<bool, ProfileError> {
        Ok(self.store.get_bool(KEY_IS_FIRST_LAUNCH)?.unwrap_or(true))
    }

    /// Marks onboarding as done. Idempotent.
    pub fn complete_first_launch(&self) -> Result<(), ProfileError> {
        self.store.set_bool(KEY_IS_FIRST_LAUNCH, false)?;
        info!("event=first_launch_complete module=service status=ok");
        Ok(())
    }
}
