use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::models::user::{ProficiencyLevel, UserProfile};
use crate::profile::get_user_profile;
use crate::store::DocumentStore;

/// Profile synthesised from identity fields for a user with no usable stored document.
pub fn default_profile(identity: &AuthUser) -> UserProfile {
    let field = |value: &Option<String>| value.clone().unwrap_or_default();
    UserProfile {
        name: identity
            .display_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "User".to_string()),
        email: field(&identity.email),
        avatar: field(&identity.photo_url),
        skills: Vec::new(),
        current_level: ProficiencyLevel::Beginner,
        ..Default::default()
    }
}

/// Loads the stored profile for `identity`. An absent document and a failed read
/// both produce [`default_profile`]; nothing is written back.
pub async fn bootstrap_profile(store: &dyn DocumentStore, identity: &AuthUser) -> UserProfile {
    match get_user_profile(store, &identity.uid).await {
        Ok(Some(profile)) => {
            info!("Loaded stored profile for {}", identity.uid);
            profile
        }
        Ok(None) => {
            info!("No stored profile for {}, using identity defaults", identity.uid);
            default_profile(identity)
        }
        Err(e) => {
            warn!(
                "Failed to fetch profile for {}: {e}; using identity defaults",
                identity.uid
            );
            default_profile(identity)
        }
    }
}
