use std::collections::BTreeSet;

pub const DEFAULT_MAX_USERS: u64 = 500;
pub const DEFAULT_FAVORITES: [&str; 3] = ["sf2.zip", "s3comp.zip", "tf4.zip"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    /// Registrations are refused once this many records carry a username.
    pub max_users: u64,
    /// Favorites assigned to a record when it is first created.
    pub default_favorites: BTreeSet<String>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            max_users: DEFAULT_MAX_USERS,
            default_favorites: DEFAULT_FAVORITES.iter().map(|value| value.to_string()).collect(),
        }
    }
}
