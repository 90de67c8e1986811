use serde::Deserialize;

/// Partial profile update. A field is applied only when it deserializes to
/// `Some`; both an omitted field and an explicit `null` leave the stored
/// value unchanged. A present `password` is re-hashed before storage.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}
