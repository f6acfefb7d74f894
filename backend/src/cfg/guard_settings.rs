use serde::{Deserialize, Serialize};

/// Paths the route guard redirects to. The SPA router owns the same set of
/// routes, so changing one side requires changing the other.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GuardSettings {
    #[serde(default)]
    pub login_path: String,

    #[serde(default)]
    pub onboarding_path: String,

    #[serde(default)]
    pub dashboard_path: String,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            login_path: "/auth".to_string(),
            onboarding_path: "/onboarding".to_string(),
            dashboard_path: "/dashboard".to_string(),
        }
    }
}
