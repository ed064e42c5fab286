//! Operator role check for the admin surface.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::config::{AdminConfig, PLACEHOLDER_API_KEY};
use crate::http::server::AppState;

/// What an authenticated operator may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Read the audit trail.
    Viewer,
    /// Read and clear the audit trail.
    Admin,
}

impl Role {
    /// Map a bearer key to a role. Unknown or empty keys map to nothing.
    pub fn from_bearer(config: &AdminConfig, header: &str) -> Option<Role> {
        let key = header.strip_prefix("Bearer ")?;
        if key.is_empty() {
            return None;
        }
        if key == config.api_key && key != PLACEHOLDER_API_KEY {
            Some(Role::Admin)
        } else if !config.viewer_key.is_empty() && key == config.viewer_key {
            Some(Role::Viewer)
        } else {
            None
        }
    }

    pub fn can_clear(self) -> bool {
        self == Role::Admin
    }
}

/// Resolve the caller's role and attach it to the request.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let config = state.inner.config.load();

    let role = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| Role::from_bearer(&config.admin, h));

    match role {
        Some(role) => {
            request.extensions_mut().insert(role);
            Ok(next.run(request).await)
        }
        None => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request without a valid key");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AdminConfig {
        AdminConfig {
            enabled: true,
            api_key: "admin-key-0123456789".to_string(),
            viewer_key: "viewer-key-0123456789".to_string(),
        }
    }

    #[test]
    fn test_roles_from_bearer() {
        let config = config();
        assert_eq!(Role::from_bearer(&config, "Bearer admin-key-0123456789"), Some(Role::Admin));
        assert_eq!(Role::from_bearer(&config, "Bearer viewer-key-0123456789"), Some(Role::Viewer));
        assert_eq!(Role::from_bearer(&config, "Bearer nope"), None);
        assert_eq!(Role::from_bearer(&config, "admin-key-0123456789"), None);
        assert_eq!(Role::from_bearer(&config, "Bearer "), None);
    }

    #[test]
    fn test_default_config_grants_no_role() {
        let config = AdminConfig::default();
        assert_eq!(Role::from_bearer(&config, "Bearer CHANGE_ME_IN_PRODUCTION"), None);
        assert_eq!(Role::from_bearer(&config, "Bearer "), None);

        let placeholder = AdminConfig {
            enabled: true,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            viewer_key: String::new(),
        };
        assert_eq!(Role::from_bearer(&placeholder, "Bearer CHANGE_ME_IN_PRODUCTION"), None);
    }

    #[test]
    fn test_empty_viewer_key_grants_nothing() {
        let config = AdminConfig {
            viewer_key: String::new(),
            ..config()
        };
        assert_eq!(Role::from_bearer(&config, "Bearer "), None);
        assert!(Role::Admin.can_clear());
        assert!(!Role::Viewer.can_clear());
    }
}
