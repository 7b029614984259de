use crate::errors::BackendError;

/// The role a caller acts under.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    /// May publish, restore, patch, and delete recordings.
    Admin,

    /// May list recordings and report plays.
    Listener,
}

/// The caller's session, passed explicitly into every service call
/// that needs an access decision.
#[derive(Clone, Debug)]
pub struct Session {
    role: Role,
}

impl Session {
    pub fn admin() -> Self {
        Session { role: Role::Admin }
    }

    pub fn listener() -> Self {
        Session {
            role: Role::Listener,
        }
    }

    /// Resolves an `Authorization` header against the configured admin
    /// token. Anything else is a listener; identity itself is managed
    /// by the external auth service.
    pub fn from_bearer(admin_token: &str, header: Option<&str>) -> Self {
        match header.and_then(|header| header.strip_prefix("Bearer ")) {
            Some(token) if !admin_token.is_empty() && token == admin_token => Session::admin(),
            _ => Session::listener(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn require_admin(&self) -> Result<(), BackendError> {
        match self.role {
            Role::Admin => Ok(()),
            Role::Listener => Err(BackendError::Forbidden),
        }
    }
}
