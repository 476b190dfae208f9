use tourbook_auth::{Role, User};
use tourbook_core::UserId;

/// The authenticated user for a protected request.
///
/// Inserted by [`crate::middleware::require_auth`]; present on every handler
/// behind it.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> UserId {
        self.0.id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }
}

/// Who is looking at a page, if anyone is logged in.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<User>);
