use thiserror::Error;

use crate::Role;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("You do not have permission to perform this action")]
    Forbidden { role: Role },
}

/// Check that `role` is one of `allowed`.
///
/// - No IO
/// - No panics
pub fn authorize(role: Role, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_listed_roles() {
        assert!(authorize(Role::LeadGuide, &[Role::Admin, Role::LeadGuide]).is_ok());
    }

    #[test]
    fn rejects_unlisted_roles() {
        assert_eq!(
            authorize(Role::User, &[Role::Admin]),
            Err(AuthzError::Forbidden { role: Role::User })
        );
        assert!(authorize(Role::Admin, &[]).is_err());
    }
}
