use uuid::Uuid;

use super::error::ListingError;
use super::model::Actor;

/// Why a mutation was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    Owner,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(Grant),
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    pub fn into_result(self) -> Result<Grant, ListingError> {
        match self {
            Decision::Allow(grant) => Ok(grant),
            Decision::Deny => Err(ListingError::Forbidden),
        }
    }
}

/// Pure ownership-or-admin check. Must run after identity resolution and
/// against a freshly fetched owner id.
pub fn authorize(actor: &Actor, resource_owner_id: Uuid, is_admin: bool) -> Decision {
    if actor.id == resource_owner_id {
        Decision::Allow(Grant::Owner)
    } else if is_admin {
        Decision::Allow(Grant::Admin)
    } else {
        Decision::Deny
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Actor {
        Actor { id: Uuid::new_v4(), email: "someone@used.com".to_string() }
    }

    #[test]
    fn owner_is_allowed_without_admin() {
        let a = actor();
        assert_eq!(authorize(&a, a.id, false), Decision::Allow(Grant::Owner));
    }

    #[test]
    fn owner_who_is_also_admin_is_granted_as_owner() {
        let a = actor();
        assert_eq!(authorize(&a, a.id, true), Decision::Allow(Grant::Owner));
    }

    #[test]
    fn stranger_is_denied_unless_admin() {
        let a = actor();
        let owner = Uuid::new_v4();
        assert_eq!(authorize(&a, owner, false), Decision::Deny);
        assert!(matches!(authorize(&a, owner, false).into_result(), Err(ListingError::Forbidden)));
        assert_eq!(authorize(&a, owner, true), Decision::Allow(Grant::Admin));
    }

    #[test]
    fn admin_always_allowed() {
        for _ in 0..16 {
            assert!(authorize(&actor(), Uuid::new_v4(), true).is_allowed());
        }
    }
}
