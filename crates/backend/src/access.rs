//! Explicit role/operation predicate.
//!
//! Protected operations receive an [`Actor`] and evaluate [`allowed`]
//! directly; there is no annotation or metadata lookup involved.

use pomelo_core::UserId;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Role attached to an authenticated caller by the (external) auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Customer,
}

/// Operations that require a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create, update, or delete catalog products.
    ManageProducts,
    /// Move an order through its status lifecycle.
    UpdateOrderStatus,
    /// Read orders belonging to other users.
    ViewAnyOrder,
}

/// The caller on whose behalf a service operation runs.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    /// Convenience constructor for an admin actor.
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Convenience constructor for a customer actor.
    #[must_use]
    pub const fn customer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Customer,
        }
    }
}

/// Whether `actor` may perform `operation`.
#[must_use]
pub const fn allowed(actor: &Actor, operation: Operation) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Customer => match operation {
            Operation::ManageProducts | Operation::UpdateOrderStatus | Operation::ViewAnyOrder => {
                false
            }
        },
    }
}

/// Evaluate [`allowed`] and turn a refusal into `AppError::Forbidden`.
///
/// # Errors
///
/// Returns `AppError::Forbidden` when the actor lacks the permission.
pub fn require(actor: &Actor, operation: Operation) -> Result<(), AppError> {
    if allowed(actor, operation) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "user {} may not perform {operation:?}",
            actor.user_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_is_allowed_everything() {
        let admin = Actor::admin(UserId::new(1));
        assert!(allowed(&admin, Operation::ManageProducts));
        assert!(allowed(&admin, Operation::UpdateOrderStatus));
        assert!(allowed(&admin, Operation::ViewAnyOrder));
    }

    #[test]
    fn test_customer_is_denied_protected_operations() {
        let customer = Actor::customer(UserId::new(2));
        assert!(!allowed(&customer, Operation::ManageProducts));
        assert!(!allowed(&customer, Operation::UpdateOrderStatus));
        assert!(matches!(
            require(&customer, Operation::UpdateOrderStatus),
            Err(AppError::Forbidden(_))
        ));
    }
}
