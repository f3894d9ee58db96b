//! Profile service: cached user lookups.

use std::time::Duration;

use pomelo_core::UserId;
use sqlx::PgPool;

use crate::cache::{CacheAside, keys};
use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::models::User;

const PROFILE_TTL: Duration = Duration::from_secs(300);

/// Cached reads of user profiles.
pub struct ProfileService {
    pool: PgPool,
    cache: CacheAside,
}

impl ProfileService {
    /// Create a profile service.
    #[must_use]
    pub const fn new(pool: PgPool, cache: CacheAside) -> Self {
        Self { pool, cache }
    }

    /// Get a user's profile.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user doesn't exist.
    pub async fn get_profile(&self, user_id: UserId) -> Result<User> {
        self.cache
            .get_or_set(&keys::profile(user_id), Some(PROFILE_TTL), || async {
                UserRepository::new(&self.pool)
                    .get(user_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))
            })
            .await
    }
}
