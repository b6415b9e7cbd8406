/// Star/unstar with optimistic cache and asynchronous commit
///
/// Permission and quota checks run before anything is written. The actor's
/// cached flag is swapped atomically and, while live, is fresher than the
/// store: a star the worker has not committed yet still counts as a star.
/// The count delta is applied only when that swap changes the flag. The
/// enqueued mutation is the record of intent, and a failed enqueue fails
/// the request.
use std::sync::Arc;

use super::{
    cache::{flag_key, StarCache},
    jobs::StarMutation,
    store::{ProfileRecord, StarStore},
    types::{StarOutcome, StarStatus, StarsPage},
};
use crate::{
    arguments::is_debug_stars_enabled,
    cache::CacheStore,
    config::{StarsConfig, ACTION_PROFILE_STAR},
    errors::{AppError, AppResult},
    jobs::JobQueue,
    logger::{self, LogTag},
    pagination::PageQuery,
    ratelimit::QuotaLimiter,
};

pub struct StarService {
    store: Arc<dyn StarStore>,
    cache: StarCache,
    queue: Arc<dyn JobQueue>,
    limiter: Arc<QuotaLimiter>,
    config: StarsConfig,
}

impl StarService {
    pub fn new(
        store: Arc<dyn StarStore>,
        cache: Arc<dyn CacheStore>,
        queue: Arc<dyn JobQueue>,
        limiter: Arc<QuotaLimiter>,
        config: StarsConfig,
    ) -> Self {
        Self {
            store,
            cache: StarCache::new(cache, &config),
            queue,
            limiter,
            config,
        }
    }

    pub async fn star(&self, actor_id: &str, profile_id: &str) -> AppResult<StarOutcome> {
        let profile = self.load_profile(profile_id).await?;
        if profile.owner_id == actor_id {
            return Err(AppError::Forbidden("cannot star your own profile".to_string()));
        }
        if !profile.is_public {
            return Err(AppError::Forbidden("profile is not public".to_string()));
        }

        self.limiter.check(ACTION_PROFILE_STAR, actor_id)?;

        let committed = self.store.has_star(profile_id, actor_id).await?;
        let previous = self.cache.swap_flag(profile_id, actor_id, true).await;
        if previous.unwrap_or(committed) {
            return Err(AppError::Conflict("profile already starred".to_string()));
        }

        let star_count = self.cache.adjust_count(profile_id, 1).await;

        let mutation = StarMutation::Add {
            profile_id: profile_id.to_string(),
            actor_id: actor_id.to_string(),
        };
        if let Err(e) = self.queue.enqueue(mutation.to_queued()).await {
            self.revert_projection(profile_id, actor_id, star_count.is_some(), -1, previous)
                .await;
            logger::error(
                LogTag::Stars,
                &format!("Star {} by {} not enqueued: {}", profile_id, actor_id, e),
            );
            return Err(e);
        }

        if is_debug_stars_enabled() {
            logger::debug(
                LogTag::Stars,
                &format!("Star {} by {} accepted (count={:?})", profile_id, actor_id, star_count),
            );
        }

        Ok(StarOutcome {
            profile_id: profile_id.to_string(),
            has_starred: true,
            star_count,
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Symmetric to `star`; removing a star that does not exist succeeds
    /// without enqueueing anything.
    pub async fn unstar(&self, actor_id: &str, profile_id: &str) -> AppResult<StarOutcome> {
        self.load_profile(profile_id).await?;
        self.limiter.check(ACTION_PROFILE_STAR, actor_id)?;

        let committed = self.store.has_star(profile_id, actor_id).await?;
        let previous = self.cache.swap_flag(profile_id, actor_id, false).await;
        if !previous.unwrap_or(committed) {
            if is_debug_stars_enabled() {
                logger::debug(
                    LogTag::Stars,
                    &format!("Unstar {} by {}: nothing to remove", profile_id, actor_id),
                );
            }
            return Ok(StarOutcome {
                profile_id: profile_id.to_string(),
                has_starred: false,
                star_count: None,
                timestamp: chrono::Utc::now().timestamp_millis(),
            });
        }

        let star_count = self.cache.adjust_count(profile_id, -1).await;

        let mutation = StarMutation::Remove {
            profile_id: profile_id.to_string(),
            actor_id: actor_id.to_string(),
        };
        if let Err(e) = self.queue.enqueue(mutation.to_queued()).await {
            self.revert_projection(profile_id, actor_id, star_count.is_some(), 1, previous)
                .await;
            logger::error(
                LogTag::Stars,
                &format!("Unstar {} by {} not enqueued: {}", profile_id, actor_id, e),
            );
            return Err(e);
        }

        Ok(StarOutcome {
            profile_id: profile_id.to_string(),
            has_starred: false,
            star_count,
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Aggregate count: cache, else store, then repopulate
    pub async fn star_count(&self, profile_id: &str) -> AppResult<u64> {
        if let Some(count) = self.cache.count(profile_id).await {
            return Ok(count);
        }
        let count = self.store.count_stars(profile_id).await?;
        self.cache.set_count(profile_id, count).await;
        if is_debug_stars_enabled() {
            logger::debug(
                LogTag::Stars,
                &format!("Star count for {} recomputed from store: {}", profile_id, count),
            );
        }
        Ok(count)
    }

    /// Paginated supporters, always from the store
    ///
    /// `total` and `has_more` are counted from the same store as the rows, so
    /// the envelope never promises rows a reader cannot see yet. Private
    /// profiles are only listed to their owner.
    pub async fn get_stars(
        &self,
        viewer_id: Option<&str>,
        profile_id: &str,
        query: PageQuery,
    ) -> AppResult<StarsPage> {
        let profile = self.load_profile(profile_id).await?;
        if !profile.is_public && viewer_id != Some(profile.owner_id.as_str()) {
            return Err(AppError::Forbidden("profile is not public".to_string()));
        }

        let page = query.resolve(self.config.default_page_size, self.config.max_page_size);
        let rows = self.store.list_stars(profile_id, page.offset, page.limit).await?;
        let total = self.store.count_stars(profile_id).await?;

        Ok(StarsPage {
            has_more: page.has_more(rows.len(), total),
            rows,
            total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    /// The actor's has-starred flag, read through the cache
    pub async fn star_status(&self, actor_id: &str, profile_id: &str) -> AppResult<StarStatus> {
        self.load_profile(profile_id).await?;

        let has_starred = match self.cache.flag(profile_id, actor_id).await {
            Some(flag) => flag,
            None => {
                let flag = self.store.has_star(profile_id, actor_id).await?;
                self.cache.set_flag(profile_id, actor_id, flag).await;
                flag
            }
        };

        Ok(StarStatus {
            profile_id: profile_id.to_string(),
            has_starred,
            star_count: self.star_count(profile_id).await?,
        })
    }

    async fn load_profile(&self, profile_id: &str) -> AppResult<ProfileRecord> {
        self.store
            .profile(profile_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile {}", profile_id)))
    }

    /// Undo an optimistic update whose mutation never made it into the queue
    async fn revert_projection(
        &self,
        profile_id: &str,
        actor_id: &str,
        count_adjusted: bool,
        delta: i64,
        previous_flag: Option<bool>,
    ) {
        if count_adjusted {
            self.cache.adjust_count(profile_id, delta).await;
        }
        match previous_flag {
            Some(flag) => self.cache.set_flag(profile_id, actor_id, flag).await,
            None => self.cache.delete(&flag_key(profile_id, actor_id)).await,
        }
    }
}
