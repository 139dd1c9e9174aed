//! Per-video access decisions.
//!
//! A user may view a video iff at least one of their active rules covers
//! it. Rules are re-read from the store on every call; nothing is cached,
//! so a rule granted or revoked is visible to the very next evaluation.

use std::sync::Arc;

use vidgate_core::{AccessRule, ExpiryPolicy, UserId, Video, VideoId};
use vidgate_store::Store;

use crate::error::{AccessError, Result};

/// Why access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No active rule covers the video.
    NoMatchingRule,
    /// The account is disabled.
    AccountDisabled,
    /// The user id does not resolve to an account.
    UnknownUser,
}

/// Outcome of evaluating one user against one video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_permit(&self) -> bool {
        matches!(self, Decision::Permit)
    }
}

/// A decision together with the video it was made for.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub video: Video,
    pub decision: Decision,
}

/// Decide a video against a rule set.
///
/// Rules are OR-ed; each rule ANDs its present scope fields. Expiry is
/// the caller's concern: pass only the rules active at evaluation time.
pub fn evaluate(rules: &[AccessRule], video: &Video) -> Decision {
    if matching_rule(rules, video).is_some() {
        Decision::Permit
    } else {
        Decision::Deny(DenyReason::NoMatchingRule)
    }
}

/// The first rule covering the video, if any.
pub fn matching_rule<'a>(rules: &'a [AccessRule], video: &Video) -> Option<&'a AccessRule> {
    rules.iter().find(|rule| rule.matches(video))
}

/// Evaluates access against rules held in a [`Store`].
pub struct AccessEvaluator<S: Store> {
    store: Arc<S>,
    policy: ExpiryPolicy,
}

impl<S: Store> AccessEvaluator<S> {
    pub fn new(store: Arc<S>, policy: ExpiryPolicy) -> Self {
        Self { store, policy }
    }

    /// The expiry policy applied when loading rules.
    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Decide whether `user` may view `video_id` at `now`.
    ///
    /// A missing video is an error rather than a denial, so callers can
    /// tell "no such video" from "not yours to watch".
    pub async fn evaluate_access(
        &self,
        user: &UserId,
        video_id: &VideoId,
        now: i64,
    ) -> Result<Evaluation> {
        let video = self
            .store
            .get_video(video_id)
            .await?
            .ok_or(AccessError::VideoNotFound(*video_id))?;

        let decision = match self.store.get_user(user).await? {
            None => Decision::Deny(DenyReason::UnknownUser),
            Some(account) if !account.is_active() => Decision::Deny(DenyReason::AccountDisabled),
            Some(_) => {
                let rules = self.store.active_rules(user, now, self.policy).await?;
                evaluate(&rules, &video)
            }
        };

        Ok(Evaluation { video, decision })
    }
}
