//! Proptest generators for property-based testing.
//!
//! Identifiers and dates are drawn from small pools so that generated
//! scopes actually hit generated videos.

use proptest::prelude::*;

use vidgate_core::{AccessRule, DomainId, RuleScope, TopicId, UserId, Video, VideoId};

/// Number of distinct domains and topics the generators draw from.
pub const POOL_SIZE: u8 = 4;

fn pooled_bytes(tag: u8, n: u8) -> [u8; 12] {
    let mut bytes = [0u8; 12];
    bytes[0] = tag;
    bytes[11] = n;
    bytes
}

/// Generate a DomainId from the shared pool.
pub fn domain_id() -> impl Strategy<Value = DomainId> {
    (0..POOL_SIZE).prop_map(|n| DomainId::from_bytes(pooled_bytes(1, n)))
}

/// Generate a TopicId from the shared pool.
pub fn topic_id() -> impl Strategy<Value = TopicId> {
    (0..POOL_SIZE).prop_map(|n| TopicId::from_bytes(pooled_bytes(2, n)))
}

/// Generate a random UserId.
pub fn user_id() -> impl Strategy<Value = UserId> {
    any::<[u8; 12]>().prop_map(UserId::from_bytes)
}

/// Generate a year in a narrow window.
pub fn year() -> impl Strategy<Value = i32> {
    2021i32..=2023
}

/// Generate a month in the first quarter.
pub fn month() -> impl Strategy<Value = u8> {
    1u8..=3
}

/// Generate one of the first three days of a month.
pub fn day() -> impl Strategy<Value = u8> {
    1u8..=3
}

/// Build a video without validating its date.
pub fn video_at(
    id: VideoId,
    domain: DomainId,
    topic: TopicId,
    (year, month, day): (i32, u8, u8),
    storage_ref: impl Into<String>,
    created_at: i64,
) -> Video {
    Video {
        id,
        title: format!("video {}", id),
        description: None,
        domain,
        topic,
        year,
        month,
        day,
        storage_ref: storage_ref.into(),
        mime_type: None,
        size: None,
        created_at,
    }
}

/// Generate a video with a random id.
pub fn video() -> impl Strategy<Value = Video> {
    (
        any::<[u8; 12]>(),
        domain_id(),
        topic_id(),
        (year(), month(), day()),
        0i64..=1_000,
    )
        .prop_map(|(id, domain, topic, date, created_at)| {
            let id = VideoId::from_bytes(id);
            video_at(id, domain, topic, date, format!("{}.mp4", id), created_at)
        })
}

/// Generate a rule scope, each field independently present or wildcard.
pub fn rule_scope() -> impl Strategy<Value = RuleScope> {
    (
        proptest::option::of(domain_id()),
        proptest::option::of(topic_id()),
        proptest::option::of(year()),
        proptest::option::of(month()),
        proptest::option::of(day()),
    )
        .prop_map(|(domain, topic, year, month, day)| RuleScope {
            domain,
            topic,
            year,
            month,
            day,
        })
}

/// A generated catalog plus the scopes of one user's rules.
#[derive(Debug, Clone)]
pub struct CatalogParams {
    /// Videos with distinct ids.
    pub videos: Vec<Video>,
    pub scopes: Vec<RuleScope>,
}

impl CatalogParams {
    /// Permanent rules for `user`, one per scope.
    pub fn rules_for(&self, user: UserId) -> Vec<AccessRule> {
        self.scopes
            .iter()
            .cloned()
            .map(|scope| AccessRule::permanent(user, scope, 0))
            .collect()
    }
}

/// Generate a catalog with up to `max_videos` videos and a scope count in
/// `scopes`.
pub fn catalog_params(
    max_videos: usize,
    scopes: impl Into<prop::collection::SizeRange>,
) -> BoxedStrategy<CatalogParams> {
    (
        prop::collection::vec(video(), 0..max_videos),
        prop::collection::vec(rule_scope(), scopes),
    )
        .prop_map(|(videos, scopes)| {
            // Reassign ids by position so no two videos collide
            let videos = videos
                .into_iter()
                .enumerate()
                .map(|(i, mut video)| {
                    let mut bytes = pooled_bytes(3, 0);
                    bytes[8..].copy_from_slice(&(i as u32).to_be_bytes());
                    video.id = VideoId::from_bytes(bytes);
                    video
                })
                .collect();
            CatalogParams { videos, scopes }
        })
        .boxed()
}

impl Arbitrary for CatalogParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        catalog_params(24, 0..4)
    }
}

/// Videos covered by at least one scope, newest first.
///
/// A brute-force reference for `Store::videos_matching`.
pub fn expected_matches(videos: &[Video], scopes: &[RuleScope]) -> Vec<Video> {
    let mut matched: Vec<Video> = videos
        .iter()
        .filter(|video| scopes.iter().any(|scope| scope.matches(video)))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    matched
}
