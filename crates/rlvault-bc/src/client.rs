//! ballchasing API client implementing `ApiClientPort`.
//!
//! All requests funnel through the shared [`RateLimiter`] and a retry
//! policy layered on the single-attempt HTTP backend:
//!
//! - `Transient` failures retry with exponential backoff, bounded by
//!   `max_retries`.
//! - `RateLimited` failures feed the server hint back into the limiter
//!   and retry without consuming the transient budget. They are bounded
//!   separately so a persistently hostile 429 cannot spin forever.
//! - Everything else surfaces immediately.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use rlvault_core::{
    ApiClientPort, CollectError, CollectResult, Group, GroupId, ReplayByteStream, ReplayId,
    ReplayReference,
};

use crate::config::BcConfig;
use crate::endpoints::{next_cursor, Endpoints};
use crate::http::{HttpBackend, ReqwestBackend};
use crate::limiter::RateLimiter;
use crate::models::{GroupDto, GroupPage, ReplayDto, ReplayPage};

/// Wait applied when a 429 arrives without a Retry-After header.
const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 60;

/// Upper bound on consecutive rate-limited retries for one logical call.
const MAX_RATE_LIMIT_RETRIES: u8 = 10;

/// Rate-limited, retrying client for the ballchasing API.
pub struct BcApiClient<B: HttpBackend = ReqwestBackend> {
    backend: B,
    limiter: Arc<RateLimiter>,
    endpoints: Endpoints,
    config: BcConfig,
}

impl BcApiClient<ReqwestBackend> {
    /// Create a production client with the given API key.
    pub fn new(
        api_key: impl Into<String>,
        config: BcConfig,
        limiter: Arc<RateLimiter>,
    ) -> CollectResult<Self> {
        let backend = ReqwestBackend::new(api_key, Duration::from_secs(config.timeout_secs))?;
        Self::with_backend(backend, config, limiter)
    }
}

impl<B: HttpBackend> BcApiClient<B> {
    /// Create a client over an arbitrary HTTP backend.
    pub fn with_backend(
        backend: B,
        config: BcConfig,
        limiter: Arc<RateLimiter>,
    ) -> CollectResult<Self> {
        let endpoints = Endpoints::new(&config.base_url)?;
        Ok(Self {
            backend,
            limiter,
            endpoints,
            config,
        })
    }

    /// Handle one failed attempt: either absorb it (retry) or surface it.
    async fn note_failure(
        &self,
        err: CollectError,
        url: &Url,
        transient_attempts: &mut u8,
        rate_limit_attempts: &mut u8,
    ) -> CollectResult<()> {
        match &err {
            CollectError::RateLimited { retry_after_secs }
                if *rate_limit_attempts < MAX_RATE_LIMIT_RETRIES =>
            {
                *rate_limit_attempts += 1;
                let wait = retry_after_secs.unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS);
                warn!(url = %url, wait_secs = wait, "rate limited by remote API, backing off");
                self.limiter.note_retry_after(wait);
                Ok(())
            }
            CollectError::Transient { .. } if *transient_attempts < self.config.max_retries => {
                *transient_attempts += 1;
                let delay = Duration::from_millis(
                    self.config.retry_base_delay_ms * 2u64.pow(u32::from(*transient_attempts) - 1),
                );
                warn!(
                    url = %url,
                    attempt = *transient_attempts,
                    "transient API failure, retrying"
                );
                tokio::time::sleep(delay).await;
                Ok(())
            }
            _ => Err(err),
        }
    }

    /// Fetch JSON through the limiter with the full retry policy.
    async fn fetch_json<T: DeserializeOwned + Send>(&self, url: &Url) -> CollectResult<T> {
        let mut transient_attempts: u8 = 0;
        let mut rate_limit_attempts: u8 = 0;
        loop {
            self.limiter.acquire().await;
            match self.backend.get_json(url).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    self.note_failure(err, url, &mut transient_attempts, &mut rate_limit_attempts)
                        .await?;
                }
            }
        }
    }

    /// Open a byte stream through the limiter with the full retry policy.
    ///
    /// Only the opening request retries here; mid-stream failures surface
    /// through the stream and are handled by the caller's own retry.
    async fn fetch_stream(&self, url: &Url) -> CollectResult<ReplayByteStream> {
        let mut transient_attempts: u8 = 0;
        let mut rate_limit_attempts: u8 = 0;
        loop {
            self.limiter.acquire().await;
            match self.backend.get_stream(url).await {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    self.note_failure(err, url, &mut transient_attempts, &mut rate_limit_attempts)
                        .await?;
                }
            }
        }
    }
}

#[async_trait]
impl<B: HttpBackend> ApiClientPort for BcApiClient<B> {
    async fn ping(&self) -> CollectResult<()> {
        let url = self.endpoints.ping()?;
        let _: serde_json::Value = self.fetch_json(&url).await?;
        Ok(())
    }

    async fn get_group(&self, id: &GroupId) -> CollectResult<Group> {
        let url = self.endpoints.group(id)?;
        let dto: GroupDto = self.fetch_json(&url).await?;
        Ok(dto.into_group(None))
    }

    async fn list_child_groups(&self, id: &GroupId) -> CollectResult<Vec<Group>> {
        let mut groups = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let url = self
                .endpoints
                .child_groups(id, self.config.page_size, cursor.as_deref())?;
            let page: GroupPage = self.fetch_json(&url).await?;
            groups.extend(page.list.into_iter().map(|dto| dto.into_group(Some(id))));
            match next_cursor(page.next.as_deref()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        debug!(group = %id, children = groups.len(), "listed child groups");
        Ok(groups)
    }

    async fn list_group_replays(&self, id: &GroupId) -> CollectResult<Vec<ReplayReference>> {
        let mut replays = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let url = self
                .endpoints
                .group_replays(id, self.config.page_size, cursor.as_deref())?;
            let page: ReplayPage = self.fetch_json(&url).await?;
            replays.extend(page.list.into_iter().map(|dto| dto.into_reference(id)));
            match next_cursor(page.next.as_deref()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        debug!(group = %id, replays = replays.len(), "listed group replays");
        Ok(replays)
    }

    async fn get_replay(&self, id: &ReplayId) -> CollectResult<ReplayReference> {
        let url = self.endpoints.replay(id)?;
        let dto: ReplayDto = self.fetch_json(&url).await?;
        Ok(dto.into_detail_reference())
    }

    async fn download_replay(&self, id: &ReplayId) -> CollectResult<ReplayByteStream> {
        let url = self.endpoints.replay_file(id)?;
        self.fetch_stream(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeBackend;
    use futures::TryStreamExt;
    use serde_json::json;

    fn client(backend: FakeBackend) -> BcApiClient<FakeBackend> {
        let limiter = Arc::new(RateLimiter::new(10_000, 1000).unwrap());
        BcApiClient::with_backend(backend, BcConfig::default(), limiter).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn ping_succeeds_with_valid_key() {
        let backend = FakeBackend::new().with_json("api", json!({"chaser": true}));
        assert!(client(backend).ping().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn ping_surfaces_auth_failure_immediately() {
        let backend = FakeBackend::new().with_error("api", CollectError::auth("401"));
        let client = client(backend);
        let err = client.ping().await.unwrap_err();
        assert_eq!(err.error_class(), "auth");
        assert_eq!(client.backend.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn get_group_maps_payload() {
        let backend = FakeBackend::new()
            .with_json("groups/g1", json!({"id": "g1", "name": "RLCS Worlds"}));
        let group = client(backend).get_group(&GroupId::from("g1")).await.unwrap();
        assert_eq!(group.id.as_str(), "g1");
        assert_eq!(group.name, "RLCS Worlds");
        assert!(group.parent.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn list_child_groups_concatenates_pages() {
        let backend = FakeBackend::new()
            .with_json(
                "groups?group",
                json!({
                    "list": [{"id": "a", "name": "A"}],
                    "next": "https://ballchasing.com/api/groups?group=g1&after=cur2"
                }),
            )
            .with_json(
                "groups?group",
                json!({"list": [{"id": "b", "name": "B"}]}),
            );
        let client = client(backend);
        let children = client
            .list_child_groups(&GroupId::from("g1"))
            .await
            .unwrap();

        assert_eq!(children.len(), 2);
        assert_eq!(children[0].id.as_str(), "a");
        assert_eq!(children[1].id.as_str(), "b");
        assert_eq!(children[0].parent, Some(GroupId::from("g1")));

        let calls = client.backend.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].contains("after=cur2"));
    }

    #[tokio::test(start_paused = true)]
    async fn list_group_replays_attaches_listing_group() {
        let backend = FakeBackend::new().with_json(
            "replays?group",
            json!({"list": [
                {"id": "r1", "replay_title": "Game 1"},
                {"id": "r2"}
            ]}),
        );
        let replays = client(backend)
            .list_group_replays(&GroupId::from("g1"))
            .await
            .unwrap();
        assert_eq!(replays.len(), 2);
        assert_eq!(replays[0].group_id.as_str(), "g1");
        assert_eq!(replays[0].title.as_deref(), Some("Game 1"));
        assert!(replays[1].title.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_retry_then_succeed() {
        let backend = FakeBackend::new()
            .with_error("groups/g1", CollectError::transient("502"))
            .with_error("groups/g1", CollectError::transient("503"))
            .with_json("groups/g1", json!({"id": "g1", "name": "G"}));
        let client = client(backend);
        let group = client.get_group(&GroupId::from("g1")).await.unwrap();
        assert_eq!(group.id.as_str(), "g1");
        assert_eq!(client.backend.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_exhaust_retry_budget() {
        let backend =
            FakeBackend::new().with_error("groups/g1", CollectError::transient("503"));
        let client = client(backend);
        let err = client.get_group(&GroupId::from("g1")).await.unwrap_err();
        assert_eq!(err.error_class(), "transient");
        // Initial attempt plus max_retries
        assert_eq!(client.backend.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_hint_delays_next_attempt() {
        let backend = FakeBackend::new()
            .with_error("groups/g1", CollectError::rate_limited(Some(30)))
            .with_json("groups/g1", json!({"id": "g1", "name": "G"}));
        let client = client(backend);

        let start = tokio::time::Instant::now();
        let group = client.get_group(&GroupId::from("g1")).await.unwrap();
        assert_eq!(group.id.as_str(), "g1");
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_not_retried() {
        let backend =
            FakeBackend::new().with_error("replays/gone", CollectError::not_found("replays/gone"));
        let client = client(backend);
        let err = client
            .get_replay(&ReplayId::from("gone"))
            .await
            .unwrap_err();
        assert_eq!(err.error_class(), "not_found");
        assert_eq!(client.backend.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn download_replay_streams_bytes() {
        let backend = FakeBackend::new().with_file("replays/r1/file", b"replay bytes");
        let stream = client(backend)
            .download_replay(&ReplayId::from("r1"))
            .await
            .unwrap();
        let chunks: Vec<_> = stream.try_collect().await.unwrap();
        assert_eq!(&chunks[0][..], b"replay bytes");
    }

    #[tokio::test(start_paused = true)]
    async fn get_replay_detail_resolves_group() {
        let backend = FakeBackend::new().with_json(
            "replays/r1",
            json!({
                "id": "r1",
                "replay_title": "Grand Final",
                "groups": [{"id": "g9", "name": "Finals"}]
            }),
        );
        let reference = client(backend)
            .get_replay(&ReplayId::from("r1"))
            .await
            .unwrap();
        assert_eq!(reference.group_id.as_str(), "g9");
        assert_eq!(reference.title.as_deref(), Some("Grand Final"));
    }
}
