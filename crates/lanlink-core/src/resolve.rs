// ── Lazy stream-endpoint resolver ──
//
// Drives the profiles -> profile-index -> stream-URI pipeline for a
// stream-capable device. Each stage is gated on its own tagged state:
// once a stage is Ready it is never recomputed, and a failed stage leaves
// its state Pending so only that stage retries on the next access.
//
// Interleaving discipline: the state lock is never held across an await.
// Every stage reads under the lock, drops it, performs its external call,
// then re-checks under the lock before committing -- the first writer
// wins, so a concurrent resolve that finished the same stage during the
// suspension is respected rather than overwritten.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::collab::ProfileSource;
use crate::error::CoreError;
use crate::model::{Device, MediaProfile};

// ── Stage state ──────────────────────────────────────────────────────

/// Per-field-group resolution state.
#[derive(Debug, Clone)]
enum StageState<T> {
    /// Not yet resolved (initial, or left behind by a stage failure).
    Pending,
    /// Resolved; never recomputed.
    Ready(T),
}

impl<T> StageState<T> {
    fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending => None,
        }
    }

    fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

#[derive(Debug)]
struct EndpointState {
    profiles: StageState<Vec<MediaProfile>>,
    profile_index: StageState<usize>,
    stream_uri: StageState<Url>,
}

impl EndpointState {
    fn new() -> Self {
        Self {
            profiles: StageState::Pending,
            profile_index: StageState::Pending,
            stream_uri: StageState::Pending,
        }
    }
}

// ── Public types ─────────────────────────────────────────────────────

/// Which pipeline stage a resolution failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStage {
    Profiles,
    ProfileIndex,
    StreamUri,
}

/// A stage-scoped resolution failure. All variants are retryable on the
/// next access; stages that already succeeded are unaffected.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("profile query failed: {0}")]
    Profiles(#[source] CoreError),

    /// The device advertises no profiles at all, so no index can be
    /// selected -- not even the last-available fallback.
    #[error("device advertises no profiles")]
    NoProfiles,

    #[error("stream address request failed: {0}")]
    StreamUri(#[source] CoreError),
}

impl ResolveError {
    /// The stage this failure is scoped to.
    pub fn stage(&self) -> ResolveStage {
        match self {
            Self::Profiles(_) => ResolveStage::Profiles,
            Self::NoProfiles => ResolveStage::ProfileIndex,
            Self::StreamUri(_) => ResolveStage::StreamUri,
        }
    }
}

/// Stream-selection settings for one device, fixed at construction.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Configured profile index; clamped to the last available profile
    /// when out of range.
    pub profile_index: usize,
    /// Whether to embed `username:password` into the resolved URI.
    pub embed_credentials: bool,
    pub username: String,
    pub password: SecretString,
}

impl StreamSettings {
    /// Settings that select the first profile and leave the URI untouched.
    pub fn plain() -> Self {
        Self {
            profile_index: 0,
            embed_credentials: false,
            username: String::new(),
            password: SecretString::from(String::new()),
        }
    }
}

/// Fully resolved endpoint snapshot, returned once all stages are Ready.
#[derive(Debug, Clone)]
pub struct ResolvedEndpoint {
    pub profiles: Vec<MediaProfile>,
    pub profile_index: usize,
    pub stream_uri: Url,
}

// ── Resolver ─────────────────────────────────────────────────────────

/// Lazy, independently-retryable endpoint resolver for one device.
///
/// Safe to call on every access attempt: stages that already succeeded
/// are never re-queried, and credential embedding is applied exactly once
/// at the stream-URI commit.
pub struct EndpointResolver {
    source: Arc<dyn ProfileSource>,
    settings: StreamSettings,
    state: Mutex<EndpointState>,
}

impl EndpointResolver {
    pub fn new(source: Arc<dyn ProfileSource>, settings: StreamSettings) -> Self {
        Self {
            source,
            settings,
            state: Mutex::new(EndpointState::new()),
        }
    }

    /// Advance every pending stage in order and return the resolved
    /// endpoint, or the failure of the first stage that could not
    /// advance. Previously resolved stages are left untouched either way.
    pub async fn resolve(&self, device: &Device) -> Result<ResolvedEndpoint, ResolveError> {
        self.advance_profiles(device).await?;
        self.advance_profile_index()?;
        self.advance_stream_uri(device).await?;

        let state = self.lock_state();
        match (
            state.profiles.ready(),
            state.profile_index.ready(),
            state.stream_uri.ready(),
        ) {
            (Some(profiles), Some(&profile_index), Some(stream_uri)) => Ok(ResolvedEndpoint {
                profiles: profiles.clone(),
                profile_index,
                stream_uri: stream_uri.clone(),
            }),
            // All three advance steps returned Ok, so each field is Ready.
            _ => unreachable!("resolve: stage advanced but state not Ready"),
        }
    }

    /// The resolved stream URI, if the pipeline has completed.
    pub fn stream_uri(&self) -> Option<Url> {
        self.lock_state().stream_uri.ready().cloned()
    }

    // ── Stage 1: profiles ────────────────────────────────────────────

    async fn advance_profiles(&self, device: &Device) -> Result<(), ResolveError> {
        if !self.lock_state().profiles.is_pending() {
            return Ok(());
        }

        // Suspension point: the lock is not held here.
        let fetched = match self.source.fetch_profiles().await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!(device = device.name(), error = %e, "profile query failed; will retry on next access");
                device.set_available(false);
                return Err(ResolveError::Profiles(e));
            }
        };

        let mut state = self.lock_state();
        if state.profiles.is_pending() {
            debug!(
                device = device.name(),
                count = fetched.len(),
                "profiles resolved"
            );
            state.profiles = StageState::Ready(fetched);
        }
        Ok(())
    }

    // ── Stage 2: profile index ───────────────────────────────────────

    fn advance_profile_index(&self) -> Result<(), ResolveError> {
        let mut state = self.lock_state();
        if !state.profile_index.is_pending() {
            return Ok(());
        }

        let Some(profiles) = state.profiles.ready() else {
            // Unreachable through resolve(); kept as a guard for direct use.
            return Err(ResolveError::NoProfiles);
        };
        if profiles.is_empty() {
            return Err(ResolveError::NoProfiles);
        }

        let configured = self.settings.profile_index;
        let selected = if configured < profiles.len() {
            configured
        } else {
            let last = profiles.len() - 1;
            warn!(
                configured,
                available = profiles.len(),
                selected = last,
                "configured profile index out of range; selecting last available profile"
            );
            last
        };

        state.profile_index = StageState::Ready(selected);
        Ok(())
    }

    // ── Stage 3: stream URI ──────────────────────────────────────────

    async fn advance_stream_uri(&self, device: &Device) -> Result<(), ResolveError> {
        let token = {
            let state = self.lock_state();
            if !state.stream_uri.is_pending() {
                return Ok(());
            }
            let (Some(profiles), Some(&index)) =
                (state.profiles.ready(), state.profile_index.ready())
            else {
                return Err(ResolveError::NoProfiles);
            };
            profiles
                .get(index)
                .map(|p| p.token.clone())
                .ok_or(ResolveError::NoProfiles)?
        };

        // Suspension point: the lock is not held here.
        let uri = match self.source.stream_uri(&token).await {
            Ok(uri) => uri,
            Err(e) => {
                warn!(device = device.name(), error = %e, "stream address request failed; will retry on next access");
                device.set_available(false);
                return Err(ResolveError::StreamUri(e));
            }
        };

        let uri = if self.settings.embed_credentials {
            self.embed_credentials(uri)?
        } else {
            uri
        };

        let mut state = self.lock_state();
        if state.stream_uri.is_pending() {
            debug!(device = device.name(), uri = %uri, "stream URI resolved");
            state.stream_uri = StageState::Ready(uri);
        }
        Ok(())
    }

    /// Inject `username:password` into the URI authority. Only ever runs
    /// at commit time, so a URI is rewritten at most once.
    fn embed_credentials(&self, mut uri: Url) -> Result<Url, ResolveError> {
        uri.set_username(&self.settings.username)
            .and_then(|()| uri.set_password(Some(self.settings.password.expose_secret())))
            .map_err(|()| {
                ResolveError::StreamUri(CoreError::Internal(format!(
                    "cannot embed credentials into stream URI '{uri}'"
                )))
            })?;
        Ok(uri)
    }

    fn lock_state(&self) -> MutexGuard<'_, EndpointState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::LanCredentials;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn device() -> Device {
        Device::new(
            "cam-porch",
            "10.0.0.7".parse().unwrap(),
            "aa:bb:cc:00:11:22",
            LanCredentials::new("key", 3),
        )
    }

    fn settings_with_index(profile_index: usize) -> StreamSettings {
        StreamSettings {
            profile_index,
            ..StreamSettings::plain()
        }
    }

    /// Scriptable profile source with per-stage call counters.
    struct ScriptedSource {
        profiles: Vec<MediaProfile>,
        fail_profiles: AtomicBool,
        fail_uri: AtomicBool,
        profile_calls: AtomicUsize,
        uri_calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(profiles: Vec<MediaProfile>) -> Self {
            Self {
                profiles,
                fail_profiles: AtomicBool::new(false),
                fail_uri: AtomicBool::new(false),
                profile_calls: AtomicUsize::new(0),
                uri_calls: AtomicUsize::new(0),
            }
        }

        fn two_profiles() -> Self {
            Self::new(vec![
                MediaProfile::new("tok-main", "main").with_video(1920, 1080),
                MediaProfile::new("tok-sub", "sub").with_video(640, 360),
            ])
        }
    }

    #[async_trait::async_trait]
    impl ProfileSource for ScriptedSource {
        async fn fetch_profiles(&self) -> Result<Vec<MediaProfile>, CoreError> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_profiles.load(Ordering::SeqCst) {
                return Err(CoreError::Collaborator {
                    message: "profile query timed out".into(),
                });
            }
            Ok(self.profiles.clone())
        }

        async fn stream_uri(&self, profile_token: &str) -> Result<Url, CoreError> {
            self.uri_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_uri.load(Ordering::SeqCst) {
                return Err(CoreError::Collaborator {
                    message: "stream address request refused".into(),
                });
            }
            Ok(Url::parse(&format!("rtsp://10.0.0.7/{profile_token}")).unwrap())
        }
    }

    #[tokio::test]
    async fn full_resolution_selects_configured_profile() {
        let source = Arc::new(ScriptedSource::two_profiles());
        let resolver = EndpointResolver::new(source.clone(), settings_with_index(1));
        let dev = device();

        let endpoint = resolver.resolve(&dev).await.unwrap();
        assert_eq!(endpoint.profile_index, 1);
        assert_eq!(endpoint.stream_uri.as_str(), "rtsp://10.0.0.7/tok-sub");
        assert_eq!(source.profile_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.uri_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_resolve_never_requeries_ready_stages() {
        let source = Arc::new(ScriptedSource::two_profiles());
        let resolver = EndpointResolver::new(source.clone(), settings_with_index(0));
        let dev = device();

        resolver.resolve(&dev).await.unwrap();
        resolver.resolve(&dev).await.unwrap();
        resolver.resolve(&dev).await.unwrap();

        assert_eq!(source.profile_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.uri_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn profile_failure_is_stage_local_and_retryable() {
        let source = Arc::new(ScriptedSource::two_profiles());
        source.fail_profiles.store(true, Ordering::SeqCst);
        let resolver = EndpointResolver::new(source.clone(), settings_with_index(0));
        let dev = device();

        let err = resolver.resolve(&dev).await.unwrap_err();
        assert_eq!(err.stage(), ResolveStage::Profiles);
        assert!(!dev.is_available());
        // The URI stage never ran.
        assert_eq!(source.uri_calls.load(Ordering::SeqCst), 0);

        // Transient failure clears; only the failed stage retries.
        source.fail_profiles.store(false, Ordering::SeqCst);
        resolver.resolve(&dev).await.unwrap();
        assert_eq!(source.profile_calls.load(Ordering::SeqCst), 2);
        assert_eq!(source.uri_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn uri_failure_keeps_profiles_resolved() {
        let source = Arc::new(ScriptedSource::two_profiles());
        source.fail_uri.store(true, Ordering::SeqCst);
        let resolver = EndpointResolver::new(source.clone(), settings_with_index(0));
        let dev = device();

        let err = resolver.resolve(&dev).await.unwrap_err();
        assert_eq!(err.stage(), ResolveStage::StreamUri);

        source.fail_uri.store(false, Ordering::SeqCst);
        resolver.resolve(&dev).await.unwrap();
        // Profiles were fetched exactly once across both attempts.
        assert_eq!(source.profile_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.uri_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn out_of_range_index_selects_last_available() {
        let source = Arc::new(ScriptedSource::two_profiles());
        let resolver = EndpointResolver::new(source, settings_with_index(5));
        let dev = device();

        let endpoint = resolver.resolve(&dev).await.unwrap();
        assert_eq!(endpoint.profile_index, 1);
    }

    #[tokio::test]
    async fn empty_profile_list_is_a_distinct_recoverable_error() {
        let source = Arc::new(ScriptedSource::new(Vec::new()));
        let resolver = EndpointResolver::new(source.clone(), settings_with_index(0));
        let dev = device();

        let err = resolver.resolve(&dev).await.unwrap_err();
        assert!(matches!(err, ResolveError::NoProfiles));
        assert_eq!(err.stage(), ResolveStage::ProfileIndex);
        // Profiles stage itself succeeded and is not re-fetched.
        let _ = resolver.resolve(&dev).await.unwrap_err();
        assert_eq!(source.profile_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn credential_embedding_applied_exactly_once() {
        let source = Arc::new(ScriptedSource::new(vec![MediaProfile::new(
            "path", "main",
        )]));
        let settings = StreamSettings {
            profile_index: 0,
            embed_credentials: true,
            username: "u".into(),
            password: SecretString::from("p".to_owned()),
        };
        let resolver = EndpointResolver::new(source, settings);
        let dev = device();

        let first = resolver.resolve(&dev).await.unwrap();
        assert_eq!(first.stream_uri.as_str(), "rtsp://u:p@10.0.0.7/path");

        // Resolving again must not double the credentials.
        let second = resolver.resolve(&dev).await.unwrap();
        assert_eq!(second.stream_uri.as_str(), "rtsp://u:p@10.0.0.7/path");
    }

    #[tokio::test]
    async fn stream_uri_accessor_tracks_pipeline_completion() {
        let source = Arc::new(ScriptedSource::two_profiles());
        let resolver = EndpointResolver::new(source, settings_with_index(0));
        let dev = device();

        assert!(resolver.stream_uri().is_none());
        resolver.resolve(&dev).await.unwrap();
        assert!(resolver.stream_uri().is_some());
    }
}
