use crate::classify::RemoteAsset;
use crate::classify::RetentionPolicy;
use crate::classify::classify;
use crate::template::AssetNameTemplate;
use crate::template::ShortCommit;
use anyhow::Context as _;
use async_trait::async_trait;
use chrono::Utc;

/// Remote operations the rotation needs from the hosting service.
///
/// Implementations bind the release coordinates at construction and must
/// return assets sorted ascending by creation time.
#[async_trait]
pub trait ReleaseHost: Send + Sync {
    async fn list_assets(&self) -> anyhow::Result<Vec<RemoteAsset>>;
    async fn delete_asset(&self, id: u64) -> anyhow::Result<()>;
    async fn upload_asset(
        &self,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> anyhow::Result<String>;
}

/// Artifact bytes plus their declared content type, read by the caller.
#[derive(Debug, Clone)]
pub struct ArtifactPayload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Progress marker for the destructive call sequence. A failed run reports
/// the state it was interrupted in, so the release can be reconciled by
/// checking the remote assets against the expected qualified name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    Start,
    CollisionCleared,
    Uploaded,
    StaleCleaned,
}

impl RotationState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::CollisionCleared => "collision-cleared",
            Self::Uploaded => "uploaded",
            Self::StaleCleaned => "stale-cleaned",
        }
    }
}

/// What one rotation run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotateOutcome {
    pub uploaded: bool,
    /// Public download URL of the new asset, when one was uploaded.
    pub url: Option<String>,
    pub pruned: usize,
    pub prune_failures: usize,
}

/// Run one full rotation cycle against `host`, naming the new asset for
/// today's UTC date.
///
/// Strictly sequential: a name collision is cleared before the upload, and
/// stale assets are only pruned once the upload has landed. An interrupted
/// run therefore leaves the release with an extra asset, never a missing
/// one. Prune failures after a successful upload do not fail the run; they
/// are counted in the outcome and the remaining deletions are still
/// attempted.
pub async fn rotate(
    host: &dyn ReleaseHost,
    template: &AssetNameTemplate,
    commit: &ShortCommit,
    policy: &RetentionPolicy,
    artifact: ArtifactPayload,
) -> anyhow::Result<RotateOutcome> {
    let qualified_name = template.qualified_name(Utc::now().date_naive(), commit);
    let mut state = RotationState::Start;

    tracing::info!("checking previous assets for {qualified_name}");
    let assets = host
        .list_assets()
        .await
        .with_context(|| format!("listing release assets (state: {})", state.as_str()))?;

    let decision = classify(&assets, &qualified_name, template, commit, policy);

    if decision.already_released {
        tracing::info!("current commit already released, skipping upload");
        return Ok(RotateOutcome::default());
    }

    if let Some(id) = decision.replace_id {
        tracing::info!("deleting asset {id} with the colliding name first");
        host.delete_asset(id)
            .await
            .with_context(|| format!("clearing name collision (state: {})", state.as_str()))?;
    }
    state = RotationState::CollisionCleared;

    tracing::info!("uploading asset as {qualified_name}");
    let url = host
        .upload_asset(&qualified_name, &artifact.content_type, artifact.bytes)
        .await
        .with_context(|| format!("uploading `{qualified_name}` (state: {})", state.as_str()))?;
    state = RotationState::Uploaded;

    let mut pruned = 0usize;
    let mut prune_failures = 0usize;
    tracing::info!("deleting {} stale assets", decision.to_delete.len());
    for id in &decision.to_delete {
        match host.delete_asset(*id).await {
            Ok(()) => pruned += 1,
            Err(err) => {
                // The upload already landed; keep attempting the rest.
                tracing::warn!("failed to prune stale asset {id}: {err:#}");
                prune_failures += 1;
            }
        }
    }
    state = RotationState::StaleCleaned;
    tracing::debug!(
        "rotation complete (state: {}, pruned {pruned}, failed {prune_failures})",
        state.as_str()
    );

    Ok(RotateOutcome {
        uploaded: true,
        url: Some(url),
        pruned,
        prune_failures,
    })
}
