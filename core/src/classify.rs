use crate::template::AssetNameTemplate;
use crate::template::ShortCommit;
use chrono::DateTime;
use chrono::Utc;
use regex::Regex;

/// Snapshot of one asset already attached to the release.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RemoteAsset {
    pub id: u64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// How many matching assets to keep, and what counts as a match.
#[derive(Debug, Clone, Default)]
pub struct RetentionPolicy {
    /// `None` keeps every matching asset; `Some(0)` queues every match for
    /// deletion from the first one.
    pub max_releases: Option<u32>,
    /// When set, retention matches names against this pattern before falling
    /// back to the template's prefix/suffix split.
    pub match_pattern: Option<Regex>,
}

/// Outcome of one classification pass over a release's assets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Ids of stale assets to prune, oldest first.
    pub to_delete: Vec<u64>,
    /// Asset whose name collides exactly with the new qualified name.
    pub replace_id: Option<u64>,
    /// The current commit already has an asset under this template.
    pub already_released: bool,
}

/// Partition `assets` into stale deletions, an exact-name collision, and the
/// already-released short circuit.
///
/// `assets` must be sorted ascending by creation time; a single pass walks
/// them oldest to newest. Per asset, exactly one branch applies, tested in
/// this order: exact name match, retention pattern match, then the
/// template's structural prefix/suffix match. A structural match embedding
/// `-<commit>` right before the suffix proves the current commit was already
/// released, and classification stops there.
pub fn classify(
    assets: &[RemoteAsset],
    qualified_name: &str,
    template: &AssetNameTemplate,
    commit: &ShortCommit,
    policy: &RetentionPolicy,
) -> Classification {
    let released_marker = format!("-{}{}", commit.as_str(), template.suffix());
    let mut result = Classification::default();
    let mut matched = 0u32;

    for asset in assets {
        if asset.name == qualified_name {
            // The remote side rejects duplicate names, so this copy has to
            // be cleared before the new upload can land.
            tracing::debug!("asset {} collides with the new name", asset.name);
            result.replace_id = Some(asset.id);
        } else if policy
            .match_pattern
            .as_ref()
            .is_some_and(|re| re.is_match(&asset.name))
        {
            matched += 1;
            if policy.max_releases.is_some_and(|max| matched >= max) {
                tracing::debug!("queuing stale asset {} (pattern match)", asset.name);
                result.to_delete.push(asset.id);
            }
        } else if asset.name.starts_with(template.prefix())
            && asset.name.ends_with(template.suffix())
        {
            if asset.name.ends_with(&released_marker) {
                tracing::debug!("asset {} already carries the current commit", asset.name);
                result.already_released = true;
                break;
            }
            matched += 1;
            if policy.max_releases.is_some_and(|max| matched >= max) {
                tracing::debug!("queuing stale asset {} (template match)", asset.name);
                result.to_delete.push(asset.id);
            }
        }
    }

    result
}
