//! Changed-file to artifact attribution.

use stratum_domain::Manifest;

/// Resolve the artifact owning a repository-relative path.
///
/// A path belongs to an artifact only when it equals the artifact's
/// directory-prefixed name or sits strictly below it as a whole path
/// segment. A prefix that is not a segment must not match: `pkg2/x.py`
/// does not belong to `pkg`.
pub fn artifact_from_path(path: &str, manifest: &Manifest) -> Option<String> {
    for (name, artifact) in manifest.iter() {
        let root = artifact.path();
        if path == root || path.starts_with(&format!("{}/", root)) {
            return Some(name.clone());
        }
    }
    None
}
