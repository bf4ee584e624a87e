use crate::k8s::Connection;
use tracing::error;

/// Outcome of probing the cluster for one capability group.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CapabilityResolution {
    Supported(String),
    Unsupported,
}

/// Probes the cluster for support of `group`, preferring candidates in the
/// order given. One discovery round trip; a probe failure is logged and
/// reported as unsupported so dependent catalog entries are simply
/// omitted.
///
/// The returned version is always drawn from `candidates`; callers treat
/// anything else as a broken invariant.
pub async fn resolve<C>(conn: &C, group: &str, candidates: &[&str]) -> CapabilityResolution
where
    C: Connection + ?Sized,
{
    let supported = match conn.group_versions(group).await {
        Ok(versions) => versions,
        Err(err) => {
            error!("checking {group} API versions failed: {err:#}");
            return CapabilityResolution::Unsupported;
        }
    };

    match preferred_version(candidates, &supported) {
        Some(version) => CapabilityResolution::Supported(version.to_string()),
        None => CapabilityResolution::Unsupported,
    }
}

/// Picks the first candidate the cluster reports support for. Candidate
/// order is authoritative; the order of the supported set is not.
pub fn preferred_version<'a>(candidates: &[&'a str], supported: &[String]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .find(|candidate| supported.iter().any(|version| version == candidate))
}
