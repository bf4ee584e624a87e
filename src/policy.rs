use crate::k8s::Connection;
use crate::view::{RbacScope, View};
use anyhow::{Context, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Identity families a permission-policy view can be scoped to.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SubjectKind {
    User,
    Group,
    ServiceAccount,
}

impl SubjectKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "u" => Some(Self::User),
            "g" => Some(Self::Group),
            "s" => Some(Self::ServiceAccount),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
            Self::ServiceAccount => "ServiceAccount",
        }
    }
}

/// Drill-down behaviors a descriptor can carry. Resolution may need a
/// cluster round trip, so the rule is named here and executed by the
/// dispatcher rather than baked into a function pointer.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EnterRule {
    /// Role-flavored kinds: open an RBAC view for the selection itself,
    /// scoped by whether the originating kind is namespaced.
    RbacByKind,
    /// Follow a cluster role binding to the cluster role it references.
    ClusterRoleRef,
    /// Follow a namespaced role binding to the role it references.
    RoleRef,
    /// Open the service-account policy view for the selection.
    SubjectPolicy,
}

fn policy_matcher() -> &'static Regex {
    static MATCHER: OnceLock<Regex> = OnceLock::new();
    MATCHER.get_or_init(|| {
        Regex::new(r"\Apol\s([ugs]):([\w:-]+)\b").expect("policy matcher pattern is valid")
    })
}

/// Parses the policy command grammar `pol <u|g|s>:<id>`. Anchored at the
/// start of the string; both captures must be present.
pub fn parse_policy_command(cmd: &str) -> Option<(SubjectKind, String)> {
    let captures = policy_matcher().captures(cmd)?;
    let kind = SubjectKind::from_token(captures.get(1)?.as_str())?;
    let id = captures.get(2)?.as_str().to_string();
    Some((kind, id))
}

/// Splits a namespace-qualified selection `ns/name` into its parts. A
/// selection without a separator belongs to no namespace.
pub fn namespaced(selection: &str) -> (&str, &str) {
    match selection.split_once('/') {
        Some((namespace, name)) => (namespace, name),
        None => ("", selection),
    }
}

pub fn fqn(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}/{name}")
    }
}

/// Executes a drill-down rule for the selected row of a resource view.
/// A failed upstream fetch surfaces as an error for the caller to flash;
/// no navigation happens in that case.
pub async fn resolve_enter<C>(
    rule: EnterRule,
    conn: &C,
    namespace: &str,
    resource: &str,
    selection: &str,
) -> Result<View>
where
    C: Connection + ?Sized,
{
    match rule {
        EnterRule::RbacByKind => {
            let scope = if resource == "role" {
                RbacScope::Role
            } else {
                RbacScope::ClusterRole
            };
            Ok(View::Rbac {
                scope,
                namespace: namespace.to_string(),
                target: selection.to_string(),
            })
        }
        EnterRule::ClusterRoleRef => {
            let role = conn
                .cluster_role_binding_role(selection)
                .await
                .with_context(|| format!("unable to retrieve cluster role binding {selection}"))?;
            Ok(View::Rbac {
                scope: RbacScope::ClusterRole,
                namespace: namespace.to_string(),
                target: role,
            })
        }
        EnterRule::RoleRef => {
            let (ns, name) = namespaced(selection);
            let role = conn
                .role_binding_role(ns, name)
                .await
                .with_context(|| format!("unable to retrieve role binding {selection}"))?;
            Ok(View::Rbac {
                scope: RbacScope::Role,
                namespace: ns.to_string(),
                target: fqn(ns, &role),
            })
        }
        EnterRule::SubjectPolicy => {
            let (_, name) = namespaced(selection);
            Ok(View::Policy {
                subject: SubjectKind::ServiceAccount,
                name: name.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SubjectKind, fqn, namespaced, parse_policy_command};

    #[test]
    fn policy_grammar_accepts_each_subject_kind() {
        assert_eq!(
            parse_policy_command("pol u:alice"),
            Some((SubjectKind::User, "alice".to_string())),
        );
        assert_eq!(
            parse_policy_command("pol g:devs"),
            Some((SubjectKind::Group, "devs".to_string())),
        );
        assert_eq!(
            parse_policy_command("pol s:default"),
            Some((SubjectKind::ServiceAccount, "default".to_string())),
        );
    }

    #[test]
    fn policy_grammar_allows_qualified_identifiers() {
        assert_eq!(
            parse_policy_command("pol s:system:serviceaccount-name"),
            Some((
                SubjectKind::ServiceAccount,
                "system:serviceaccount-name".to_string()
            )),
        );
    }

    #[test]
    fn policy_grammar_rejects_near_misses() {
        assert_eq!(parse_policy_command("polx u:alice"), None);
        assert_eq!(parse_policy_command("pol z:alice"), None);
        assert_eq!(parse_policy_command("pol u:"), None);
        assert_eq!(parse_policy_command("xpol u:alice"), None);
    }

    #[test]
    fn namespaced_splits_qualified_selections() {
        assert_eq!(namespaced("kube-system/admin"), ("kube-system", "admin"));
        assert_eq!(namespaced("admin"), ("", "admin"));
    }

    #[test]
    fn fqn_joins_only_with_a_namespace() {
        assert_eq!(fqn("kube-system", "admin"), "kube-system/admin");
        assert_eq!(fqn("", "admin"), "admin");
    }
}
