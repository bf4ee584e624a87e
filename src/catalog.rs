use crate::capability::{self, CapabilityResolution};
use crate::color::{self, ColorerFn, DecorateFn};
use crate::discovery;
use crate::k8s::Connection;
use crate::model::{AutoscalerVersion, BuiltinKind, CustomResourceEntry};
use crate::policy::{EnterRule, SubjectKind};
use std::collections::HashMap;
use tracing::warn;

/// Optional per-kind behaviors carried by a descriptor and applied to a
/// constructed view in a fixed order: colorer, enter, decorate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewHooks {
    pub colorer: Option<ColorerFn>,
    pub enter: Option<EnterRule>,
    pub decorate: Option<DecorateFn>,
}

/// How a descriptor produces its initial table data. Kinds without a list
/// spec build their listing lazily inside the view.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ListSpec {
    Builtin(BuiltinKind),
    Autoscaler(AutoscalerVersion),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ViewFactory {
    Resource,
    Subject(SubjectKind),
}

/// One catalog entry: everything the dispatcher needs to turn a command
/// keyword into a live view. Registered once per catalog build and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub title: &'static str,
    pub api_group: &'static str,
    pub list: Option<ListSpec>,
    pub view: ViewFactory,
    pub hooks: ViewHooks,
}

impl ResourceDescriptor {
    fn listed(title: &'static str, api_group: &'static str, kind: BuiltinKind) -> Self {
        Self {
            title,
            api_group,
            list: Some(ListSpec::Builtin(kind)),
            view: ViewFactory::Resource,
            hooks: ViewHooks::default(),
        }
    }

    fn with_colorer(mut self, colorer: ColorerFn) -> Self {
        self.hooks.colorer = Some(colorer);
        self
    }

    fn with_enter(mut self, enter: EnterRule) -> Self {
        self.hooks.enter = Some(enter);
        self
    }

    fn with_decorate(mut self, decorate: DecorateFn) -> Self {
        self.hooks.decorate = Some(decorate);
        self
    }
}

const RBAC_GROUP: &str = "rbac.authorization.k8s.io";

/// Candidate autoscaling versions, oldest stable first. The order is the
/// selection precedence, not an arbitrary set.
pub const AUTOSCALER_CANDIDATES: [&str; 3] = ["v1", "v2beta1", "v2beta2"];

/// The fixed built-in command table.
pub fn builtin_commands() -> HashMap<&'static str, ResourceDescriptor> {
    use BuiltinKind as K;

    let mut cmds = HashMap::new();

    cmds.insert("cm", ResourceDescriptor::listed("ConfigMaps", "", K::ConfigMaps));
    cmds.insert(
        "cr",
        ResourceDescriptor::listed("ClusterRoles", RBAC_GROUP, K::ClusterRoles)
            .with_enter(EnterRule::RbacByKind),
    );
    cmds.insert(
        "crb",
        ResourceDescriptor::listed("ClusterRoleBindings", RBAC_GROUP, K::ClusterRoleBindings)
            .with_enter(EnterRule::ClusterRoleRef),
    );
    cmds.insert(
        "crd",
        ResourceDescriptor::listed(
            "CustomResourceDefinitions",
            "apiextensions.k8s.io",
            K::CustomResourceDefinitions,
        ),
    );
    cmds.insert("cj", ResourceDescriptor::listed("CronJobs", "batch", K::CronJobs));
    cmds.insert(
        "ctx",
        ResourceDescriptor::listed("Contexts", "", K::Contexts)
            .with_colorer(color::ctx_colorer)
            .with_decorate(color::ctx_decorator),
    );
    cmds.insert(
        "ds",
        ResourceDescriptor::listed("DaemonSets", "apps", K::DaemonSets)
            .with_colorer(color::replica_colorer),
    );
    cmds.insert(
        "dp",
        ResourceDescriptor::listed("Deployments", "apps", K::Deployments)
            .with_colorer(color::deploy_colorer),
    );
    cmds.insert("ep", ResourceDescriptor::listed("Endpoints", "", K::Endpoints));
    cmds.insert(
        "ev",
        ResourceDescriptor::listed("Events", "", K::Events).with_colorer(color::event_colorer),
    );
    cmds.insert(
        "ing",
        ResourceDescriptor::listed("Ingress", "networking.k8s.io", K::Ingresses),
    );
    cmds.insert("jo", ResourceDescriptor::listed("Jobs", "batch", K::Jobs));
    cmds.insert(
        "no",
        ResourceDescriptor::listed("Nodes", "", K::Nodes).with_colorer(color::ns_colorer),
    );
    cmds.insert(
        "ns",
        ResourceDescriptor::listed("Namespaces", "", K::Namespaces).with_colorer(color::ns_colorer),
    );
    cmds.insert(
        "pdb",
        ResourceDescriptor::listed("PodDisruptionBudgets", "policy", K::PodDisruptionBudgets)
            .with_colorer(color::pdb_colorer),
    );
    cmds.insert(
        "po",
        ResourceDescriptor::listed("Pods", "", K::Pods).with_colorer(color::pod_colorer),
    );
    cmds.insert(
        "pv",
        ResourceDescriptor::listed("PersistentVolumes", "", K::PersistentVolumes)
            .with_colorer(color::pv_colorer),
    );
    cmds.insert(
        "pvc",
        ResourceDescriptor::listed("PersistentVolumeClaims", "", K::PersistentVolumeClaims)
            .with_colorer(color::pvc_colorer),
    );
    cmds.insert(
        "rb",
        ResourceDescriptor::listed("RoleBindings", RBAC_GROUP, K::RoleBindings)
            .with_enter(EnterRule::RoleRef),
    );
    cmds.insert(
        "rc",
        ResourceDescriptor::listed("ReplicationControllers", "", K::ReplicationControllers)
            .with_colorer(color::replica_colorer),
    );
    cmds.insert(
        "ro",
        ResourceDescriptor::listed("Roles", RBAC_GROUP, K::Roles).with_enter(EnterRule::RbacByKind),
    );
    cmds.insert(
        "rs",
        ResourceDescriptor::listed("ReplicaSets", "apps", K::ReplicaSets)
            .with_colorer(color::replica_colorer),
    );
    cmds.insert(
        "sa",
        ResourceDescriptor::listed("ServiceAccounts", "", K::ServiceAccounts)
            .with_enter(EnterRule::SubjectPolicy),
    );
    cmds.insert("sec", ResourceDescriptor::listed("Secrets", "", K::Secrets));
    cmds.insert(
        "sts",
        ResourceDescriptor::listed("StatefulSets", "apps", K::StatefulSets)
            .with_colorer(color::sts_colorer),
    );
    cmds.insert("svc", ResourceDescriptor::listed("Services", "", K::Services));
    cmds.insert(
        "usr",
        ResourceDescriptor {
            title: "Users",
            api_group: "",
            list: None,
            view: ViewFactory::Subject(SubjectKind::User),
            hooks: ViewHooks::default(),
        },
    );
    cmds.insert(
        "grp",
        ResourceDescriptor {
            title: "Groups",
            api_group: "",
            list: None,
            view: ViewFactory::Subject(SubjectKind::Group),
            hooks: ViewHooks::default(),
        },
    );

    cmds
}

/// Maps a resolved autoscaling version to the `hpa` descriptor, `None` for
/// anything outside the candidate set. Pure so version gating is testable
/// without a cluster.
pub fn autoscaler_descriptor(version: &str) -> Option<ResourceDescriptor> {
    let version = AutoscalerVersion::from_version(version)?;
    Some(ResourceDescriptor {
        title: "HorizontalPodAutoscalers",
        api_group: "autoscaling",
        list: Some(ListSpec::Autoscaler(version)),
        view: ViewFactory::Resource,
        hooks: ViewHooks::default(),
    })
}

/// Result of a catalog lookup: which of the two mappings answered.
#[derive(Debug)]
pub enum CommandTarget<'a> {
    Builtin(&'a ResourceDescriptor),
    Custom(&'a CustomResourceEntry),
}

/// Immutable command registry snapshot: the fixed built-in table
/// (including capability-gated entries) and the cluster-discovered custom
/// resource index. The two mappings stay separate and are combined at
/// lookup time so built-in precedence is structural.
#[derive(Debug, Default)]
pub struct Catalog {
    builtins: HashMap<&'static str, ResourceDescriptor>,
    custom: HashMap<String, CustomResourceEntry>,
}

impl Catalog {
    /// Builds a catalog snapshot against the live connection. Probe and
    /// discovery failures degrade (logged, entries omitted); the build
    /// itself always succeeds.
    ///
    /// Panics when the capability resolver reports a version outside the
    /// candidates it was offered. That is a broken internal contract, not
    /// a runtime condition, and the process must not continue on it.
    pub async fn build<C>(conn: &C) -> Self
    where
        C: Connection + ?Sized,
    {
        let mut builtins = builtin_commands();

        match capability::resolve(conn, "autoscaling", &AUTOSCALER_CANDIDATES).await {
            CapabilityResolution::Supported(version) => {
                let descriptor = autoscaler_descriptor(&version).unwrap_or_else(|| {
                    panic!(
                        "autoscaling capability resolved to {version}, which is not an offered candidate"
                    )
                });
                builtins.insert("hpa", descriptor);
            }
            CapabilityResolution::Unsupported => {
                warn!("horizontal pod autoscalers are not supported on this cluster");
            }
        }

        let custom = discovery::discover(conn).await;

        Self { builtins, custom }
    }

    /// Built-ins first, then the custom index. A custom resource that
    /// shadows a built-in keyword never wins.
    pub fn lookup(&self, cmd: &str) -> Option<CommandTarget<'_>> {
        if let Some(descriptor) = self.builtins.get(cmd) {
            return Some(CommandTarget::Builtin(descriptor));
        }
        self.custom.get(cmd).map(CommandTarget::Custom)
    }

    pub fn builtin_keywords(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.builtins.keys().copied()
    }

    pub fn custom_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.custom.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AUTOSCALER_CANDIDATES, Catalog, CommandTarget, ListSpec, autoscaler_descriptor,
        builtin_commands,
    };
    use crate::k8s::Connection;
    use crate::model::{AutoscalerVersion, BuiltinKind, NamespaceScope, TableData};
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use serde_json::{Value, json};

    struct FakeConnection {
        autoscaling: Vec<String>,
        autoscaling_fails: bool,
        crds: Vec<Value>,
    }

    impl FakeConnection {
        fn new() -> Self {
            Self {
                autoscaling: Vec::new(),
                autoscaling_fails: false,
                crds: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl Connection for FakeConnection {
        fn default_namespace(&self) -> String {
            "default".to_string()
        }

        async fn group_versions(&self, _group: &str) -> Result<Vec<String>> {
            if self.autoscaling_fails {
                bail!("discovery endpoint unreachable");
            }
            Ok(self.autoscaling.clone())
        }

        async fn raw_custom_resource_definitions(&self) -> Result<Vec<Value>> {
            Ok(self.crds.clone())
        }

        async fn list_builtin(
            &self,
            _kind: BuiltinKind,
            _scope: &NamespaceScope,
        ) -> Result<TableData> {
            Ok(TableData::default())
        }

        async fn list_autoscalers(
            &self,
            _version: AutoscalerVersion,
            _scope: &NamespaceScope,
        ) -> Result<TableData> {
            Ok(TableData::default())
        }

        async fn list_custom(
            &self,
            _group: &str,
            _version: &str,
            _kind: &str,
            _name: &str,
            _scope: &NamespaceScope,
        ) -> Result<TableData> {
            Ok(TableData::default())
        }

        async fn cluster_role_binding_role(&self, _name: &str) -> Result<String> {
            bail!("not wired");
        }

        async fn role_binding_role(&self, _namespace: &str, _name: &str) -> Result<String> {
            bail!("not wired");
        }
    }

    const EXPECTED_TITLES: [(&str, &str); 28] = [
        ("cm", "ConfigMaps"),
        ("cr", "ClusterRoles"),
        ("crb", "ClusterRoleBindings"),
        ("crd", "CustomResourceDefinitions"),
        ("cj", "CronJobs"),
        ("ctx", "Contexts"),
        ("ds", "DaemonSets"),
        ("dp", "Deployments"),
        ("ep", "Endpoints"),
        ("ev", "Events"),
        ("ing", "Ingress"),
        ("jo", "Jobs"),
        ("no", "Nodes"),
        ("ns", "Namespaces"),
        ("pdb", "PodDisruptionBudgets"),
        ("po", "Pods"),
        ("pv", "PersistentVolumes"),
        ("pvc", "PersistentVolumeClaims"),
        ("rb", "RoleBindings"),
        ("rc", "ReplicationControllers"),
        ("ro", "Roles"),
        ("rs", "ReplicaSets"),
        ("sa", "ServiceAccounts"),
        ("sec", "Secrets"),
        ("sts", "StatefulSets"),
        ("svc", "Services"),
        ("usr", "Users"),
        ("grp", "Groups"),
    ];

    #[test]
    fn builtin_table_matches_command_vocabulary() {
        let cmds = builtin_commands();
        assert_eq!(cmds.len(), EXPECTED_TITLES.len());
        for (keyword, title) in EXPECTED_TITLES {
            let descriptor = cmds
                .get(keyword)
                .unwrap_or_else(|| panic!("missing built-in {keyword}"));
            assert_eq!(descriptor.title, title, "title mismatch for {keyword}");
        }
    }

    #[test]
    fn subject_views_have_no_list_spec() {
        let cmds = builtin_commands();
        assert!(cmds["usr"].list.is_none());
        assert!(cmds["grp"].list.is_none());
        assert!(cmds["po"].list.is_some());
    }

    #[test]
    fn autoscaler_descriptor_covers_exactly_the_candidates() {
        for candidate in AUTOSCALER_CANDIDATES {
            let descriptor = autoscaler_descriptor(candidate).unwrap();
            assert_eq!(descriptor.title, "HorizontalPodAutoscalers");
            assert_eq!(
                descriptor.list,
                Some(ListSpec::Autoscaler(
                    AutoscalerVersion::from_version(candidate).unwrap()
                )),
            );
        }
        assert!(autoscaler_descriptor("v2").is_none());
        assert!(autoscaler_descriptor("").is_none());
    }

    #[tokio::test]
    async fn hpa_is_registered_when_a_candidate_is_supported() {
        let conn = FakeConnection {
            autoscaling: vec!["v2beta2".to_string(), "v2beta1".to_string()],
            ..FakeConnection::new()
        };
        let catalog = Catalog::build(&conn).await;
        match catalog.lookup("hpa") {
            Some(CommandTarget::Builtin(descriptor)) => assert_eq!(
                descriptor.list,
                Some(ListSpec::Autoscaler(AutoscalerVersion::V2Beta1)),
            ),
            other => panic!("expected built-in hpa, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn hpa_is_omitted_when_unsupported_or_probe_fails() {
        let conn = FakeConnection::new();
        let catalog = Catalog::build(&conn).await;
        assert!(catalog.lookup("hpa").is_none());

        let conn = FakeConnection {
            autoscaling_fails: true,
            ..FakeConnection::new()
        };
        let catalog = Catalog::build(&conn).await;
        assert!(catalog.lookup("hpa").is_none());
    }

    #[tokio::test]
    async fn builtin_lookup_precedes_custom_names() {
        let conn = FakeConnection {
            crds: vec![json!({
                "spec": {
                    "group": "shadow.example.com",
                    "names": {"kind": "Pod", "plural": "po", "shortNames": ["svc"]},
                    "versions": [{"name": "v1", "storage": true}],
                },
            })],
            ..FakeConnection::new()
        };
        let catalog = Catalog::build(&conn).await;

        for shadowed in ["po", "svc"] {
            match catalog.lookup(shadowed) {
                Some(CommandTarget::Builtin(_)) => {}
                other => panic!("expected built-in for {shadowed}, got {other:?}"),
            }
        }
        // The shadowed names are still indexed, just never reached.
        assert!(catalog.custom_names().any(|name| name == "po"));
    }

    #[tokio::test]
    async fn custom_names_resolve_when_not_shadowed() {
        let conn = FakeConnection {
            crds: vec![json!({
                "spec": {
                    "group": "stable.example.com",
                    "names": {"kind": "Book", "plural": "books", "singular": "book"},
                    "versions": [{"name": "v1", "storage": true}],
                },
            })],
            ..FakeConnection::new()
        };
        let catalog = Catalog::build(&conn).await;

        match catalog.lookup("books") {
            Some(CommandTarget::Custom(entry)) => assert_eq!(entry.kind, "Book"),
            other => panic!("expected custom entry, got {other:?}"),
        }
        assert!(catalog.lookup("zzqq").is_none());
    }
}
