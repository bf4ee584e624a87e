use chrono::{DateTime, Local};
use std::fmt::{Display, Formatter};

/// Built-in resource kinds the gateway knows how to list with typed clients.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum BuiltinKind {
    ConfigMaps,
    ClusterRoles,
    ClusterRoleBindings,
    CustomResourceDefinitions,
    CronJobs,
    Contexts,
    DaemonSets,
    Deployments,
    Endpoints,
    Events,
    Ingresses,
    Jobs,
    Nodes,
    Namespaces,
    PodDisruptionBudgets,
    Pods,
    PersistentVolumes,
    PersistentVolumeClaims,
    RoleBindings,
    ReplicationControllers,
    Roles,
    ReplicaSets,
    ServiceAccounts,
    Secrets,
    StatefulSets,
    Services,
}

/// Autoscaling API versions the catalog can gate the `hpa` command on.
/// Candidate order lives in the catalog; this is only the closed set of
/// versions the gateway has a listing for.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum AutoscalerVersion {
    V1,
    V2Beta1,
    V2Beta2,
}

impl AutoscalerVersion {
    pub fn from_version(version: &str) -> Option<Self> {
        match version {
            "v1" => Some(Self::V1),
            "v2beta1" => Some(Self::V2Beta1),
            "v2beta2" => Some(Self::V2Beta2),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2Beta1 => "v2beta1",
            Self::V2Beta2 => "v2beta2",
        }
    }
}

/// One discovered custom resource definition, reduced to what command
/// resolution needs. Any of the name fields may be empty when the
/// definition's metadata was missing or mistyped.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct CustomResourceEntry {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
    pub singular: String,
    pub aliases: Vec<String>,
}

impl CustomResourceEntry {
    /// The name used for generic listing: plural when present, singular
    /// otherwise.
    pub fn preferred_name(&self) -> &str {
        if self.plural.is_empty() {
            &self.singular
        } else {
            &self.plural
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NamespaceScope {
    All,
    Named(String),
}

impl Display for NamespaceScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Named(namespace) => write!(f, "{namespace}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowData {
    pub name: String,
    pub namespace: Option<String>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<RowData>,
    pub last_refreshed: Option<DateTime<Local>>,
    pub error: Option<String>,
}

impl TableData {
    pub fn set_rows(
        &mut self,
        headers: Vec<String>,
        rows: Vec<RowData>,
        refreshed_at: DateTime<Local>,
    ) {
        self.headers = headers;
        self.rows = rows;
        self.last_refreshed = Some(refreshed_at);
        self.error = None;
    }

    pub fn set_error(&mut self, error: impl Into<String>, refreshed_at: DateTime<Local>) {
        self.rows.clear();
        self.error = Some(error.into());
        self.last_refreshed = Some(refreshed_at);
    }
}

/// What happened to a row since the previous refresh, as reported by the
/// table widget's watch machinery. Colorer hooks key off this plus the row
/// contents.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RowAction {
    Added,
    Updated,
    Deleted,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowEvent {
    pub action: RowAction,
    pub row: RowData,
}

impl RowEvent {
    pub fn unchanged(row: RowData) -> Self {
        Self {
            action: RowAction::Unchanged,
            row,
        }
    }

    /// Column accessor tolerant of short rows.
    pub fn column(&self, index: usize) -> &str {
        self.row
            .columns
            .get(index)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::{AutoscalerVersion, CustomResourceEntry, RowData, RowEvent, TableData};
    use chrono::Local;

    #[test]
    fn autoscaler_versions_round_trip() {
        for version in [
            AutoscalerVersion::V1,
            AutoscalerVersion::V2Beta1,
            AutoscalerVersion::V2Beta2,
        ] {
            assert_eq!(AutoscalerVersion::from_version(version.as_str()), Some(version));
        }
        assert_eq!(AutoscalerVersion::from_version("v2"), None);
    }

    #[test]
    fn preferred_name_falls_back_to_singular() {
        let entry = CustomResourceEntry {
            plural: String::new(),
            singular: "widget".to_string(),
            ..CustomResourceEntry::default()
        };
        assert_eq!(entry.preferred_name(), "widget");

        let entry = CustomResourceEntry {
            plural: "widgets".to_string(),
            singular: "widget".to_string(),
            ..CustomResourceEntry::default()
        };
        assert_eq!(entry.preferred_name(), "widgets");
    }

    #[test]
    fn set_error_clears_rows() {
        let mut table = TableData::default();
        table.set_rows(
            vec!["Name".to_string()],
            vec![RowData {
                name: "web".to_string(),
                namespace: None,
                columns: vec!["web".to_string()],
            }],
            Local::now(),
        );
        table.set_error("boom", Local::now());
        assert!(table.rows.is_empty());
        assert_eq!(table.error.as_deref(), Some("boom"));
    }

    #[test]
    fn row_event_column_is_tolerant() {
        let event = RowEvent::unchanged(RowData {
            name: "web".to_string(),
            namespace: None,
            columns: vec!["web".to_string()],
        });
        assert_eq!(event.column(0), "web");
        assert_eq!(event.column(7), "");
    }
}
