use crate::model::{NamespaceScope, RowAction, RowEvent, TableData};
use ratatui::style::Color;

/// Row colorer attached to a view: namespace scope plus a row change event
/// in, display color out.
pub type ColorerFn = fn(&NamespaceScope, &RowEvent) -> Color;

/// Table post-processor applied once to freshly listed data.
pub type DecorateFn = fn(TableData) -> TableData;

/// Marker appended to the active kubeconfig context's name.
pub const ACTIVE_CONTEXT_MARK: &str = "(*)";

fn action_color(event: &RowEvent) -> Option<Color> {
    match event.action {
        RowAction::Added => Some(Color::Green),
        RowAction::Updated => Some(Color::Cyan),
        RowAction::Deleted => Some(Color::DarkGray),
        RowAction::Unchanged => None,
    }
}

pub fn default_colorer(_ns: &NamespaceScope, event: &RowEvent) -> Color {
    action_color(event).unwrap_or(Color::Reset)
}

/// Pods: the status column decides. Columns are
/// Name, Ready, Status, Restarts, Age.
pub fn pod_colorer(ns: &NamespaceScope, event: &RowEvent) -> Color {
    match event.column(2) {
        "CrashLoopBackOff" | "Error" | "ErrImagePull" | "ImagePullBackOff" | "Failed"
        | "OOMKilled" => Color::Red,
        "Pending" | "ContainerCreating" | "PodInitializing" | "Terminating" => Color::Yellow,
        "Succeeded" | "Completed" => Color::DarkGray,
        _ => default_colorer(ns, event),
    }
}

fn ready_fraction(value: &str) -> Option<(i64, i64)> {
    let (ready, total) = value.split_once('/')?;
    Some((ready.parse().ok()?, total.parse().ok()?))
}

/// Deployments: Name, Ready, Up-to-date, Available, Age. A ready count
/// short of desired shows as degraded.
pub fn deploy_colorer(ns: &NamespaceScope, event: &RowEvent) -> Color {
    match ready_fraction(event.column(1)) {
        Some((ready, total)) if ready < total => Color::Yellow,
        _ => default_colorer(ns, event),
    }
}

/// Replica-managed workloads: Name, Desired, Current, Ready, Age.
pub fn replica_colorer(ns: &NamespaceScope, event: &RowEvent) -> Color {
    let desired = event.column(1);
    let ready = event.column(3);
    if !desired.is_empty() && desired != ready {
        return Color::Yellow;
    }
    default_colorer(ns, event)
}

/// StatefulSets: Name, Ready, Age.
pub fn sts_colorer(ns: &NamespaceScope, event: &RowEvent) -> Color {
    match ready_fraction(event.column(1)) {
        Some((ready, total)) if ready < total => Color::Yellow,
        _ => default_colorer(ns, event),
    }
}

/// Namespaces and nodes share a status column at the same position:
/// Name, Status, ... .
pub fn ns_colorer(ns: &NamespaceScope, event: &RowEvent) -> Color {
    match event.column(1) {
        "Terminating" | "NotReady" | "Unknown" => Color::Red,
        "Active" | "Ready" => default_colorer(ns, event),
        _ => Color::Yellow,
    }
}

/// Events: Name, Type, Reason, Object, Count, Age.
pub fn event_colorer(ns: &NamespaceScope, event: &RowEvent) -> Color {
    match event.column(1) {
        "Warning" => Color::Yellow,
        "Error" => Color::Red,
        _ => default_colorer(ns, event),
    }
}

/// PodDisruptionBudgets: Name, Min Available, Max Unavailable,
/// Allowed Disruptions, Age. Zero allowed disruptions is the alarm state.
pub fn pdb_colorer(ns: &NamespaceScope, event: &RowEvent) -> Color {
    if event.column(3) == "0" {
        return Color::Red;
    }
    default_colorer(ns, event)
}

/// PersistentVolumes: Name, Capacity, Status, Claim, Age.
pub fn pv_colorer(ns: &NamespaceScope, event: &RowEvent) -> Color {
    match event.column(2) {
        "Failed" => Color::Red,
        "Released" | "Pending" => Color::Yellow,
        _ => default_colorer(ns, event),
    }
}

/// PersistentVolumeClaims: Name, Status, Volume, Capacity, Age.
pub fn pvc_colorer(ns: &NamespaceScope, event: &RowEvent) -> Color {
    match event.column(1) {
        "Lost" => Color::Red,
        "Pending" => Color::Yellow,
        _ => default_colorer(ns, event),
    }
}

/// Contexts: the active context is highlighted.
pub fn ctx_colorer(ns: &NamespaceScope, event: &RowEvent) -> Color {
    if event.row.name.ends_with(ACTIVE_CONTEXT_MARK) {
        return Color::Cyan;
    }
    default_colorer(ns, event)
}

/// Context tables list the active context first, the rest in the listing
/// order the gateway produced.
pub fn ctx_decorator(mut table: TableData) -> TableData {
    if let Some(position) = table
        .rows
        .iter()
        .position(|row| row.name.ends_with(ACTIVE_CONTEXT_MARK))
        && position > 0
    {
        let active = table.rows.remove(position);
        table.rows.insert(0, active);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::{
        ACTIVE_CONTEXT_MARK, ctx_decorator, deploy_colorer, event_colorer, pdb_colorer,
        pod_colorer,
    };
    use crate::model::{NamespaceScope, RowAction, RowData, RowEvent, TableData};
    use chrono::Local;
    use ratatui::style::Color;

    fn event(columns: &[&str]) -> RowEvent {
        RowEvent::unchanged(RowData {
            name: columns.first().map(|c| c.to_string()).unwrap_or_default(),
            namespace: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        })
    }

    #[test]
    fn crashing_pod_is_red() {
        let ns = NamespaceScope::All;
        let event = event(&["web-0", "0/1", "CrashLoopBackOff", "7", "5m"]);
        assert_eq!(pod_colorer(&ns, &event), Color::Red);
    }

    #[test]
    fn added_pod_is_green() {
        let ns = NamespaceScope::All;
        let mut event = event(&["web-0", "1/1", "Running", "0", "5s"]);
        event.action = RowAction::Added;
        assert_eq!(pod_colorer(&ns, &event), Color::Green);
    }

    #[test]
    fn degraded_deployment_is_yellow() {
        let ns = NamespaceScope::All;
        let event = event(&["web", "1/3", "3", "1", "2d"]);
        assert_eq!(deploy_colorer(&ns, &event), Color::Yellow);
    }

    #[test]
    fn warning_event_is_yellow() {
        let ns = NamespaceScope::All;
        let event = event(&["ev-1", "Warning", "BackOff", "pod/web-0", "3", "1m"]);
        assert_eq!(event_colorer(&ns, &event), Color::Yellow);
    }

    #[test]
    fn exhausted_budget_is_red() {
        let ns = NamespaceScope::All;
        let event = event(&["web-pdb", "1", "-", "0", "4h"]);
        assert_eq!(pdb_colorer(&ns, &event), Color::Red);
    }

    #[test]
    fn decorator_moves_active_context_first() {
        let mut table = TableData::default();
        let active = format!("prod{ACTIVE_CONTEXT_MARK}");
        let rows = ["dev", active.as_str(), "staging"]
            .iter()
            .map(|name| RowData {
                name: name.to_string(),
                namespace: None,
                columns: vec![name.to_string()],
            })
            .collect();
        table.set_rows(vec!["Name".to_string()], rows, Local::now());

        let table = ctx_decorator(table);
        assert!(table.rows[0].name.starts_with("prod"));
        assert_eq!(table.rows.len(), 3);
    }
}
