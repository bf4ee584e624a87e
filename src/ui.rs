use crate::model::{NamespaceScope, RowAction, RowData, RowEvent, TableData};
use crate::policy::EnterRule;
use crate::view::{CrumbSink, FlashSink, ResourceView, View, ViewSink};
use ratatui::style::Color;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Drill-down wiring of the currently displayed view, shared between the
/// view sink and the shell loop.
#[derive(Debug, Clone)]
pub struct Selection {
    pub rule: EnterRule,
    pub resource: String,
}

pub type SelectionState = Arc<Mutex<Option<Selection>>>;

/// Plain-text stand-ins for the rendering engine's sinks, used by the
/// command shell. They print enough to see what the dispatcher produced;
/// layout, refresh and interaction belong to the real widget stack.
pub struct ConsoleViews {
    max_rows: usize,
    selection: SelectionState,
    previous_rows: HashMap<String, Vec<RowData>>,
}

impl ConsoleViews {
    pub fn new(max_rows: usize, selection: SelectionState) -> Self {
        Self {
            max_rows,
            selection,
            previous_rows: HashMap::new(),
        }
    }

    fn set_selection(&self, selection: Option<Selection>) {
        if let Ok(mut slot) = self.selection.lock() {
            *slot = selection;
        }
    }

    fn print_resource(&mut self, resource: ResourceView) {
        if resource.api_group.is_empty() {
            println!("== {} ==", resource.title);
        } else {
            println!("== {} ({}) ==", resource.title, resource.api_group);
        }
        if let Some(error) = &resource.table.error {
            println!("  listing unavailable: {error}");
            return;
        }
        println!("  {}", resource.table.headers.join("  "));

        let previous = self
            .previous_rows
            .insert(resource.title.clone(), resource.table.rows.clone())
            .unwrap_or_default();

        let scope = NamespaceScope::All;
        for row in resource.table.rows.iter().take(self.max_rows) {
            let event = RowEvent {
                action: row_action(row, &previous),
                row: row.clone(),
            };
            let highlight = resource
                .colorer
                .map(|colorer| colorer(&scope, &event))
                .filter(|color| *color != Color::Reset);
            match highlight {
                Some(color) => println!("  {}  [{color:?}]", row.columns.join("  ")),
                None => println!("  {}", row.columns.join("  ")),
            }
        }
        let hidden = resource.table.rows.len().saturating_sub(self.max_rows);
        if hidden > 0 {
            println!("  ... and {hidden} more");
        }

        for gone in removed_rows(&previous, &resource.table) {
            // Removed rows still run through the colorer so the widget
            // contract (delete events included) is what gets exercised.
            let _ = resource.colorer.map(|colorer| {
                colorer(
                    &scope,
                    &RowEvent {
                        action: RowAction::Deleted,
                        row: gone.clone(),
                    },
                )
            });
            println!("  (gone: {})", gone.name);
        }
    }
}

impl ViewSink for ConsoleViews {
    fn activate(&mut self, view: View) {
        match view {
            View::Resource(resource) => {
                self.set_selection(resource.enter.map(|rule| Selection {
                    rule,
                    resource: kind_token(&resource.title),
                }));
                self.print_resource(resource);
            }
            View::Help => {
                self.set_selection(None);
                println!("== Help ==");
            }
            View::PortForward => {
                self.set_selection(None);
                println!("== Port Forwards ==");
            }
            View::Bench => {
                self.set_selection(None);
                println!("== Benchmarks ==");
            }
            View::Alias => {
                self.set_selection(None);
                println!("== Aliases ==");
            }
            View::Policy { subject, name } => {
                self.set_selection(None);
                println!("== Policy {}:{name} ==", subject.as_str());
            }
            View::Rbac {
                scope,
                namespace,
                target,
            } => {
                self.set_selection(None);
                if namespace.is_empty() {
                    println!("== RBAC {scope:?} {target} ==");
                } else {
                    println!("== RBAC {scope:?} {namespace}/{target} ==");
                }
            }
            View::Subject { kind } => {
                self.set_selection(None);
                println!("== Subjects: {} ==", kind.as_str());
            }
        }
    }
}

fn row_action(row: &RowData, previous: &[RowData]) -> RowAction {
    match previous.iter().find(|old| {
        old.name == row.name && old.namespace == row.namespace
    }) {
        None if previous.is_empty() => RowAction::Unchanged,
        None => RowAction::Added,
        Some(old) if old.columns != row.columns => RowAction::Updated,
        Some(_) => RowAction::Unchanged,
    }
}

fn removed_rows<'a>(previous: &'a [RowData], current: &TableData) -> Vec<&'a RowData> {
    previous
        .iter()
        .filter(|old| {
            !current
                .rows
                .iter()
                .any(|row| row.name == old.name && row.namespace == old.namespace)
        })
        .collect()
}

/// Singular lowercase token the drill-down resolvers discriminate on,
/// e.g. "Roles" -> "role".
fn kind_token(title: &str) -> String {
    let lower = title.to_ascii_lowercase();
    lower.strip_suffix('s').unwrap_or(&lower).to_string()
}

#[derive(Default)]
pub struct ConsoleCrumbs;

impl CrumbSink for ConsoleCrumbs {
    fn refresh(&mut self, stack: &[String]) {
        if stack.is_empty() {
            println!("[trail] (empty)");
        } else {
            println!("[trail] {}", stack.join(" > "));
        }
    }
}

#[derive(Default)]
pub struct ConsoleFlash;

impl FlashSink for ConsoleFlash {
    fn info(&mut self, message: &str) {
        println!("[info] {message}");
    }

    fn warn(&mut self, message: &str) {
        println!("[warn] {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::{kind_token, row_action};
    use crate::model::{RowAction, RowData};

    fn row(name: &str, columns: &[&str]) -> RowData {
        RowData {
            name: name.to_string(),
            namespace: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn kind_token_singularizes_titles() {
        assert_eq!(kind_token("Roles"), "role");
        assert_eq!(kind_token("ClusterRoleBindings"), "clusterrolebinding");
        assert_eq!(kind_token("ServiceAccounts"), "serviceaccount");
    }

    #[test]
    fn row_actions_come_from_the_previous_listing() {
        let previous = vec![row("web", &["web", "Running"])];

        assert_eq!(
            row_action(&row("web", &["web", "Running"]), &previous),
            RowAction::Unchanged,
        );
        assert_eq!(
            row_action(&row("web", &["web", "Pending"]), &previous),
            RowAction::Updated,
        );
        assert_eq!(
            row_action(&row("db", &["db", "Running"]), &previous),
            RowAction::Added,
        );
        // First listing of a view marks nothing as new.
        assert_eq!(
            row_action(&row("db", &["db", "Running"]), &[]),
            RowAction::Unchanged,
        );
    }
}
