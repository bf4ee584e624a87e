use crate::catalog::ViewHooks;
use crate::color::ColorerFn;
use crate::model::TableData;
use crate::policy::{EnterRule, SubjectKind};
use anyhow::Result;

/// Which RBAC object family an RBAC view is scoped to.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RbacScope {
    ClusterRole,
    Role,
}

/// A constructed view descriptor, handed to the activation sink. The
/// rendering engine owns everything past this point.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Resource(ResourceView),
    Help,
    PortForward,
    Bench,
    Alias,
    Policy {
        subject: SubjectKind,
        name: String,
    },
    Rbac {
        scope: RbacScope,
        namespace: String,
        target: String,
    },
    Subject {
        kind: SubjectKind,
    },
}

/// A resource listing view: title, API group, initial table data and the
/// behaviors wired in at construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceView {
    pub title: String,
    pub api_group: String,
    pub table: TableData,
    pub colorer: Option<ColorerFn>,
    pub enter: Option<EnterRule>,
}

impl ResourceView {
    pub fn new(title: impl Into<String>, api_group: impl Into<String>, table: TableData) -> Self {
        Self {
            title: title.into(),
            api_group: api_group.into(),
            table,
            colorer: None,
            enter: None,
        }
    }

    /// Applies the optional capabilities present on a descriptor, in a
    /// fixed order: colorer, enter, decorate. The decorator runs against
    /// the initial data immediately; colorer and enter ride along for the
    /// widget to invoke.
    pub fn apply_hooks(&mut self, hooks: &ViewHooks) {
        if let Some(colorer) = hooks.colorer {
            self.colorer = Some(colorer);
        }
        if let Some(enter) = hooks.enter {
            self.enter = Some(enter);
        }
        if let Some(decorate) = hooks.decorate {
            self.table = decorate(std::mem::take(&mut self.table));
        }
    }
}

/// Accepts a constructed view and makes it current.
pub trait ViewSink {
    fn activate(&mut self, view: View);
}

/// Receives the full navigation stack after every change.
pub trait CrumbSink {
    fn refresh(&mut self, stack: &[String]);
}

/// User-facing notifications.
pub trait FlashSink {
    fn info(&mut self, message: &str);
    fn warn(&mut self, message: &str);
}

/// Persisted last-active-view record, read once at startup and written on
/// every successful resource activation.
pub trait ActiveViewStore {
    fn active_view(&self) -> String;
    fn set_active_view(&mut self, cmd: &str);
    fn save(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::ResourceView;
    use crate::catalog::ViewHooks;
    use crate::color;
    use crate::model::{RowData, TableData};
    use crate::policy::EnterRule;
    use chrono::Local;

    fn table_named(names: &[&str]) -> TableData {
        let mut table = TableData::default();
        let rows = names
            .iter()
            .map(|name| RowData {
                name: name.to_string(),
                namespace: None,
                columns: vec![name.to_string()],
            })
            .collect();
        table.set_rows(vec!["Name".to_string()], rows, Local::now());
        table
    }

    #[test]
    fn hooks_apply_in_fixed_order_and_only_when_present() {
        let mut view = ResourceView::new("Contexts", "", table_named(&["dev", "prod(*)"]));
        view.apply_hooks(&ViewHooks {
            colorer: Some(color::ctx_colorer),
            enter: None,
            decorate: Some(color::ctx_decorator),
        });

        assert!(view.colorer.is_some());
        assert!(view.enter.is_none());
        assert_eq!(view.table.rows[0].name, "prod(*)");
    }

    #[test]
    fn absent_hooks_leave_view_untouched() {
        let table = table_named(&["web"]);
        let mut view = ResourceView::new("Pods", "", table.clone());
        view.apply_hooks(&ViewHooks {
            colorer: None,
            enter: Some(EnterRule::SubjectPolicy),
            decorate: None,
        });

        assert!(view.colorer.is_none());
        assert_eq!(view.enter, Some(EnterRule::SubjectPolicy));
        assert_eq!(view.table, table);
    }
}
