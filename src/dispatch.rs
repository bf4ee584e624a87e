use crate::catalog::{Catalog, CommandTarget, ListSpec, ResourceDescriptor, ViewFactory, ViewHooks};
use crate::color;
use crate::k8s::Connection;
use crate::model::{NamespaceScope, TableData};
use crate::nav::NavigationStack;
use crate::policy::{self, EnterRule};
use crate::view::{ActiveViewStore, CrumbSink, FlashSink, ResourceView, View, ViewSink};
use chrono::Local;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns command strings into activated views. One invocation at a time on
/// the interaction thread; the catalog snapshot it reads is immutable and
/// replaced wholesale on rebuild.
pub struct CommandDispatcher<C: Connection> {
    conn: Arc<C>,
    catalog: Arc<Catalog>,
    history: NavigationStack,
    views: Box<dyn ViewSink>,
    crumbs: Box<dyn CrumbSink>,
    flash: Box<dyn FlashSink>,
    store: Box<dyn ActiveViewStore>,
    running: bool,
}

impl<C: Connection> CommandDispatcher<C> {
    pub fn new(
        conn: Arc<C>,
        catalog: Arc<Catalog>,
        views: Box<dyn ViewSink>,
        crumbs: Box<dyn CrumbSink>,
        flash: Box<dyn FlashSink>,
        store: Box<dyn ActiveViewStore>,
    ) -> Self {
        Self {
            conn,
            catalog,
            history: NavigationStack::default(),
            views,
            crumbs,
            flash,
            store,
            running: true,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    /// Installs a freshly built catalog snapshot (reconnect path). The old
    /// snapshot stays valid for whatever still holds it.
    pub fn install_catalog(&mut self, catalog: Arc<Catalog>) {
        self.catalog = catalog;
    }

    pub fn history(&self) -> &NavigationStack {
        &self.history
    }

    /// True when back navigation has reached the first command.
    pub fn last_cmd(&self) -> bool {
        self.history.is_last()
    }

    pub fn push_cmd(&mut self, cmd: &str) {
        self.history.push(cmd);
        self.crumbs.refresh(self.history.entries());
    }

    /// Drops the current command and returns the one to go back to, if
    /// any.
    pub fn previous_cmd(&mut self) -> Option<String> {
        self.history.pop();
        self.crumbs.refresh(self.history.entries());
        self.history.top().map(str::to_string)
    }

    /// Replays the persisted last-active command. Startup entry path.
    pub async fn default_cmd(&mut self) -> bool {
        let cmd = self.store.active_view();
        self.dispatch(&cmd).await
    }

    /// Top-level entry: run the command and record it in the navigation
    /// history when it produced a view.
    pub async fn dispatch(&mut self, cmd: &str) -> bool {
        let ok = self.run(cmd).await;
        if ok && self.running {
            self.push_cmd(cmd);
        }
        ok
    }

    /// Resolves and activates one command. Match precedence is fixed:
    /// termination, the built-in action views, the policy grammar, the
    /// built-in catalog, then the custom resource index.
    pub async fn run(&mut self, cmd: &str) -> bool {
        match cmd {
            "q" | "quit" => {
                self.running = false;
                return true;
            }
            "?" | "help" => {
                self.views.activate(View::Help);
                return true;
            }
            "pf" => {
                self.views.activate(View::PortForward);
                return true;
            }
            "be" => {
                self.views.activate(View::Bench);
                return true;
            }
            "alias" => {
                self.views.activate(View::Alias);
                return true;
            }
            _ => {}
        }

        if let Some((subject, name)) = policy::parse_policy_command(cmd) {
            self.views.activate(View::Policy { subject, name });
            return true;
        }

        let catalog = Arc::clone(&self.catalog);
        match catalog.lookup(cmd) {
            Some(CommandTarget::Builtin(descriptor)) => {
                self.run_builtin(cmd, descriptor).await;
                true
            }
            Some(CommandTarget::Custom(entry)) => {
                let table = self
                    .absorb_listing(
                        self.conn
                            .list_custom(
                                &entry.group,
                                &entry.version,
                                &entry.kind,
                                entry.preferred_name(),
                                &NamespaceScope::All,
                            )
                            .await,
                    );
                let mut view = ResourceView::new(entry.kind.clone(), entry.group.clone(), table);
                view.apply_hooks(&ViewHooks {
                    colorer: Some(color::default_colorer),
                    enter: None,
                    decorate: None,
                });
                debug!(command = cmd, "dispatching custom resource view");
                self.exec(cmd, View::Resource(view));
                true
            }
            None => {
                self.flash
                    .warn(&format!("Huh? `{cmd}` command not found"));
                false
            }
        }
    }

    /// Executes a drill-down rule for the selected row of the current
    /// view. A failed upstream fetch flashes a warning and navigates
    /// nowhere.
    pub async fn enter(
        &mut self,
        rule: EnterRule,
        namespace: &str,
        resource: &str,
        selection: &str,
    ) -> bool {
        match policy::resolve_enter(rule, self.conn.as_ref(), namespace, resource, selection).await
        {
            Ok(view) => {
                self.views.activate(view);
                true
            }
            Err(error) => {
                self.flash.warn(&format!("{error:#}"));
                false
            }
        }
    }

    async fn run_builtin(&mut self, cmd: &str, descriptor: &ResourceDescriptor) {
        let table = match &descriptor.list {
            Some(spec) => {
                let fetched = self.initial_data(spec).await;
                self.absorb_listing(fetched)
            }
            None => TableData::default(),
        };

        let view = match descriptor.view {
            ViewFactory::Resource => {
                let mut view = ResourceView::new(descriptor.title, descriptor.api_group, table);
                view.apply_hooks(&descriptor.hooks);
                View::Resource(view)
            }
            ViewFactory::Subject(kind) => View::Subject { kind },
        };

        self.flash
            .info(&format!("Viewing resource {}...", descriptor.title));
        debug!(command = cmd, "dispatching built-in view");
        self.exec(cmd, view);
    }

    async fn initial_data(&self, spec: &ListSpec) -> anyhow::Result<TableData> {
        let scope = NamespaceScope::Named(self.conn.default_namespace());
        match spec {
            ListSpec::Builtin(kind) => self.conn.list_builtin(*kind, &scope).await,
            ListSpec::Autoscaler(version) => self.conn.list_autoscalers(*version, &scope).await,
        }
    }

    /// A failed listing still activates the view; the error rides along in
    /// the table data for the widget to surface.
    fn absorb_listing(&self, fetched: anyhow::Result<TableData>) -> TableData {
        match fetched {
            Ok(table) => table,
            Err(error) => {
                warn!("initial listing failed: {error:#}");
                let mut table = TableData::default();
                table.set_error(format!("{error:#}"), Local::now());
                table
            }
        }
    }

    /// Successful resource activation: the command becomes the persisted
    /// default view, then the view goes live.
    fn exec(&mut self, cmd: &str, view: View) {
        self.store.set_active_view(cmd);
        if let Err(error) = self.store.save() {
            warn!("failed to persist active view: {error:#}");
        }
        self.views.activate(view);
    }
}
