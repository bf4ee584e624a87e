mod capability;
mod catalog;
mod cli;
mod color;
mod config;
mod discovery;
mod dispatch;
mod k8s;
mod model;
mod nav;
mod policy;
mod ui;
mod view;

use anyhow::{Context, Result};
use catalog::Catalog;
use clap::Parser;
use cli::CliArgs;
use config::FileConfig;
use dispatch::CommandDispatcher;
use k8s::KubeGateway;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use ui::{ConsoleCrumbs, ConsoleFlash, ConsoleViews, SelectionState};
use view::ActiveViewStore;

const TABLE_PREVIEW_ROWS: usize = 20;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter)?;

    let mut gateway = KubeGateway::with_context(args.context.clone()).await?;
    if let Some(namespace) = args.namespace.clone() {
        gateway.set_default_namespace(namespace);
    }
    let conn = Arc::new(gateway);

    // The catalog build performs blocking cluster round trips; it runs off
    // the interaction path and must complete before dispatch starts.
    let catalog = {
        let conn = Arc::clone(&conn);
        tokio::spawn(async move { Catalog::build(conn.as_ref()).await })
            .await
            .context("catalog build task failed")?
    };
    debug!(
        builtins = catalog.builtin_keywords().count(),
        custom = catalog.custom_names().count(),
        "catalog ready"
    );

    let mut store = FileConfig::load();
    if let Some(command) = args.command.clone() {
        store.set_active_view(&command);
    }

    let selection: SelectionState = Arc::new(Mutex::new(None));
    let mut dispatcher = CommandDispatcher::new(
        Arc::clone(&conn),
        Arc::new(catalog),
        Box::new(ConsoleViews::new(TABLE_PREVIEW_ROWS, Arc::clone(&selection))),
        Box::new(ConsoleCrumbs),
        Box::new(ConsoleFlash),
        Box::new(store),
    );

    println!(
        "manta — connected to {} (context {})",
        conn.cluster(),
        conn.context()
    );
    dispatcher.default_cmd().await;

    run_shell(&mut dispatcher, &conn, &selection).await
}

fn init_tracing(level_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .try_init();

    Ok(())
}

/// Reads commands line by line and feeds them to the dispatcher. The words
/// the full-screen shell binds to keys live here instead: `back` retraces
/// the navigation stack, `sel <ns/name>` drills into the current view's
/// selected row, `reload` rebuilds the catalog snapshot after a cluster
/// change.
async fn run_shell(
    dispatcher: &mut CommandDispatcher<KubeGateway>,
    conn: &Arc<KubeGateway>,
    selection: &SelectionState,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while dispatcher.running() {
        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };
        let cmd = line.trim();
        if cmd.is_empty() {
            continue;
        }

        if cmd == "back" {
            if dispatcher.last_cmd() || dispatcher.history().is_empty() {
                println!("[info] already at the first view");
            } else if let Some(previous) = dispatcher.previous_cmd() {
                dispatcher.run(&previous).await;
            }
            continue;
        }

        if cmd == "reload" {
            let catalog = Catalog::build(conn.as_ref()).await;
            dispatcher.install_catalog(Arc::new(catalog));
            println!("[info] catalog rebuilt");
            continue;
        }

        if let Some(target) = cmd.strip_prefix("sel ") {
            let target = target.trim();
            let current = selection.lock().ok().and_then(|slot| slot.clone());
            match current {
                Some(sel) => {
                    let (namespace, _) = policy::namespaced(target);
                    dispatcher
                        .enter(sel.rule, namespace, &sel.resource, target)
                        .await;
                }
                None => println!("[info] current view has no drill-down"),
            }
            continue;
        }

        dispatcher.dispatch(cmd).await;
    }

    Ok(())
}
