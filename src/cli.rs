use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "manta",
    version,
    about = "A command-driven Kubernetes resource browser for the terminal."
)]
pub struct CliArgs {
    /// Kubeconfig context to connect with
    #[arg(long)]
    pub context: Option<String>,

    /// Default namespace for resource listings
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Command to open with, overriding the persisted last view
    #[arg(short, long)]
    pub command: Option<String>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,
}
