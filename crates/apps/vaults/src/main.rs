mod commands;

use crate::commands::Command;
use app_state::{ConfigMode, load_app_settings};
use clap::Parser;
use color_eyre::Result;
use common_services::backend::BackendConnector;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(version, about = "Shared photo vaults from the command line", long_about = None)]
struct Args {
    /// Fall back to placeholder backend settings instead of failing when they are missing.
    #[clap(long, default_value_t = false, action)]
    permissive: bool,

    /// Id of the signed-in user, as issued by the identity provider.
    #[clap(long, env = "VAULTS_USER_ID")]
    user_id: Option<Uuid>,

    /// Access token of the signed-in user.
    #[clap(long, env = "VAULTS_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Print results as JSON.
    #[clap(long, default_value_t = false, action)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vaults=info,common_services=info,app_state=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    color_eyre::install()?;

    let args = Args::parse();
    let mode = if args.permissive {
        ConfigMode::Permissive
    } else {
        ConfigMode::Strict
    };
    let settings = load_app_settings(mode)?;
    let connector = BackendConnector::new(&settings)?;
    let probe = connector.spawn_health_probe();

    let context = commands::Context {
        connector: &connector,
        user_id: args.user_id,
        access_token: args.access_token,
        json: args.json,
    };
    let result = commands::run(&context, args.command).await;

    probe.abort();
    result
}
