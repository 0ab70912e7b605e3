use anyhow::Result;
use clap::Parser;
use dmutils::commands::{self, Config, StatusCommand, config::DEFAULT_TIMEOUT};
use dmutils::mailchimp::DEFAULT_PAGE_SIZE;
use dmutils::status::DEFAULT_LOW_DISK_PERCENT_THRESHOLD;
use std::path::PathBuf;
use std::time::Duration;

/// dmutils - Digital Marketplace utilities
///
/// Manage Mailchimp mailing lists and campaigns, and report app status.
///
/// Mailchimp credentials are read from DM_MAILCHIMP_USERNAME and
/// DM_MAILCHIMP_API_KEY.
///
/// Examples:
///   dmutils subscribe 1a2b3c someone@example.com
///   dmutils members 1a2b3c
#[derive(Parser, Debug)]
#[command(author, version = env!("DMUTILS_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Mailchimp API URL (defaults to the datacenter in the API key)
    #[arg(
        long = "api-url",
        env = "DM_MAILCHIMP_API_URL",
        value_name = "URL",
        global = true
    )]
    pub api_url: Option<String>,

    /// Extra attempts for requests that time out at the gateway
    #[arg(
        long,
        env = "DM_MAILCHIMP_RETRIES",
        value_name = "N",
        default_value_t = 0,
        global = true
    )]
    pub retries: usize,

    /// HTTP request timeout in seconds
    #[arg(
        long,
        env = "DM_HTTP_TIMEOUT",
        value_name = "SECONDS",
        default_value_t = DEFAULT_TIMEOUT.as_secs(),
        global = true
    )]
    pub timeout: u64,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Subscribe email addresses to a mailing list
    Subscribe(SubscribeArgs),

    /// Print every email address on a mailing list
    Members(MembersArgs),

    /// Send an existing campaign
    SendCampaign(SendCampaignArgs),

    /// Print the status report and fail if it is not ok
    Status(StatusArgs),

    /// Print the Redis URL for the web session store
    SessionRedisUrl,
}

#[derive(clap::Args, Debug)]
pub struct SubscribeArgs {
    /// The Mailchimp list ID
    #[arg(value_name = "LIST_ID")]
    pub list_id: String,

    #[arg(value_name = "EMAIL", required = true)]
    pub emails: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct MembersArgs {
    /// The Mailchimp list ID
    #[arg(value_name = "LIST_ID")]
    pub list_id: String,

    /// Members fetched per request
    #[arg(long, value_name = "N", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

#[derive(clap::Args, Debug)]
pub struct SendCampaignArgs {
    #[arg(value_name = "CAMPAIGN_ID")]
    pub campaign_id: String,
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Only check disk space
    #[arg(long)]
    pub ignore_dependencies: bool,

    /// Minimum percentage of free disk space
    #[arg(long = "low-disk-threshold", value_name = "PERCENT", default_value_t = DEFAULT_LOW_DISK_PERCENT_THRESHOLD)]
    pub low_disk_threshold: u8,

    /// Directory containing the version_label file
    #[arg(long, value_name = "PATH")]
    pub version_dir: Option<PathBuf>,

    /// Data API base URL to check
    #[arg(long, env = "DM_DATA_API_URL", value_name = "URL")]
    pub data_api_url: Option<String>,

    /// Search API base URL to check
    #[arg(long, env = "DM_SEARCH_API_URL", value_name = "URL")]
    pub search_api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = dmutils::runtime::RealRuntime;
    let config = Config::with_timeout(
        runtime,
        cli.api_url,
        cli.retries,
        Duration::from_secs(cli.timeout),
    )?;

    match cli.command {
        Commands::Subscribe(args) => {
            commands::subscribe(&config, &args.list_id, &args.emails).await?
        }
        Commands::Members(args) => {
            commands::members(&config, &args.list_id, args.page_size).await?
        }
        Commands::SendCampaign(args) => commands::send_campaign(&config, &args.campaign_id).await?,
        Commands::Status(args) => {
            let command = StatusCommand {
                ignore_dependencies: args.ignore_dependencies,
                low_disk_percent_threshold: args.low_disk_threshold,
                version_dir: args.version_dir,
                data_api_url: args.data_api_url,
                search_api_url: args.search_api_url,
            };
            commands::status(&config, &command).await?
        }
        Commands::SessionRedisUrl => commands::session_redis_url(&config)?,
    }
    Ok(())
}
