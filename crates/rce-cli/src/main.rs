// crates/rce-cli/src/main.rs
// ============================================================================
// Module: Operator CLI Entry Point
// Description: Command dispatcher for configuration validation, rule-source
// sync, and report generation.
// Purpose: Tie rce-config, rce-rulesource, rce-store-sqlite, rce-sharding,
// and rce-reports together behind one operator-facing binary (`rce`).
// Dependencies: clap, tokio, tracing, tracing-subscriber, rce-config,
// rce-rulesource, rce-store-sqlite, rce-sharding, rce-reports
// ============================================================================

mod error;
mod objectstore;
mod store;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use error::CliError;
use rce_config::RceConfig;
use rce_core::identifiers::RuleName;
use rce_core::identifiers::RuleSourceId;
use rce_core::model::Cloud;
use rce_core::model::Rule;
use rce_core::model::RuleSourceType;
use rce_core::static_registry::StaticMetadataRegistry;
use rce_rulesource::GitHostKind;
use rce_rulesource::HttpGitHostClient;
use rce_rulesource::sync_rule_source;
use rce_sharding::ShardsCollection;
use tracing_subscriber::EnvFilter;

/// Operator CLI for the compliance scanning platform's core libraries.
#[derive(Parser, Debug)]
#[command(name = "rce", arg_required_else_help = true)]
struct Cli {
    /// Path to rce.toml (defaults to the standard resolution order).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Rule-source sync commands.
    Rulesource {
        #[command(subcommand)]
        command: RulesourceCommand,
    },
    /// Report derivation commands.
    Report {
        #[command(subcommand)]
        command: ReportCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Loads and validates rce.toml, printing a summary on success.
    Validate,
}

#[derive(Subcommand, Debug)]
enum RulesourceCommand {
    /// Runs one sync attempt for a rule-source already recorded in the
    /// store, persisting the resulting rule catalog diff.
    Sync(RulesourceSyncArgs),
}

#[derive(clap::Args, Debug)]
struct RulesourceSyncArgs {
    /// Path to the sqlite store.
    #[arg(long, value_name = "PATH")]
    store: String,
    /// The rule-source's id as recorded in the store.
    #[arg(long, value_name = "ID")]
    rule_source_id: String,
    /// Git host API base URL (e.g. https://api.github.com).
    #[arg(long, value_name = "URL")]
    api_base_url: String,
    /// Access token for the git host, if the source requires one.
    #[arg(long, env = "RCE_GIT_HOST_TOKEN")]
    token: Option<String>,
    /// Release tag to sync, for GITHUB_RELEASE sources.
    #[arg(long, value_name = "TAG")]
    release_tag: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Counts report: total/successful/failed checks by severity.
    Digest(ReportArgs),
    /// Per-region, dedup'd and field-projected resource listing.
    Details(ReportArgs),
    /// Per-rule pass/fail status across regions.
    Rules(ReportArgs),
}

#[derive(clap::Args, Debug)]
struct ReportArgs {
    /// Path to the sqlite store (for the rule catalog and metadata).
    #[arg(long, value_name = "PATH")]
    store: String,
    /// Rule-source id whose catalog entries apply to this collection.
    #[arg(long, value_name = "ID")]
    rule_source_id: String,
    /// Tenant's customer identifier.
    #[arg(long, value_name = "ID")]
    customer: String,
    /// Cloud the shards were collected from.
    #[arg(long, value_enum)]
    cloud: CloudArg,
    /// Cloud account identifier.
    #[arg(long, value_name = "ID")]
    account: String,
}

#[derive(ValueEnum, Copy, Clone, Debug)]
enum CloudArg {
    Aws,
    Azure,
    Google,
    Kubernetes,
}

impl From<CloudArg> for Cloud {
    fn from(value: CloudArg) -> Self {
        match value {
            CloudArg::Aws => Self::Aws,
            CloudArg::Azure => Self::Azure,
            CloudArg::Google => Self::Google,
            CloudArg::Kubernetes => Self::Kubernetes,
        }
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = RceConfig::load(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommand::Validate => {
                config.validate()?;
                println!("configuration is valid");
                Ok(())
            }
        },
        Commands::Rulesource { command } => match command {
            RulesourceCommand::Sync(args) => command_rulesource_sync(&args).await,
        },
        Commands::Report { command } => {
            let (args, kind) = match &command {
                ReportCommand::Digest(args) => (args, "digest"),
                ReportCommand::Details(args) => (args, "details"),
                ReportCommand::Rules(args) => (args, "rules"),
            };
            command_report(&config, args, kind).await
        }
    }
}

fn init_tracing(logging: &rce_config::LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}

async fn command_rulesource_sync(args: &RulesourceSyncArgs) -> Result<(), CliError> {
    let _span = tracing::info_span!("rulesource_sync", rule_source_id = %args.rule_source_id).entered();
    let store = store::Store::open(&args.store)?;
    let rule_source_id = RuleSourceId::new(args.rule_source_id.clone());
    let mut rule_source = store
        .rule_sources
        .get(&rule_source_id)?
        .ok_or_else(|| CliError::InvalidArgument(format!("unknown rule-source {rule_source_id}")))?;
    let existing_rules = store.rules.list_for_source(&rule_source_id)?;

    let kind = match rule_source.source_type {
        RuleSourceType::Github => GitHostKind::Github,
        RuleSourceType::GithubRelease => GitHostKind::GithubRelease,
        RuleSourceType::Gitlab => GitHostKind::Gitlab,
    };
    let git_host = HttpGitHostClient::new(kind, args.api_base_url.clone(), args.token.clone())
        .map_err(|err| CliError::InvalidArgument(err.to_string()))?;

    let outcome = sync_rule_source(&mut rule_source, &git_host, &existing_rules, args.release_tag.as_deref(), Utc::now()).await?;
    store.rules.apply_diff(&rule_source_id, &outcome.upserted, &outcome.deleted)?;
    store.rule_sources.upsert(&rule_source)?;

    println!("synced {}: {} upserted, {} deleted", rule_source_id, outcome.upserted.len(), outcome.deleted.len());
    Ok(())
}

async fn command_report(config: &RceConfig, args: &ReportArgs, kind: &str) -> Result<(), CliError> {
    let _span = tracing::info_span!("report", kind, customer = %args.customer, account = %args.account).entered();
    let store = store::Store::open(&args.store)?;
    let rule_source_id = RuleSourceId::new(args.rule_source_id.clone());
    let rules: BTreeMap<RuleName, Rule> = store
        .rules
        .list_for_source(&rule_source_id)?
        .into_iter()
        .map(|rule| (rule.name.clone(), rule))
        .collect();

    let object_store = objectstore::build(&config.object_store).await;
    let collection = ShardsCollection::read(args.customer.clone(), Cloud::from(args.cloud), args.account.clone(), object_store.as_dyn()).await?;

    match kind {
        "digest" => {
            let digest = rce_reports::digest_report(&collection, &rules);
            println!("{}", serde_json::to_string_pretty(&digest_to_json(&digest))?);
        }
        "details" => {
            let metadata = store.rule_metadata.list_all()?;
            let registry = StaticMetadataRegistry::new(metadata);
            let details = rce_reports::details_report(&collection, &rules, &registry)?;
            println!("{}", serde_json::to_string_pretty(&details_to_json(&details))?);
        }
        "rules" => {
            let report = rce_reports::rules_report(&collection);
            println!("{}", serde_json::to_string_pretty(&rules_to_json(&report))?);
        }
        _ => unreachable!("clap subcommand exhaustively matched above"),
    }

    Ok(())
}

fn digest_to_json(digest: &rce_reports::DigestReport) -> serde_json::Value {
    serde_json::json!({
        "total_checks": digest.total_checks,
        "successful_checks": digest.successful_checks,
        "failed_checks_total": digest.failed_checks_total,
        "failed_checks_by_severity": digest.failed_checks_by_severity.iter().map(|(k, v)| (format!("{k:?}"), v)).collect::<BTreeMap<_, _>>(),
        "violating_resources": digest.violating_resources,
    })
}

fn details_to_json(details: &BTreeMap<String, Vec<rce_reports::report::DetailsEntry>>) -> serde_json::Value {
    serde_json::json!(details
        .iter()
        .map(|(region, entries)| {
            let entries: Vec<_> = entries
                .iter()
                .map(|entry| serde_json::json!({"policy": entry.policy.as_str(), "resources": entry.resources}))
                .collect();
            (region.clone(), entries)
        })
        .collect::<BTreeMap<_, _>>())
}

fn rules_to_json(report: &[rce_reports::report::RuleReportEntry]) -> serde_json::Value {
    serde_json::json!(report
        .iter()
        .map(|entry| serde_json::json!({"policy": entry.policy.as_str(), "region_status": entry.region_status}))
        .collect::<Vec<_>>())
}
