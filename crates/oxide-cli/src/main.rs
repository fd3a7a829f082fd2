//! `oxide-gate` command line

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use oxide_cli::{commands, load_config, read_json, Outcome};
use oxide_gate::{FinalGateStatus, PrivilegeRequest, RoleAgent, WorkflowStage};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("oxide-gate")
        .version(oxide_gate::VERSION)
        .about("Oxide privileged-execution gate")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML gate configuration; environment overrides still apply"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .subcommand(
            Command::new("verify")
                .about("Verify an override token without consuming it")
                .arg(token_arg().required(true))
                .arg(at_arg()),
        )
        .subcommand(
            Command::new("seal")
                .about("Compute token_hash and signature with the configured key")
                .arg(token_arg().required(true)),
        )
        .subcommand(
            Command::new("revoke")
                .about("Revoke an override token by id")
                .arg(Arg::new("override-id").required(true).help("Override id to revoke"))
                .arg(
                    Arg::new("by")
                        .long("by")
                        .required(true)
                        .help("Operator recording the revocation"),
                )
                .arg(
                    Arg::new("reason")
                        .long("reason")
                        .default_value("revoked by operator")
                        .help("Reason stored with the revocation"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Run a privilege request through the gate")
                .arg(Arg::new("action").long("action").required(true).help("Privileged action name"))
                .arg(
                    Arg::new("path")
                        .long("path")
                        .action(ArgAction::Append)
                        .help("Affected path; may be repeated"),
                )
                .arg(status_arg())
                .arg(
                    Arg::new("workspace-root")
                        .long("workspace-root")
                        .default_value(".")
                        .value_parser(value_parser!(PathBuf))
                        .help("Workspace the paths are relative to"),
                )
                .arg(token_arg())
                .arg(Arg::new("run-id").long("run-id").help("Workflow run id for the audit record")),
        )
        .subcommand(
            Command::new("autonomy")
                .about("Evaluate the autonomy gate")
                .arg(status_arg())
                .arg(
                    Arg::new("hitl")
                        .long("hitl")
                        .value_parser(value_parser!(PathBuf))
                        .help("HITL override token JSON file"),
                )
                .arg(at_arg()),
        )
        .subcommand(
            Command::new("roles")
                .about("Show role contracts or check a role against a stage")
                .arg(
                    Arg::new("role")
                        .long("role")
                        .value_parser(|s: &str| s.parse::<RoleAgent>()),
                )
                .arg(
                    Arg::new("stage")
                        .long("stage")
                        .value_parser(|s: &str| s.parse::<WorkflowStage>()),
                ),
        )
        .subcommand(Command::new("audit").about("Verify the audit log hash chain"))
}

fn token_arg() -> Arg {
    Arg::new("token")
        .long("token")
        .value_parser(value_parser!(PathBuf))
        .help("Override token JSON file")
}

fn at_arg() -> Arg {
    Arg::new("at")
        .long("at")
        .value_parser(|s: &str| DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc)))
        .help("Evaluate at this RFC 3339 instant instead of now")
}

fn status_arg() -> Arg {
    Arg::new("status")
        .long("status")
        .default_value("NO-GO")
        .value_parser(|s: &str| s.parse::<FinalGateStatus>())
        .help("Final release gate status (GO or NO-GO)")
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn now_or_at(args: &ArgMatches) -> DateTime<Utc> {
    args.get_one::<DateTime<Utc>>("at").copied().unwrap_or_else(Utc::now)
}

fn required<'a, T: Clone + Send + Sync + 'static>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a T> {
    args.get_one::<T>(name).with_context(|| format!("missing --{name}"))
}

fn check_request(args: &ArgMatches) -> anyhow::Result<PrivilegeRequest> {
    let root = required::<PathBuf>(args, "workspace-root")?;
    let root = if root.is_absolute() {
        root.clone()
    } else {
        std::env::current_dir()?.join(root)
    };

    let mut request = PrivilegeRequest::new(
        required::<String>(args, "action")?.clone(),
        *required::<FinalGateStatus>(args, "status")?,
        root.to_string_lossy(),
    )
    .with_paths(args.get_many::<String>("path").unwrap_or_default().cloned());
    if let Some(path) = args.get_one::<PathBuf>("token") {
        request = request.with_token(read_json(path)?);
    }
    if let Some(run_id) = args.get_one::<String>("run-id") {
        request = request.with_workflow_run_id(run_id.clone());
    }
    Ok(request)
}

async fn run(matches: &ArgMatches) -> anyhow::Result<Outcome> {
    let config = load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    tracing::debug!(?config, "configuration resolved");

    match matches.subcommand() {
        Some(("verify", args)) => {
            let token = read_json(required::<PathBuf>(args, "token")?)?;
            Ok(commands::verify(&config, &token, now_or_at(args)))
        }
        Some(("seal", args)) => {
            let token = read_json(required::<PathBuf>(args, "token")?)?;
            Ok(Outcome {
                output: commands::seal(&config, token)?,
                success: true,
            })
        }
        Some(("revoke", args)) => Ok(Outcome {
            output: commands::revoke(
                &config,
                required::<String>(args, "override-id")?,
                required::<String>(args, "by")?,
                required::<String>(args, "reason")?,
            )?,
            success: true,
        }),
        Some(("check", args)) => commands::check(&config, &check_request(args)?).await,
        Some(("autonomy", args)) => {
            let hitl = args.get_one::<PathBuf>("hitl").map(|p| read_json(p)).transpose()?;
            commands::autonomy(*required::<FinalGateStatus>(args, "status")?, hitl, now_or_at(args))
        }
        Some(("roles", args)) => commands::roles(
            args.get_one::<RoleAgent>("role").copied(),
            args.get_one::<WorkflowStage>("stage").copied(),
        ),
        Some(("audit", _)) => Ok(commands::audit(&config)),
        Some((name, _)) => anyhow::bail!("unknown subcommand: {name}"),
        None => anyhow::bail!("a subcommand is required"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let outcome = run(&matches).await?;
    println!("{}", serde_json::to_string_pretty(&outcome.output)?);

    std::process::exit(if outcome.success { 0 } else { 1 });
}
