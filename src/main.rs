use std::path::PathBuf;
use std::process::ExitCode;

use platform_acceptance::config::{resolve_config_path, Backend, HarnessConfig};
use platform_acceptance::scenario::report::write_run_report;
use platform_acceptance::scenario::ScenarioFactory;
use platform_acceptance::scenarios::{catalog, run_catalog, select};
use serde_json::json;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();

    let cli_args = std::env::args().skip(1).collect::<Vec<_>>();
    let rest = cli_args.iter().skip(1).cloned().collect::<Vec<_>>();
    let outcome = match cli_args.first().map(String::as_str) {
        Some("list") => run_list_cli().map(|_| true),
        Some("run") => run_scenarios_cli(rest),
        Some("validate-config") => run_validate_config_cli(rest).map(|_| true),
        Some("-h" | "--help") | None => {
            print_usage();
            Ok(true)
        }
        Some(unknown) => Err(std::io::Error::other(format!(
            "Unknown command: {unknown}\n\nUse --help for usage."
        ))
        .into()),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct RunCliArgs {
    config_path: Option<String>,
    only: Vec<String>,
    report_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ValidateConfigCliArgs {
    config_path: Option<String>,
}

fn parse_run_cli_args(args: &[String]) -> Result<RunCliArgs, Box<dyn std::error::Error>> {
    let mut parsed = RunCliArgs::default();
    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        let needs_value = |idx: usize| -> Result<String, Box<dyn std::error::Error>> {
            let Some(value) = args.get(idx + 1) else {
                return Err(std::io::Error::other(format!("Missing value for {flag}")).into());
            };
            Ok(value.clone())
        };

        match flag {
            "--config" => {
                parsed.config_path = Some(needs_value(i)?);
                i += 2;
            }
            "--only" => {
                let name = needs_value(i)?.trim().to_string();
                if !name.is_empty() {
                    parsed.only.push(name);
                }
                i += 2;
            }
            "--report" => {
                parsed.report_path = Some(PathBuf::from(needs_value(i)?));
                i += 2;
            }
            unknown => {
                return Err(std::io::Error::other(format!(
                    "Unknown argument: {unknown}\n\nUse --help for usage."
                ))
                .into());
            }
        }
    }
    Ok(parsed)
}

fn parse_validate_config_cli_args(
    args: &[String],
) -> Result<ValidateConfigCliArgs, Box<dyn std::error::Error>> {
    let mut config_path = None::<String>;
    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--config" => {
                let Some(value) = args.get(i + 1) else {
                    return Err(std::io::Error::other(format!("Missing value for {flag}")).into());
                };
                config_path = Some(value.clone());
                i += 2;
            }
            unknown => {
                return Err(std::io::Error::other(format!(
                    "Unknown argument: {unknown}\n\nUse --help for usage."
                ))
                .into());
            }
        }
    }
    Ok(ValidateConfigCliArgs { config_path })
}

fn load_config(explicit: Option<&str>) -> Result<HarnessConfig, Box<dyn std::error::Error>> {
    let path = resolve_config_path(explicit)?;
    Ok(HarnessConfig::load(path.as_path())?)
}

fn run_list_cli() -> Result<(), Box<dyn std::error::Error>> {
    for def in catalog() {
        println!("{:<28} {}", def.name, def.description);
    }
    Ok(())
}

fn run_scenarios_cli(args: Vec<String>) -> Result<bool, Box<dyn std::error::Error>> {
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_usage();
        return Ok(true);
    }

    let parsed = parse_run_cli_args(args.as_slice())?;
    let definitions = select(parsed.only.as_slice())?;
    let config = load_config(parsed.config_path.as_deref())?;
    let factory = ScenarioFactory::from_config(config)?;

    let report = run_catalog(&factory, definitions.as_slice());
    info!(
        passed = report.passed,
        failed = report.failed,
        teardown_failures = report.teardown_failures,
        "run finished"
    );

    match parsed.report_path {
        Some(path) => {
            write_run_report(path.as_path(), &report)?;
            println!("{}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(report.all_passed())
}

fn run_validate_config_cli(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_usage();
        return Ok(());
    }

    let parsed = parse_validate_config_cli_args(args.as_slice())?;
    let config = load_config(parsed.config_path.as_deref())?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "ok": true,
            "api": config.api_url(),
            "apps_domain": config.apps_domain,
            "api_transport": config.api_transport.as_str(),
            "backend": config.backend.map(Backend::as_str),
            "timeout_scale": config.timeout_scale,
            "default_timeout_secs": config.default_timeout().as_secs_f64(),
            "cf_push_timeout_secs": config.cf_push_timeout().as_secs_f64(),
        }))?
    );
    Ok(())
}

fn print_usage() {
    eprintln!(concat!(
        "Usage:\n",
        "  platform-acceptance list\n",
        "  platform-acceptance run [--config PATH] [--only NAME]... [--report PATH]\n",
        "  platform-acceptance validate-config [--config PATH]\n\n",
        "Defaults:\n",
        "  --config falls back to PLATFORM_ACCEPTANCE_CONFIG\n",
        "  without --report the run report is printed to stdout\n",
        "  RUST_LOG controls log verbosity (default: info)\n"
    ));
}
