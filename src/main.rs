mod cli;

use mp4dash::{Failure, Orchestrator, Report, RunSettings, Stage};

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use cli::Cli;
use dash_av::ToolRegistry;
use dash_core::{Config, Options};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

const BANNER_BEGIN: &str = "================ mp4dash begin ================";
const BANNER_END: &str = "================ mp4dash end ==================";

fn main() -> ExitCode {
    let (args, ignored) = cli::normalize_args(std::env::args());

    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let err = dash_core::Error::invalid_argument(e.to_string());
            println!("{BANNER_BEGIN}");
            println!("ERROR");
            println!("{}", err.to_string().trim_end());
            println!("{BANNER_END}");
            return ExitCode::from(err.exit_code());
        }
    };

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mp4dash=debug,dash_core=debug,dash_av=debug".to_string()
        } else {
            "mp4dash=info,dash_core=info,dash_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    for arg in &ignored {
        tracing::warn!("ignoring unknown argument {arg:?}");
    }

    if cli.check_tools {
        return match check_tools(&cli) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e:#}");
                ExitCode::from(exit_code(&e))
            }
        };
    }

    println!("{BANNER_BEGIN}");
    let code = match run(&cli) {
        Ok(report) => {
            print_report(&report, cli.dry_run);
            println!("Job done.");
            0
        }
        Err(e) => {
            print_error(&e);
            exit_code(&e)
        }
    };
    println!("{BANNER_END}");

    ExitCode::from(code)
}

fn load_config(cli: &Cli) -> dash_core::Result<Config> {
    let path = match cli.config {
        Some(ref path) => path.clone(),
        None => Config::default_path()?,
    };
    let config = Config::load(&path)?;
    for warning in config.validate() {
        tracing::warn!("config: {warning}");
    }
    Ok(config)
}

fn run(cli: &Cli) -> Result<Report> {
    // The command line is checked before the config file is read.
    let options = Options::from_raw(cli.raw_options())
        .map_err(|e| Failure::new(Stage::ParseArgs, e))?;
    let config = load_config(cli).map_err(|e| Failure::new(Stage::ResolveConfig, e))?;
    let settings = RunSettings::from_config(&config, cli.transcode, cli.dry_run);
    let cancel = CancellationToken::new();
    let orchestrator = Orchestrator::new(config, settings, cancel.clone());

    // Everything runs on one thread; child processes are awaited one at a time.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    let report = rt.block_on(async {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted; stopping the running tool");
                cancel.cancel();
            }
        });
        orchestrator.run_options(options).await
    })?;

    Ok(report)
}

fn print_report(report: &Report, dry_run: bool) {
    if dry_run {
        for cmd in &report.transcode_commands {
            println!("{cmd}");
        }
        println!("{}", report.package_command);
        return;
    }

    println!(
        "Transcoded {} of {} work items (audio + {} video renditions)",
        report.transcodes_run,
        report.plan.items().len(),
        report.plan.video_count()
    );
    println!("Manifest: {}", report.options.manifest_path().display());
}

fn print_error(e: &anyhow::Error) {
    println!("ERROR");
    if let Some(failure) = e.downcast_ref::<Failure>() {
        match failure.item {
            Some(ref item) => println!("{failure} ({item})"),
            None => println!("{failure}"),
        }
        if let Some(output) = failure.source.captured_output() {
            println!("{}", output.trim_end());
        }
    } else {
        println!("{e:#}");
    }
}

fn exit_code(e: &anyhow::Error) -> u8 {
    if let Some(failure) = e.downcast_ref::<Failure>() {
        failure.exit_code()
    } else if let Some(err) = e.downcast_ref::<dash_core::Error>() {
        err.exit_code()
    } else {
        1
    }
}

fn check_tools(cli: &Cli) -> Result<()> {
    let path = match cli.config {
        Some(ref path) => path.clone(),
        None => Config::default_path()?,
    };
    let config = Config::load_or_default(&path);

    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    if all_ok {
        println!("\nAll tools available.");
    } else {
        println!("\nSome tools are missing; packaging will fail until they are installed.");
    }

    Ok(())
}
