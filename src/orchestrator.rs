//! Sequences one packaging run.
//!
//! ParseArgs -> ResolveConfig -> PlanWork -> RunTranscodes -> RunPackage ->
//! Done. Any stage may end the run with a [`Failure`]; nothing is retried.
//! External processes run one at a time, in plan order.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use dash_av::{ToolCommand, ToolOutput, ToolRegistry, FFMPEG, MP4BOX};
use dash_core::{BitrateTable, Config, Options, RawOptions, RenditionPlan};
use tokio_util::sync::CancellationToken;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ParseArgs,
    ResolveConfig,
    PlanWork,
    RunTranscodes,
    RunPackage,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ParseArgs => "parse arguments",
            Stage::ResolveConfig => "resolve config",
            Stage::PlanWork => "plan renditions",
            Stage::RunTranscodes => "transcode",
            Stage::RunPackage => "package",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Terminal failure of a run: the stage it happened in and why.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct Failure {
    pub stage: Stage,
    /// The work item being processed, for transcode failures.
    pub item: Option<String>,
    #[source]
    pub source: dash_core::Error,
}

impl Failure {
    pub fn new(stage: Stage, source: dash_core::Error) -> Self {
        Self {
            stage,
            item: None,
            source,
        }
    }

    fn at(stage: Stage) -> impl FnOnce(dash_core::Error) -> Failure {
        move |source| Failure::new(stage, source)
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        self.source.exit_code()
    }
}

/// Run policy, fixed for the lifetime of an [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Run the ffmpeg stage before packaging.
    pub transcode: bool,
    /// Build and report every command without running any.
    pub dry_run: bool,
    /// Append-only log for tool output.
    pub log_path: PathBuf,
    /// Upper bound for each tool invocation.
    pub timeout: Duration,
}

impl RunSettings {
    /// Settings from the config file; `force_transcode` turns the transcode
    /// stage on regardless of `[run] transcode`.
    pub fn from_config(config: &Config, force_transcode: bool, dry_run: bool) -> Self {
        Self {
            transcode: config.run.transcode || force_transcode,
            dry_run,
            log_path: config.run.log_path.clone(),
            timeout: config.tools.timeout(),
        }
    }
}

/// What a finished run did.
#[derive(Debug)]
pub struct Report {
    pub options: Options,
    pub plan: RenditionPlan,
    /// One command per work item, in plan order.
    pub transcode_commands: Vec<ToolCommand>,
    pub package_command: ToolCommand,
    /// Number of transcodes actually executed.
    pub transcodes_run: usize,
    /// Packager result; `None` on a dry run.
    pub package_output: Option<ToolOutput>,
}

/// Drives the pipeline stages.
pub struct Orchestrator {
    config: Config,
    tools: ToolRegistry,
    settings: RunSettings,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(config: Config, settings: RunSettings, cancel: CancellationToken) -> Self {
        let tools = ToolRegistry::discover(&config.tools);
        Self {
            config,
            tools,
            settings,
            cancel,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    fn enter(&self, stage: Stage) {
        tracing::info!("stage: {stage}");
    }

    fn prepare(&self, mut cmd: ToolCommand) -> ToolCommand {
        cmd.timeout(self.settings.timeout)
            .cancel_on(self.cancel.clone());
        cmd
    }

    /// Execute one packaging run.
    pub async fn run(&self, raw: RawOptions) -> Result<Report, Failure> {
        self.enter(Stage::ParseArgs);
        let options = Options::from_raw(raw).map_err(Failure::at(Stage::ParseArgs))?;
        self.run_options(options).await
    }

    /// Execute one packaging run from options that already passed the
    /// ParseArgs stage.
    pub async fn run_options(&self, options: Options) -> Result<Report, Failure> {
        self.enter(Stage::ResolveConfig);
        let table = BitrateTable::resolve(&options.resolutions, &self.config)
            .map_err(Failure::at(Stage::ResolveConfig))?;

        self.enter(Stage::PlanWork);
        let plan = RenditionPlan::new(&options.input_path(), options.output_dir(), &table)
            .map_err(Failure::at(Stage::PlanWork))?;
        let ffmpeg = self.tools.program(FFMPEG);
        let transcode_commands: Vec<ToolCommand> = plan
            .items()
            .iter()
            .map(|item| {
                self.prepare(dash_av::transcode_command(
                    ffmpeg.clone(),
                    plan.input(),
                    item,
                    options.keyint,
                ))
            })
            .collect();
        let package_command = self.prepare(dash_av::package_command(
            self.tools.program(MP4BOX),
            &options,
            plan.outputs(),
        ));
        tracing::info!(
            "{} renditions of {} planned",
            plan.video_count(),
            plan.input().display()
        );

        if self.settings.dry_run {
            tracing::info!("dry run: no tool will be executed");
            return Ok(Report {
                options,
                plan,
                transcode_commands,
                package_command,
                transcodes_run: 0,
                package_output: None,
            });
        }

        let log = dash_av::RunLog::new(&self.settings.log_path);

        let mut transcodes_run = 0;
        if self.settings.transcode {
            self.enter(Stage::RunTranscodes);
            for (item, cmd) in plan.items().iter().zip(&transcode_commands) {
                tracing::info!("transcoding {}: {cmd}", item.describe());
                cmd.execute(&log)
                    .await
                    .and_then(ToolOutput::into_result)
                    .map_err(|source| Failure {
                        stage: Stage::RunTranscodes,
                        item: Some(item.describe()),
                        source,
                    })?;
                transcodes_run += 1;
            }
        } else {
            tracing::info!("transcode stage disabled; packaging existing renditions");
        }

        self.enter(Stage::RunPackage);
        tracing::info!("packaging: {package_command}");
        let package_output = package_command
            .execute(&log)
            .await
            .and_then(ToolOutput::into_result)
            .map_err(Failure::at(Stage::RunPackage))?;

        self.enter(Stage::Done);
        tracing::info!("manifest written to {}", options.manifest_path().display());

        Ok(Report {
            options,
            plan,
            transcode_commands,
            package_command,
            transcodes_run,
            package_output: Some(package_output),
        })
    }
}
