use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_count_matrix::app::{self, App, BuildOptions, ProgressSinkKind};
use kira_count_matrix::config::{ConfigLoader, DEFAULT_CONFIG_FILE};
use kira_count_matrix::domain::JoinStrategy;
use kira_count_matrix::error::CountMatrixError;
use kira_count_matrix::output::{JsonOutput, OutputMode, TextOutput};

#[derive(Parser)]
#[command(name = "kira-cm")]
#[command(about = "Build DESeq2 count matrix and coldata tables from RNA-seq quantification files")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Load, merge and write the count matrix, coldata and manifest")]
    Build(BuildArgs),
    #[command(about = "Write only the coldata table for the configured groups")]
    Coldata(ColdataArgs),
    #[command(about = "Check that a coldata table matches a count matrix")]
    Check(CheckArgs),
    #[command(about = "Generate kira-cm.json with the default group layout")]
    Init(InitArgs),
}

#[derive(Args)]
struct BuildArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,

    #[arg(long)]
    cross_join: Option<JoinStrategy>,

    #[arg(long, help = "Also write per-group median expression")]
    summary: bool,

    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct ColdataArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,

    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct CheckArgs {
    #[arg(long)]
    matrix: Utf8PathBuf,

    #[arg(long)]
    coldata: Utf8PathBuf,
}

#[derive(Args)]
struct InitArgs {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    path: Utf8PathBuf,

    #[arg(long)]
    force: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CountMatrixError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CountMatrixError) -> u8 {
    match error {
        CountMatrixError::MissingConfig
        | CountMatrixError::ConfigRead(_)
        | CountMatrixError::ConfigParse(_)
        | CountMatrixError::InvalidConfig(_)
        | CountMatrixError::InvalidGroupLabel(_)
        | CountMatrixError::InvalidGroupSpecifier(_)
        | CountMatrixError::ConfigExists(_) => 2,
        CountMatrixError::InputOpen { .. }
        | CountMatrixError::MissingColumn { .. }
        | CountMatrixError::MalformedHeader { .. }
        | CountMatrixError::MalformedRow { .. }
        | CountMatrixError::InvalidGeneId { .. } => 3,
        CountMatrixError::EmptyGroup(_)
        | CountMatrixError::DuplicateColumn(_)
        | CountMatrixError::EmptyMatrix
        | CountMatrixError::ColdataMismatch(_) => 4,
        CountMatrixError::Filesystem(_) => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    match cli.command {
        Commands::Build(args) => run_build(args, output_mode),
        Commands::Coldata(args) => run_coldata(args, output_mode),
        Commands::Check(args) => run_check(args, output_mode),
        Commands::Init(args) => run_init(args, output_mode),
    }
}

fn run_build(args: BuildArgs, output_mode: OutputMode) -> miette::Result<()> {
    let BuildArgs {
        config,
        out_dir,
        cross_join,
        summary,
        dry_run,
    } = args;

    let resolved = ConfigLoader::resolve(config.as_deref())?.with_overrides(out_dir, cross_join);
    let app = App::new(resolved);
    let options = BuildOptions { summary, dry_run };

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.build(options, &JsonOutput)?;
            JsonOutput::print_build(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let text = TextOutput::new(ProgressSinkKind::Build);
            let result = app.build(options, &text)?;
            text.print_build(&result);
        }
    }
    Ok(())
}

fn run_coldata(args: ColdataArgs, output_mode: OutputMode) -> miette::Result<()> {
    let resolved = ConfigLoader::resolve(args.config.as_deref())?.with_overrides(args.out_dir, None);
    let app = App::new(resolved);

    match output_mode {
        OutputMode::NonInteractive => {
            let result = app.coldata(args.dry_run, &JsonOutput)?;
            JsonOutput::print_coldata(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let text = TextOutput::new(ProgressSinkKind::Coldata);
            let result = app.coldata(args.dry_run, &text)?;
            text.print_coldata(&result);
        }
    }
    Ok(())
}

fn run_check(args: CheckArgs, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app::check(&args.matrix, &args.coldata, &JsonOutput)?;
            JsonOutput::print_check(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let text = TextOutput::new(ProgressSinkKind::Check);
            let result = app::check(&args.matrix, &args.coldata, &text)?;
            text.print_check(&result);
        }
    }
    Ok(())
}

fn run_init(args: InitArgs, output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => {
            let result = app::init_config(&args.path, args.force, &JsonOutput)?;
            JsonOutput::print_init(&result).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let text = TextOutput::new(ProgressSinkKind::Init);
            let result = app::init_config(&args.path, args.force, &text)?;
            text.print_init(&result);
        }
    }
    Ok(())
}
