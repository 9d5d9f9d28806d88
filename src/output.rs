use std::io::{self, Write};

use serde::Serialize;

use crate::app::{
    BuildResult, CheckResult, ColdataResult, InitResult, ProgressEvent, ProgressSink,
    ProgressSinkKind,
};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_build(result: &BuildResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_coldata(result: &ColdataResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_check(result: &CheckResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_init(result: &InitResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Progress lines on stderr and a coloured summary on stdout.
pub struct TextOutput {
    kind: ProgressSinkKind,
}

impl TextOutput {
    pub fn new(kind: ProgressSinkKind) -> Self {
        Self { kind }
    }

    pub fn print_build(&self, result: &BuildResult) {
        println!("{CYAN}KIRA-CM summary{RESET}");
        for group in &result.groups {
            println!(
                "{GREEN}  {}: {} samples, {} genes{RESET}",
                group.label, group.samples, group.genes
            );
        }
        println!(
            "{GREEN}  matrix: {} genes x {} samples ({} join, {} incomplete rows dropped){RESET}",
            result.assembly.genes,
            result.assembly.samples,
            result.assembly.join,
            result.assembly.incomplete_rows_dropped
        );
        if result.dry_run {
            println!("{YELLOW}  dry run: no files written{RESET}");
            return;
        }
        println!("{CYAN}  count matrix: {}{RESET}", result.outputs.count_matrix);
        println!("{CYAN}  coldata: {}{RESET}", result.outputs.coldata);
        if let Some(path) = &result.outputs.group_medians {
            println!("{CYAN}  group medians: {path}{RESET}");
        }
        println!("{CYAN}  manifest: {}{RESET}", result.outputs.manifest);
    }

    pub fn print_coldata(&self, result: &ColdataResult) {
        let verb = if result.dry_run { "would write" } else { "wrote" };
        println!("{GREEN}{verb} {} coldata rows to {}{RESET}", result.rows, result.path);
    }

    pub fn print_check(&self, result: &CheckResult) {
        println!(
            "{GREEN}{} matches {} ({} samples){RESET}",
            result.coldata, result.count_matrix, result.samples
        );
    }

    pub fn print_init(&self, result: &InitResult) {
        println!(
            "{GREEN}wrote {} with {} groups{RESET}",
            result.path, result.groups
        );
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        let prefix = match self.kind {
            ProgressSinkKind::Build => "build",
            ProgressSinkKind::Coldata => "coldata",
            ProgressSinkKind::Check => "check",
            ProgressSinkKind::Init => "init",
        };
        match event.elapsed {
            Some(elapsed) => eprintln!(
                "[{prefix}] {} ({:.2}s)",
                event.message,
                elapsed.as_secs_f64()
            ),
            None => eprintln!("[{prefix}] {}", event.message),
        }
    }
}
