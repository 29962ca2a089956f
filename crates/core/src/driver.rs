use crate::apply::{apply_rename, ensure_writable_dir, ApplyResult};
use crate::error::RenameError;
use crate::extract::MetadataReader;
use crate::planner::{plan_file, scan_inputs, PlanOptions, RenamePlan, SkipReason};
use crate::sequence::Resolver;
use crate::template::Template;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// How computed renames are confirmed before they are applied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BulkMode {
    #[default]
    Always,
    Never,
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkChoice {
    Yes,
    No,
    Always,
    Never,
    Abort,
}

/// Interactive confirmation, asked once per changed file in `Ask` mode.
pub trait Prompt {
    fn ask(&mut self, plan: &RenamePlan) -> BulkChoice;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Apply,
    Decline,
    Abort,
}

/// `Always` and `Never` answers stick for the rest of the run.
#[derive(Debug)]
struct BulkDecider {
    mode: BulkMode,
}

impl BulkDecider {
    fn decide(&mut self, plan: &RenamePlan, prompt: &mut dyn Prompt) -> Decision {
        match self.mode {
            BulkMode::Always => Decision::Apply,
            BulkMode::Never => Decision::Decline,
            BulkMode::Ask => match prompt.ask(plan) {
                BulkChoice::Yes => Decision::Apply,
                BulkChoice::No => Decision::Decline,
                BulkChoice::Always => {
                    self.mode = BulkMode::Always;
                    Decision::Apply
                }
                BulkChoice::Never => {
                    self.mode = BulkMode::Never;
                    Decision::Decline
                }
                BulkChoice::Abort => Decision::Abort,
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub plan: PlanOptions,
    pub dry_run: bool,
    pub bulk_mode: BulkMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum FileOutcome {
    Renamed,
    WouldRename,
    Unchanged,
    Declined,
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RenameStats {
    pub scanned: usize,
    pub renamed: usize,
    pub unchanged: usize,
    pub skipped_hidden: usize,
    pub skipped_protected: usize,
    pub skipped_unsupported: usize,
    pub declined: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub template: String,
    pub dry_run: bool,
    pub aborted: Option<String>,
    pub entries: Vec<ReportEntry>,
    pub stats: RenameStats,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        if self.aborted.is_some() || self.stats.failed > 0 {
            1
        } else {
            0
        }
    }

    fn record(&mut self, entry: ReportEntry) {
        match &entry.outcome {
            FileOutcome::Renamed | FileOutcome::WouldRename => self.stats.renamed += 1,
            FileOutcome::Unchanged => self.stats.unchanged += 1,
            FileOutcome::Declined => self.stats.declined += 1,
            FileOutcome::Skipped(SkipReason::Hidden) => self.stats.skipped_hidden += 1,
            FileOutcome::Skipped(SkipReason::Protected) => self.stats.skipped_protected += 1,
            FileOutcome::Skipped(SkipReason::Unsupported) => self.stats.skipped_unsupported += 1,
            FileOutcome::Failed(_) => self.stats.failed += 1,
        }
        self.entries.push(entry);
    }
}

/// Runs one bulk rename: scan, then extract, resolve, decide and apply for
/// each file in order.
///
/// A bad template or a missing input fails before any file is touched. Once
/// processing has started, per-file errors are logged and counted, and a
/// fatal error stops the run with `aborted` set on the report.
pub fn run<R: MetadataReader + ?Sized>(
    options: &RunOptions,
    reader: &R,
    prompt: &mut dyn Prompt,
) -> Result<RunReport, RenameError> {
    let template = Template::parse(&options.plan.template)?;
    let scan = scan_inputs(&options.plan)?;

    let mut resolver = Resolver::new(options.plan.sequence_start);
    for (dir, count) in &scan.dir_counts {
        resolver.register_directory(dir, *count);
    }

    let mut report = RunReport {
        template: template.as_str().to_string(),
        dry_run: options.dry_run,
        aborted: None,
        entries: Vec::with_capacity(scan.files.len() + scan.skipped.len()),
        stats: RenameStats {
            scanned: scan.files.len() + scan.skipped.len(),
            ..RenameStats::default()
        },
    };

    for (path, reason) in scan.skipped {
        log::debug!("skipping {} ({:?})", path.display(), reason);
        report.record(ReportEntry {
            source: path,
            destination: None,
            outcome: FileOutcome::Skipped(reason),
        });
    }

    let mut session = Session {
        template: &template,
        resolver: &mut resolver,
        decider: BulkDecider {
            mode: options.bulk_mode,
        },
        dry_run: options.dry_run,
        checked_dirs: HashSet::new(),
    };

    for path in scan.files {
        match session.process(&path, reader, prompt) {
            Ok(Step::Done(entry)) => report.record(entry),
            Ok(Step::Abort) => {
                log::warn!("aborted by user");
                report.aborted = Some("aborted by user".to_string());
                break;
            }
            Err(err) if err.is_fatal() => {
                log::error!("{}", err);
                report.aborted = Some(err.to_string());
                break;
            }
            Err(err) => {
                log::warn!("{}", err);
                report.record(ReportEntry {
                    source: path,
                    destination: None,
                    outcome: FileOutcome::Failed(err.to_string()),
                });
            }
        }
    }

    Ok(report)
}

enum Step {
    Done(ReportEntry),
    Abort,
}

struct Session<'a> {
    template: &'a Template,
    resolver: &'a mut Resolver,
    decider: BulkDecider,
    dry_run: bool,
    checked_dirs: HashSet<PathBuf>,
}

impl Session<'_> {
    fn process<R: MetadataReader + ?Sized>(
        &mut self,
        path: &Path,
        reader: &R,
        prompt: &mut dyn Prompt,
    ) -> Result<Step, RenameError> {
        let plan = plan_file(path, reader, self.template, self.resolver)?;

        if !plan.changed {
            log::debug!(
                "skipping {}, it already has the correct name",
                path.display()
            );
            return Ok(Step::Done(entry(plan, FileOutcome::Unchanged)));
        }

        if self.dry_run {
            self.resolver.vacate(&plan.source);
            return Ok(Step::Done(entry(plan, FileOutcome::WouldRename)));
        }

        match self.decider.decide(&plan, prompt) {
            Decision::Abort => return Ok(Step::Abort),
            Decision::Decline => return Ok(Step::Done(entry(plan, FileOutcome::Declined))),
            Decision::Apply => {}
        }

        if let Some(dir) = plan.destination.parent() {
            if !self.checked_dirs.contains(dir) {
                ensure_writable_dir(dir)?;
                self.checked_dirs.insert(dir.to_path_buf());
            }
        }

        let outcome = match apply_rename(&plan)? {
            ApplyResult::Renamed => FileOutcome::Renamed,
            ApplyResult::Unchanged => FileOutcome::Unchanged,
        };
        if outcome == FileOutcome::Renamed {
            self.resolver.vacate(&plan.source);
        }
        Ok(Step::Done(entry(plan, outcome)))
    }
}

fn entry(plan: RenamePlan, outcome: FileOutcome) -> ReportEntry {
    ReportEntry {
        source: plan.source,
        destination: Some(plan.destination),
        outcome,
    }
}
