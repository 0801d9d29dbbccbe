use crate::pipeline::{GenerationPipeline, Outcome};
use crate::resolver::{DocResolver, ResolveConstraint};
use docgraph_core::{DocId, DocKind, OnError, RegenerateConfig, Result};
use docgraph_store::{DocStore, Query};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerateOptions {
    pub on_error: OnError,
    pub propagate_dependents: bool,
    pub resolve: bool,
}

impl Default for RegenerateOptions {
    fn default() -> Self {
        Self {
            on_error: OnError::Throw,
            propagate_dependents: true,
            resolve: true,
        }
    }
}

impl From<&RegenerateConfig> for RegenerateOptions {
    fn from(config: &RegenerateConfig) -> Self {
        Self {
            on_error: config.on_error,
            propagate_dependents: config.propagate_dependents,
            resolve: config.resolve,
        }
    }
}

/// Step of a regeneration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegenerationState {
    #[default]
    Idle,
    BuildPrimary,
    BuildDependents,
    ReplaceInStore,
    ResolveConstrained,
}

impl fmt::Display for RegenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegenerationState::Idle => "idle",
            RegenerationState::BuildPrimary => "build-primary",
            RegenerationState::BuildDependents => "build-dependents",
            RegenerationState::ReplaceInStore => "replace-in-store",
            RegenerationState::ResolveConstrained => "resolve-constrained",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerationReport {
    pub file_path: String,
    /// Files whose records were replaced or that depend on the changed file.
    pub files: Vec<String>,
    pub rebuilt_dependents: usize,
    pub duration: Duration,
}

/// Rebuilds the records of one changed file, and of the files registered as
/// its dependents, without touching the rest of the main store.
///
/// Records are built into a scratch store first and swapped in only when every
/// file was generated, so a failure under `Throw` leaves the main store as it
/// was.
pub struct RegenerationEngine {
    pipeline: GenerationPipeline,
    resolver: Option<Arc<dyn DocResolver>>,
    options: RegenerateOptions,
    state: RegenerationState,
}

impl RegenerationEngine {
    pub fn new(pipeline: GenerationPipeline, options: RegenerateOptions) -> Self {
        Self {
            pipeline: pipeline.with_on_error(options.on_error),
            resolver: None,
            options,
            state: RegenerationState::Idle,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn DocResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn options(&self) -> RegenerateOptions {
        self.options
    }

    pub fn state(&self) -> RegenerationState {
        self.state
    }

    /// Regenerate `file_path` into `main` and return the affected file paths.
    pub fn regenerate(
        &mut self,
        main: &mut DocStore,
        file_path: impl AsRef<Path>,
    ) -> Result<Vec<String>> {
        self.regenerate_with_report(main, file_path)
            .map(|report| report.files)
    }

    pub fn regenerate_with_report(
        &mut self,
        main: &mut DocStore,
        file_path: impl AsRef<Path>,
    ) -> Result<RegenerationReport> {
        let start = Instant::now();
        let file_path = self.pipeline.relative_to_root(file_path);
        let result = self.run(main, &file_path);
        self.transition(RegenerationState::Idle);

        let (files, rebuilt_dependents) = result?;
        let report = RegenerationReport {
            file_path,
            files,
            rebuilt_dependents,
            duration: start.elapsed(),
        };
        info!(
            file = %report.file_path,
            affected = report.files.len(),
            dependents = report.rebuilt_dependents,
            elapsed_ms = report.duration.as_millis() as u64,
            "Regenerated docs"
        );
        Ok(report)
    }

    fn run(&mut self, main: &mut DocStore, file_path: &str) -> Result<(Vec<String>, usize)> {
        self.transition(RegenerationState::BuildPrimary);
        let mut scratch = main.spawn_scratch();
        let outcome = self.pipeline.generate_file(file_path, &mut scratch)?;
        if outcome == Outcome::Skipped {
            debug!(file = file_path, "Changed file is excluded from generation");
        }

        let mut rebuilt = 0;
        if self.options.propagate_dependents {
            self.transition(RegenerationState::BuildDependents);
            for dependent in main.find_dependent_files(&[file_path], None) {
                if dependent == file_path {
                    continue;
                }
                debug!(file = %dependent, "Rebuilding dependent");
                self.pipeline.generate_file(&dependent, &mut scratch)?;
                rebuilt += 1;
            }
        }

        self.transition(RegenerationState::ReplaceInStore);
        let carried = carry_dependents(main, &mut scratch)?;
        debug!(carried, "Kept dependents of replaced files");
        let paths = main.remove_and_insert_db(scratch);

        let Some(resolver) = self.resolver.clone().filter(|_| self.options.resolve) else {
            return Ok((paths, rebuilt));
        };
        self.transition(RegenerationState::ResolveConstrained);
        resolver.resolve(main, &ResolveConstraint::files(paths.iter().cloned()))?;

        let files = if self.options.propagate_dependents {
            main.find_dependent_files(&[file_path], Some(paths))
        } else {
            paths
        };
        Ok((files, rebuilt))
    }

    fn transition(&mut self, next: RegenerationState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "Regeneration step");
            self.state = next;
        }
    }
}

/// Copy the dependents registered on `main`'s file records onto the rebuilt
/// file records in `scratch`.
///
/// Edges are stored on the file that is depended upon, so a rebuilt record
/// starts empty. Dependents that were not rebuilt would otherwise be lost.
fn carry_dependents(main: &DocStore, scratch: &mut DocStore) -> Result<usize> {
    let rebuilt: Vec<(DocId, String)> = scratch
        .find(&Query::new().kind(DocKind::ModuleFile))
        .into_iter()
        .map(|f| (f.id, f.file_path.clone()))
        .collect();

    let mut carried = 0;
    for (id, path) in rebuilt {
        let previous: Vec<String> = main
            .find(&Query::new().kind(DocKind::ModuleFile).file_path(path.as_str()))
            .into_iter()
            .filter_map(|f| f.dependent_file_paths())
            .flatten()
            .cloned()
            .collect();
        if previous.is_empty() {
            continue;
        }
        let mut added: Result<usize> = Ok(0);
        scratch.update(id, |doc| {
            added = previous.into_iter().try_fold(0, |n, dependent| {
                doc.add_dependent_file(dependent).map(|new| n + usize::from(new))
            });
        })?;
        carried += added?;
    }
    Ok(carried)
}
