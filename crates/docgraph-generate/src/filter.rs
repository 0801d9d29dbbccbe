use docgraph_core::{ConfigError, DocGraphError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Component, Path};
use tracing::debug;

/// Include/exclude glob pair applied to project-relative paths.
#[derive(Debug, Clone)]
pub struct PathFilter {
    includes: Option<GlobSet>,
    excludes: GlobSet,
}

impl PathFilter {
    /// An empty include list admits every path.
    pub fn new<I, E, S, T>(includes: I, excludes: E) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let includes: Vec<S> = includes.into_iter().collect();
        let includes = if includes.is_empty() {
            None
        } else {
            Some(build_set(includes)?)
        };
        Ok(Self {
            includes,
            excludes: build_set(excludes)?,
        })
    }

    /// Filter that admits everything.
    pub fn allow_all() -> Self {
        Self {
            includes: None,
            excludes: GlobSet::empty(),
        }
    }

    pub fn is_included(&self, relative_path: &str) -> bool {
        if let Some(includes) = &self.includes {
            if !includes.is_match(relative_path) {
                debug!(path = relative_path, "Not matched by include patterns");
                return false;
            }
        }
        if self.excludes.is_match(relative_path) {
            debug!(path = relative_path, "Matched by exclude patterns");
            return false;
        }
        true
    }
}

fn build_set<I, S>(patterns: I) -> Result<GlobSet>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut builder = GlobSetBuilder::new();
    for p in patterns {
        let glob = Glob::new(p.as_ref()).map_err(glob_error)?;
        builder.add(glob);
    }
    builder.build().map_err(glob_error)
}

fn glob_error(e: globset::Error) -> DocGraphError {
    DocGraphError::Config(ConfigError::ValidationError(format!(
        "invalid glob pattern: {}",
        e
    )))
}

/// `path` relative to `root`, with `/` separators. Paths outside `root` are
/// returned unchanged.
pub fn relative_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().replace('\\', "/"),
    }
}
