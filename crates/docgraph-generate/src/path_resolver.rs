use docgraph_core::{GenerateConfig, ModuleIdentity, PathResolver};
use std::path::{Path, PathBuf};

/// Resolves project-relative record paths against a package root.
///
/// Import paths take the form `package/relative-path-without-extension`, or
/// just the extensionless relative path when no package name is known.
#[derive(Debug, Clone)]
pub struct PackagePathResolver {
    root: PathBuf,
    package_name: Option<String>,
}

impl PackagePathResolver {
    pub fn new(root: impl Into<PathBuf>, package_name: Option<String>) -> Self {
        Self {
            root: root.into(),
            package_name,
        }
    }

    /// Root and package name as configured under `[generate]`.
    pub fn from_config(config: &GenerateConfig) -> Self {
        Self::new(config.root.clone(), config.package_name.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn import_path(&self, relative: &str) -> String {
        let stem = strip_extension(relative);
        match &self.package_name {
            Some(pkg) => format!("{}/{}", pkg, stem),
            None => stem.to_string(),
        }
    }
}

impl PathResolver for PackagePathResolver {
    fn module_identity(&self, file_path: &str) -> ModuleIdentity {
        ModuleIdentity {
            file_path: self.root.join(file_path).to_string_lossy().into_owned(),
            relative_path: file_path.to_string(),
            import_path: self.import_path(file_path),
        }
    }

    fn resolve_import(&self, from_file: &str, specifier: &str) -> Option<String> {
        let target = if specifier.starts_with("./") || specifier.starts_with("../") {
            let dir = match from_file.rfind('/') {
                Some(idx) => &from_file[..idx],
                None => "",
            };
            normalize(&format!("{}/{}", dir, specifier))?
        } else {
            let pkg = self.package_name.as_deref()?;
            let rest = specifier.strip_prefix(pkg)?.strip_prefix('/')?;
            normalize(rest)?
        };

        if has_extension(&target) {
            Some(target)
        } else {
            match extension_of(from_file) {
                Some(ext) => Some(format!("{}.{}", target, ext)),
                None => Some(target),
            }
        }
    }
}

/// Collapse `.` and `..` segments. `None` when `..` climbs above the root.
fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn extension_of(path: &str) -> Option<&str> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

fn has_extension(path: &str) -> bool {
    extension_of(path).is_some()
}

fn strip_extension(path: &str) -> &str {
    match extension_of(path) {
        Some(ext) => &path[..path.len() - ext.len() - 1],
        None => path,
    }
}
