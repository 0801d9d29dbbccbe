//! Post-generation linking of records across files.

use docgraph_core::{DocId, DocKind, Result};
use docgraph_store::{DocStore, Query};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::debug;

/// File subset a resolver pass is limited to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveConstraint {
    file_paths: Option<BTreeSet<String>>,
}

impl ResolveConstraint {
    /// Every file in the store.
    pub fn all() -> Self {
        Self { file_paths: None }
    }

    pub fn files<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            file_paths: Some(paths.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.file_paths.is_none()
    }

    pub fn contains(&self, file_path: &str) -> bool {
        match &self.file_paths {
            Some(paths) => paths.contains(file_path),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub classes: usize,
    pub dependents_added: usize,
}

pub trait DocResolver: Send + Sync {
    fn resolve(
        &self,
        store: &mut DocStore,
        constraint: &ResolveConstraint,
    ) -> Result<ResolveSummary>;
}

/// Computes `extends_chains` for classes and registers dependent files.
///
/// A class in file C whose chain reaches a class in file P makes C a
/// dependent of P. A file C importing P makes C a dependent of P.
#[derive(Debug, Clone, Copy, Default)]
pub struct InheritanceResolver;

impl InheritanceResolver {
    pub fn new() -> Self {
        Self
    }

    /// Ancestors of `class_id`, nearest first. Unresolvable supertypes end the
    /// chain with their written name. Returns the chain and the files of the
    /// resolved ancestors.
    fn chain_of(&self, store: &DocStore, class_id: DocId) -> (Vec<String>, Vec<String>) {
        let mut chain = Vec::new();
        let mut files = Vec::new();
        let Some(class) = store.get(class_id) else {
            return (chain, files);
        };
        let mut visited: FxHashSet<String> = FxHashSet::default();
        visited.insert(class.longname.clone());

        let mut current = class;
        while let Some(supertype) = current.extends().first() {
            let Some(parent) = store
                .find_by_name(supertype, Some(DocKind::ModuleClass))
                .into_iter()
                .next()
            else {
                chain.push(supertype.clone());
                break;
            };
            if !visited.insert(parent.longname.clone()) {
                debug!(class = %class.longname, at = %parent.longname, "Inheritance cycle");
                break;
            }
            chain.push(parent.longname.clone());
            files.push(parent.file_path.clone());
            current = parent;
        }
        (chain, files)
    }

    fn add_dependent(
        store: &mut DocStore,
        file_ids: &FxHashMap<String, Vec<DocId>>,
        target: &str,
        dependent: &str,
    ) -> Result<usize> {
        if target == dependent {
            return Ok(0);
        }
        let mut added = 0;
        for id in file_ids.get(target).into_iter().flatten() {
            let mut result = Ok(false);
            store.update(*id, |doc| result = doc.add_dependent_file(dependent))?;
            if result? {
                added += 1;
            }
        }
        Ok(added)
    }
}

impl DocResolver for InheritanceResolver {
    fn resolve(
        &self,
        store: &mut DocStore,
        constraint: &ResolveConstraint,
    ) -> Result<ResolveSummary> {
        let mut summary = ResolveSummary::default();

        let mut file_ids: FxHashMap<String, Vec<DocId>> = FxHashMap::default();
        for file in store.find(&Query::new().kind(DocKind::ModuleFile)) {
            file_ids
                .entry(file.file_path.clone())
                .or_default()
                .push(file.id);
        }

        if constraint.is_unconstrained() {
            for id in file_ids.values().flatten() {
                store.update(*id, |doc| doc.clear_dependent_files())?;
            }
        }

        let class_ids: Vec<(DocId, String)> = store
            .find(&Query::new().kind(DocKind::ModuleClass))
            .into_iter()
            .filter(|c| constraint.contains(&c.file_path))
            .map(|c| (c.id, c.file_path.clone()))
            .collect();

        for (id, class_file) in class_ids {
            let (chain, ancestor_files) = self.chain_of(store, id);
            let mut set_result = Ok(());
            store.update(id, |doc| set_result = doc.set_extends_chains(chain))?;
            set_result?;
            summary.classes += 1;

            for ancestor_file in ancestor_files {
                summary.dependents_added +=
                    Self::add_dependent(store, &file_ids, &ancestor_file, &class_file)?;
            }
        }

        let imports: Vec<(String, Vec<String>)> = store
            .find(&Query::new().kind(DocKind::ModuleFile))
            .into_iter()
            .filter(|f| constraint.contains(&f.file_path))
            .map(|f| (f.file_path.clone(), f.imports().to_vec()))
            .collect();
        for (importer, imported) in imports {
            for target in imported {
                summary.dependents_added +=
                    Self::add_dependent(store, &file_ids, &target, &importer)?;
            }
        }

        debug!(
            classes = summary.classes,
            dependents_added = summary.dependents_added,
            "Resolved inheritance and imports"
        );
        Ok(summary)
    }
}
