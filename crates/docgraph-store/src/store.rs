use crate::coverage::{FileCoverage, SourceCoverage};
use crate::query::{Cond, Field, Query};
use docgraph_core::{
    Access, DocGraphError, DocId, DocKind, DocObject, GenerateConfig, InsertHook, PendingDoc,
    Result, StoreMode,
};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one store instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

impl StoreId {
    fn fresh() -> Self {
        Self(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Defaults match [`GenerateConfig::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Keep raw source on admitted records.
    pub include_source: bool,
    /// Keep the AST back-reference on admitted records.
    pub keep_ast: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            include_source: true,
            keep_ast: false,
        }
    }
}

impl From<&GenerateConfig> for StoreOptions {
    fn from(config: &GenerateConfig) -> Self {
        Self {
            include_source: config.include_source,
            keep_ast: config.keep_ast,
        }
    }
}

/// Records to insert or merge. Exported batches remember the store they came from.
#[derive(Debug, Clone, Default)]
pub struct DocBatch {
    origin: Option<StoreId>,
    docs: Vec<DocObject>,
}

impl DocBatch {
    pub fn origin(&self) -> Option<StoreId> {
        self.origin
    }

    pub fn docs(&self) -> &[DocObject] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn into_docs(self) -> Vec<DocObject> {
        self.docs
    }
}

impl From<DocObject> for DocBatch {
    fn from(doc: DocObject) -> Self {
        Self {
            origin: None,
            docs: vec![doc],
        }
    }
}

impl From<Vec<DocObject>> for DocBatch {
    fn from(docs: Vec<DocObject>) -> Self {
        Self { origin: None, docs }
    }
}

/// How [`DocStore::merge_by`] pairs incoming records with existing ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergeKey {
    #[default]
    Id,
    Longname,
    FileAndLongname,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub replaced: Vec<DocId>,
    pub appended: Vec<DocId>,
}

#[derive(Debug, Default)]
pub struct AccessDocs<'s> {
    pub public: Vec<&'s DocObject>,
    pub protected: Vec<&'s DocObject>,
    pub private: Vec<&'s DocObject>,
}

#[derive(Debug, Default)]
pub struct IdentifierKindDocs<'s> {
    pub classes: Vec<&'s DocObject>,
    pub interfaces: Vec<&'s DocObject>,
    pub functions: Vec<&'s DocObject>,
    pub variables: Vec<&'s DocObject>,
    pub externals: Vec<&'s DocObject>,
    pub typedefs: Vec<&'s DocObject>,
}

/// Indexed in-memory store of doc objects.
///
/// Ids are handed out in insertion order, so iterating the id-ordered map is
/// iterating in insertion order. Secondary indexes map field values to id sets
/// and are kept in step with every mutation.
pub struct DocStore {
    id: StoreId,
    mode: StoreMode,
    options: StoreOptions,
    hooks: Vec<Arc<dyn InsertHook>>,
    last_id: u64,
    records: BTreeMap<DocId, DocObject>,
    by_file: FxHashMap<String, BTreeSet<DocId>>,
    by_longname: FxHashMap<String, BTreeSet<DocId>>,
    by_memberof: FxHashMap<String, BTreeSet<DocId>>,
    by_kind: FxHashMap<DocKind, BTreeSet<DocId>>,
}

impl DocStore {
    pub fn new(mode: StoreMode) -> Self {
        Self::with_options(mode, StoreOptions::default())
    }

    pub fn with_options(mode: StoreMode, options: StoreOptions) -> Self {
        Self {
            id: StoreId::fresh(),
            mode,
            options,
            hooks: Vec::new(),
            last_id: 0,
            records: BTreeMap::new(),
            by_file: FxHashMap::default(),
            by_longname: FxHashMap::default(),
            by_memberof: FxHashMap::default(),
            by_kind: FxHashMap::default(),
        }
    }

    /// Store pre-populated with `docs`, which receive fresh ids in order.
    pub fn seeded(mode: StoreMode, options: StoreOptions, docs: Vec<DocObject>) -> Self {
        let mut store = Self::with_options(mode, options);
        for doc in docs {
            store.insert_one(doc);
        }
        store
    }

    pub fn with_hook(mut self, hook: Arc<dyn InsertHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn add_hook(&mut self, hook: Arc<dyn InsertHook>) {
        self.hooks.push(hook);
    }

    /// Empty `Regenerate` store sharing this store's options and hooks.
    pub fn spawn_scratch(&self) -> DocStore {
        let mut scratch = DocStore::with_options(StoreMode::Regenerate, self.options);
        scratch.hooks = self.hooks.clone();
        scratch
    }

    pub fn id(&self) -> StoreId {
        self.id
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: DocId) -> Option<&DocObject> {
        self.records.get(&id)
    }

    /// All records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &DocObject> + '_ {
        self.records.values()
    }

    /// Distinct file paths currently present, sorted.
    pub fn file_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .by_file
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(p, _)| p.as_str())
            .collect();
        paths.sort_unstable();
        paths
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn find(&self, query: &Query) -> Vec<&DocObject> {
        let mut hits: Vec<&DocObject> = match self.candidates(query) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.records.get(id))
                .filter(|doc| query.matches(doc))
                .collect(),
            None => self.records.values().filter(|doc| query.matches(doc)).collect(),
        };
        let field = query.sort_field();
        hits.sort_by(|a, b| field.value(a).cmp(&field.value(b)));
        hits
    }

    /// Intersection of the index hits of every indexable condition, or `None`
    /// when no condition can use an index.
    fn candidates(&self, query: &Query) -> Option<BTreeSet<DocId>> {
        let mut narrowed: Option<BTreeSet<DocId>> = None;
        for cond in query.conds() {
            let Some(ids) = self.index_lookup(cond) else {
                continue;
            };
            narrowed = Some(match narrowed {
                None => ids,
                Some(prev) => prev.intersection(&ids).copied().collect(),
            });
            if narrowed.as_ref().is_some_and(BTreeSet::is_empty) {
                break;
            }
        }
        narrowed
    }

    fn index_lookup(&self, cond: &Cond) -> Option<BTreeSet<DocId>> {
        let values: Vec<&str> = match cond {
            Cond::Eq(_, v) => vec![v.as_str()],
            Cond::In(_, vs) => vs.iter().map(String::as_str).collect(),
            _ => return None,
        };
        let index_of = |index: &FxHashMap<String, BTreeSet<DocId>>| {
            values
                .iter()
                .filter_map(|v| index.get(*v))
                .flatten()
                .copied()
                .collect::<BTreeSet<_>>()
        };
        match cond.field() {
            Field::FilePath => Some(index_of(&self.by_file)),
            Field::Longname => Some(index_of(&self.by_longname)),
            Field::Memberof => Some(index_of(&self.by_memberof)),
            Field::Kind => Some(
                values
                    .iter()
                    .filter_map(|v| v.parse::<DocKind>().ok())
                    .filter_map(|k| self.by_kind.get(&k))
                    .flatten()
                    .copied()
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Name lookup in four stages, returning the first stage with hits:
    /// exact longname, exact name, longname ending in `~name`, and for
    /// `Parent.child` or `Parent#child` a member `child` found along the
    /// inheritance chain of class `Parent`.
    pub fn find_by_name(&self, name: &str, kind: Option<DocKind>) -> Vec<&DocObject> {
        let base = || match kind {
            Some(k) => Query::new().kind(k),
            None => Query::new(),
        };

        let hits = self.find(&base().longname(name));
        if !hits.is_empty() {
            return hits;
        }

        let hits = self.find(&base().name(name));
        if !hits.is_empty() {
            return hits;
        }

        let hits = self.find(&base().ends_with(Field::Longname, format!("~{}", name)));
        if !hits.is_empty() {
            return hits;
        }

        if let Some(idx) = name.rfind(['.', '#']) {
            let (parent, child) = (&name[..idx], &name[idx + 1..]);
            if parent.is_empty() || child.is_empty() {
                return Vec::new();
            }
            let Some(class) = self
                .find_by_name(parent, Some(DocKind::ModuleClass))
                .into_iter()
                .next()
            else {
                return Vec::new();
            };
            for ancestor in class.extends_chains() {
                let hits = self.find(&base().memberof(ancestor.as_str()).name(child));
                if !hits.is_empty() {
                    return hits;
                }
            }
        }

        Vec::new()
    }

    /// Records matching `query`, split by access. Builtin virtuals are left out.
    pub fn find_access_docs(&self, query: &Query) -> AccessDocs<'_> {
        let mut out = AccessDocs::default();
        for doc in self.find(query) {
            if doc.builtin_virtual {
                continue;
            }
            match doc.access {
                Access::Public => out.public.push(doc),
                Access::Protected => out.protected.push(doc),
                Access::Private => out.private.push(doc),
            }
        }
        out
    }

    pub fn find_identifier_kind_docs(&self) -> IdentifierKindDocs<'_> {
        let visible = |kind: DocKind| self.find(&Query::new().kind(kind).builtin_virtual(false));
        let (interfaces, classes): (Vec<&DocObject>, Vec<&DocObject>) = visible(DocKind::ModuleClass)
            .into_iter()
            .partition(|d| d.is_interface());
        IdentifierKindDocs {
            classes,
            interfaces,
            functions: visible(DocKind::ModuleFunction),
            variables: visible(DocKind::ModuleVariable),
            externals: visible(DocKind::VirtualExternal),
            typedefs: visible(DocKind::VirtualTypedef),
        }
    }

    /// Union of the dependent files registered on the `ModuleFile` records of
    /// `paths`, appended to `out` without duplicates.
    pub fn find_dependent_files<S: AsRef<str>>(
        &self,
        paths: &[S],
        out: Option<Vec<String>>,
    ) -> Vec<String> {
        let mut result = out.unwrap_or_default();
        let mut seen: FxHashSet<String> = result.iter().cloned().collect();
        for path in paths {
            let query = Query::new()
                .kind(DocKind::ModuleFile)
                .file_path(path.as_ref());
            for file in self.find(&query) {
                for dep in file.dependent_file_paths().into_iter().flatten() {
                    if seen.insert(dep.clone()) {
                        result.push(dep.clone());
                    }
                }
            }
        }
        result
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Copy the records matching `query` into a batch tagged with this store.
    pub fn export(&self, query: &Query) -> DocBatch {
        DocBatch {
            origin: Some(self.id),
            docs: self.find(query).into_iter().cloned().collect(),
        }
    }

    fn check_origin(&self, batch: &DocBatch) -> Result<()> {
        if batch.origin == Some(self.id) {
            return Err(DocGraphError::IdentityConflict { store: self.id.0 });
        }
        Ok(())
    }

    /// Append every record of `batch` under a fresh id.
    pub fn insert(&mut self, batch: impl Into<DocBatch>) -> Result<Vec<DocId>> {
        let batch = batch.into();
        self.check_origin(&batch)?;
        let ids: Vec<DocId> = batch
            .docs
            .into_iter()
            .map(|doc| self.insert_one(doc))
            .collect();
        debug!(store = self.id.0, count = ids.len(), "Inserted records");
        Ok(ids)
    }

    pub fn merge(&mut self, batch: impl Into<DocBatch>) -> Result<MergeOutcome> {
        self.merge_by(batch, MergeKey::default())
    }

    /// Replace records matching on `key` in place, append the rest.
    pub fn merge_by(&mut self, batch: impl Into<DocBatch>, key: MergeKey) -> Result<MergeOutcome> {
        let batch = batch.into();
        self.check_origin(&batch)?;

        let mut outcome = MergeOutcome::default();
        for doc in batch.docs {
            match self.merge_target(&doc, key) {
                Some(existing) => {
                    self.replace(existing, doc);
                    outcome.replaced.push(existing);
                }
                None => outcome.appended.push(self.insert_one(doc)),
            }
        }
        debug!(
            store = self.id.0,
            replaced = outcome.replaced.len(),
            appended = outcome.appended.len(),
            "Merged records"
        );
        Ok(outcome)
    }

    fn merge_target(&self, doc: &DocObject, key: MergeKey) -> Option<DocId> {
        match key {
            MergeKey::Id => self.records.contains_key(&doc.id).then_some(doc.id),
            MergeKey::Longname => self
                .by_longname
                .get(&doc.longname)
                .and_then(|ids| ids.first().copied()),
            MergeKey::FileAndLongname => {
                let by_name = self.by_longname.get(&doc.longname)?;
                let by_file = self.by_file.get(&doc.file_path)?;
                by_name.intersection(by_file).next().copied()
            }
        }
    }

    /// Admit one generated record.
    ///
    /// Returns `None` when `filter` vetoes the record. Hooks that apply to this
    /// store's mode see the record together with its AST node before the node
    /// loan is released.
    pub fn insert_static_doc(
        &mut self,
        pending: PendingDoc<'_>,
        filter: Option<&dyn Fn(&DocObject) -> bool>,
    ) -> Option<DocId> {
        if let Some(filter) = filter {
            if !filter(pending.doc()) {
                debug!(longname = %pending.doc().longname, "Record vetoed by filter");
                return None;
            }
        }

        for hook in self.hooks.iter().filter(|h| h.applies_to(self.mode)) {
            hook.inspect(&pending);
        }

        let mut doc = pending.release();
        if !self.options.keep_ast {
            doc.ast_node = None;
        }
        if !self.options.include_source {
            doc.content = None;
        }
        Some(self.insert_one(doc))
    }

    /// Remove every record matching `query`. Returns how many were removed.
    pub fn remove(&mut self, query: &Query) -> usize {
        let ids: Vec<DocId> = self.find(query).into_iter().map(|d| d.id).collect();
        for id in &ids {
            self.remove_one(*id);
        }
        debug!(store = self.id.0, count = ids.len(), "Removed records");
        ids.len()
    }

    /// Edit a record in place. The id is kept whatever `edit` does to it.
    /// An edit leaving the record invalid is rolled back and reported.
    pub fn update<F>(&mut self, id: DocId, edit: F) -> Result<()>
    where
        F: FnOnce(&mut DocObject),
    {
        let Some(mut doc) = self.remove_one(id) else {
            return Err(DocGraphError::invalid_argument(format!(
                "no record with id {}",
                id
            )));
        };
        let original = doc.clone();
        edit(&mut doc);
        doc.id = id;
        let checked = doc.validate();
        let doc = if checked.is_ok() { doc } else { original };
        self.index(&doc);
        self.records.insert(id, doc);
        checked
    }

    /// Swap in the records of a scratch store.
    ///
    /// Every file path present in `scratch` is cleared from this store, then
    /// all scratch records are inserted. Returns those file paths in the order
    /// they first appear in `scratch`.
    pub fn remove_and_insert_db(&mut self, scratch: DocStore) -> Vec<String> {
        let paths: Vec<String> = {
            let mut seen = FxHashSet::default();
            scratch
                .records
                .values()
                .filter(|d| seen.insert(d.file_path.as_str()))
                .map(|d| d.file_path.clone())
                .collect()
        };

        let mut removed = 0;
        for path in &paths {
            removed += self.remove(&Query::new().file_path(path.as_str()));
        }
        let inserted = scratch.records.len();
        for (_, doc) in scratch.records {
            self.insert_one(doc);
        }
        debug!(
            files = paths.len(),
            removed,
            inserted,
            "Replaced file records from scratch store"
        );
        paths
    }

    /// Drop every record and restart id assignment.
    pub fn reset(&mut self) {
        self.records.clear();
        self.by_file.clear();
        self.by_longname.clear();
        self.by_memberof.clear();
        self.by_kind.clear();
        self.last_id = 0;
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    pub fn get_source_coverage(&self, file_path: Option<&str>, include_files: bool) -> SourceCoverage {
        let mut query = Query::new()
            .kinds(&DocKind::COVERABLE)
            .builtin_virtual(false);
        if let Some(path) = file_path {
            query = query.file_path(path);
        }

        let mut coverage = SourceCoverage::default();
        let mut files: BTreeMap<String, FileCoverage> = BTreeMap::new();
        for doc in self.find(&query) {
            coverage.expect_count += 1;
            let documented = !doc.undocument;
            if documented {
                coverage.actual_count += 1;
            }
            if include_files {
                let file = files.entry(doc.file_path.clone()).or_default();
                file.expect_count += 1;
                if documented {
                    file.actual_count += 1;
                } else if let Some(line) = doc.line_number {
                    file.undocumented_lines.push(line);
                }
            }
        }

        if include_files {
            for file in files.values_mut() {
                file.undocumented_lines.sort_unstable();
            }
            coverage.files = Some(files);
        }
        coverage
    }

    /// Serialize all records in id order.
    pub fn to_json(&self) -> Result<String> {
        let docs: Vec<&DocObject> = self.records.values().collect();
        Ok(serde_json::to_string_pretty(&docs)?)
    }

    // ------------------------------------------------------------------
    // Index maintenance
    // ------------------------------------------------------------------

    fn insert_one(&mut self, mut doc: DocObject) -> DocId {
        self.last_id += 1;
        let id = DocId(self.last_id);
        doc.id = id;
        self.index(&doc);
        self.records.insert(id, doc);
        id
    }

    fn replace(&mut self, id: DocId, mut doc: DocObject) {
        self.remove_one(id);
        doc.id = id;
        self.index(&doc);
        self.records.insert(id, doc);
    }

    fn remove_one(&mut self, id: DocId) -> Option<DocObject> {
        let doc = self.records.remove(&id)?;
        unindex(&mut self.by_file, &doc.file_path, id);
        unindex(&mut self.by_longname, &doc.longname, id);
        unindex(&mut self.by_memberof, &doc.memberof, id);
        unindex(&mut self.by_kind, &doc.kind, id);
        Some(doc)
    }

    fn index(&mut self, doc: &DocObject) {
        self.by_file
            .entry(doc.file_path.clone())
            .or_default()
            .insert(doc.id);
        self.by_longname
            .entry(doc.longname.clone())
            .or_default()
            .insert(doc.id);
        self.by_memberof
            .entry(doc.memberof.clone())
            .or_default()
            .insert(doc.id);
        self.by_kind.entry(doc.kind).or_default().insert(doc.id);
    }
}

fn unindex<K, Q>(index: &mut FxHashMap<K, BTreeSet<DocId>>, key: &Q, id: DocId)
where
    K: std::borrow::Borrow<Q> + Eq + Hash,
    Q: Eq + Hash + ?Sized,
{
    if let Some(ids) = index.get_mut(key) {
        ids.remove(&id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

/// A clone is a different store: same records and ids, new identity.
impl Clone for DocStore {
    fn clone(&self) -> Self {
        Self {
            id: StoreId::fresh(),
            mode: self.mode,
            options: self.options,
            hooks: self.hooks.clone(),
            last_id: self.last_id,
            records: self.records.clone(),
            by_file: self.by_file.clone(),
            by_longname: self.by_longname.clone(),
            by_memberof: self.by_memberof.clone(),
            by_kind: self.by_kind.clone(),
        }
    }
}

impl fmt::Debug for DocStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocStore")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("options", &self.options)
            .field("hooks", &self.hooks.len())
            .field("records", &self.records.len())
            .finish()
    }
}
