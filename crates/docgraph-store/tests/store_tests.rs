use docgraph_core::{
    Access, DocGraphError, DocId, DocKind, DocObject, GenerateConfig, PendingDoc, StoreMode,
};
use docgraph_store::{DocStore, Field, MergeKey, Query, StoreOptions};

fn file(path: &str, dependents: &[&str]) -> DocObject {
    let mut b = DocObject::builder(DocKind::ModuleFile, path, path).file_path(path);
    for d in dependents {
        b = b.dependent_file(*d);
    }
    b.build().unwrap()
}

fn class(path: &str, name: &str, chain: &[&str]) -> DocObject {
    DocObject::builder(DocKind::ModuleClass, name, format!("{}~{}", path, name))
        .file_path(path)
        .extends_chains(chain.iter().map(|s| s.to_string()).collect())
        .build()
        .unwrap()
}

fn method(path: &str, class_longname: &str, name: &str) -> DocObject {
    DocObject::builder(
        DocKind::ClassMethod,
        name,
        format!("{}#{}", class_longname, name),
    )
    .memberof(class_longname)
    .file_path(path)
    .build()
    .unwrap()
}

fn variable(path: &str, name: &str, line: u32, documented: bool) -> DocObject {
    DocObject::builder(DocKind::ModuleVariable, name, format!("{}~{}", path, name))
        .file_path(path)
        .line_number(line)
        .undocument(!documented)
        .build()
        .unwrap()
}

#[test]
fn test_find_sorted_by_name_with_stable_ties() {
    let mut store = DocStore::new(StoreMode::Generate);
    store
        .insert(vec![
            variable("a.js", "zeta", 1, true),
            variable("a.js", "alpha", 2, true),
            variable("b.js", "alpha", 3, true),
            variable("c.js", "mid", 4, true),
        ])
        .unwrap();

    let hits = store.find(&Query::new().kind(DocKind::ModuleVariable));
    let names: Vec<_> = hits.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["alpha", "alpha", "mid", "zeta"]);
    assert!(hits[0].id < hits[1].id);

    for pair in hits.windows(2) {
        assert!(pair[0].name <= pair[1].name);
    }
}

#[test]
fn test_insert_assigns_strictly_increasing_ids() {
    let mut store = DocStore::new(StoreMode::Generate);
    let mut max_seen = DocId(0);
    for i in 0..20 {
        let id = store
            .insert(variable("a.js", &format!("v{}", i), i, true))
            .unwrap()[0];
        assert!(id > max_seen);
        max_seen = id;

        let found: Vec<_> = store.iter().filter(|d| d.id == id).collect();
        assert_eq!(found.len(), 1);
    }
}

#[test]
fn test_unindexed_fields_fall_back_to_scan() {
    let mut store = DocStore::new(StoreMode::Generate);
    store
        .insert(vec![
            DocObject::builder(DocKind::ModuleFunction, "open", "a.js~open")
                .file_path("a.js")
                .access(Access::Private)
                .build()
                .unwrap(),
            DocObject::builder(DocKind::ModuleFunction, "close", "a.js~close")
                .file_path("a.js")
                .build()
                .unwrap(),
        ])
        .unwrap();

    let private = store.find(&Query::new().access(Access::Private));
    assert_eq!(private.len(), 1);
    assert_eq!(private[0].name, "open");

    let like = store
        .find(&Query::new().file_path("a.js").like(Field::Name, "c*e").unwrap());
    assert_eq!(like.len(), 1);
    assert_eq!(like[0].name, "close");
}

#[test]
fn test_find_by_name_stages() {
    let mut store = DocStore::new(StoreMode::Generate);
    store
        .insert(vec![
            class("src/foo.js", "Foo", &[]),
            method("src/foo.js", "src/foo.js~Foo", "bar"),
        ])
        .unwrap();

    assert_eq!(store.find_by_name("src/foo.js~Foo", None).len(), 1);
    assert_eq!(store.find_by_name("Foo", None)[0].longname, "src/foo.js~Foo");

    let hits = store.find_by_name("Foo#bar", None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].longname, "src/foo.js~Foo#bar");

    // `*` in the name is matched literally.
    assert!(store.find_by_name("F*o#bar", None).is_empty());

    assert!(store.find_by_name("Foo", Some(DocKind::ModuleFunction)).is_empty());
    assert!(store.find_by_name("Missing", None).is_empty());
}

#[test]
fn test_find_by_name_walks_inheritance_chain() {
    let mut store = DocStore::new(StoreMode::Generate);
    store
        .insert(vec![
            class("src/base.js", "Root", &[]),
            method("src/base.js", "src/base.js~Root", "bar"),
            class("src/base.js", "Base", &["src/base.js~Root"]),
            method("src/base.js", "src/base.js~Base", "bar"),
            class(
                "src/foo.js",
                "Foo",
                &["src/base.js~Base", "src/base.js~Root"],
            ),
        ])
        .unwrap();

    let hits = store.find_by_name("Foo#bar", None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].memberof, "src/base.js~Base");

    let dotted = store.find_by_name("Foo.bar", Some(DocKind::ClassMethod));
    assert_eq!(dotted.len(), 1);

    assert!(store.find_by_name("Foo#baz", None).is_empty());
    assert!(store.find_by_name("Nope#bar", None).is_empty());
}

#[test]
fn test_access_and_identifier_groupings_skip_builtins() {
    let mut store = DocStore::new(StoreMode::Generate);
    store
        .insert(vec![
            class("a.js", "Pub", &[]),
            DocObject::builder(DocKind::ModuleClass, "Shape", "a.js~Shape")
                .file_path("a.js")
                .interface(true)
                .build()
                .unwrap(),
            DocObject::builder(DocKind::ModuleClass, "Hidden", "a.js~Hidden")
                .file_path("a.js")
                .access(Access::Protected)
                .build()
                .unwrap(),
            DocObject::builder(DocKind::VirtualExternal, "Array", "external:Array")
                .builtin_virtual(true)
                .build()
                .unwrap(),
            DocObject::builder(DocKind::VirtualExternal, "Widget", "external:Widget")
                .build()
                .unwrap(),
            DocObject::builder(DocKind::VirtualTypedef, "Options", "a.js~Options")
                .file_path("a.js")
                .build()
                .unwrap(),
        ])
        .unwrap();

    let access = store.find_access_docs(&Query::new().kind(DocKind::ModuleClass));
    assert_eq!(access.public.len(), 2);
    assert_eq!(access.protected.len(), 1);
    assert!(access.private.is_empty());

    let kinds = store.find_identifier_kind_docs();
    let names = |docs: &[&DocObject]| docs.iter().map(|d| d.name.clone()).collect::<Vec<_>>();
    assert_eq!(names(&kinds.classes), ["Hidden", "Pub"]);
    assert_eq!(names(&kinds.interfaces), ["Shape"]);
    assert_eq!(names(&kinds.externals), ["Widget"]);
    assert_eq!(names(&kinds.typedefs), ["Options"]);
    assert!(kinds.functions.is_empty());

    // Builtins remain directly queryable.
    assert_eq!(store.find(&Query::new().builtin_virtual(true)).len(), 1);
}

#[test]
fn test_find_dependent_files_union() {
    let mut store = DocStore::new(StoreMode::Generate);
    store
        .insert(vec![
            file("a.js", &["c.js", "b.js"]),
            file("b.js", &["c.js", "d.js"]),
            class("a.js", "NotAFile", &[]),
        ])
        .unwrap();

    let deps = store.find_dependent_files(&["a.js", "b.js"], None);
    assert_eq!(deps, ["b.js", "c.js", "d.js"]);

    let deps = store.find_dependent_files(&["b.js"], Some(vec!["a.js".to_string(), "c.js".to_string()]));
    assert_eq!(deps, ["a.js", "c.js", "d.js"]);

    assert!(store.find_dependent_files(&["zzz.js"], None).is_empty());
}

#[test]
fn test_remove_and_insert_db_replaces_only_scratch_files() {
    let mut main = DocStore::new(StoreMode::Generate);
    main.insert(vec![
        variable("A", "old1", 1, true),
        variable("B", "keep1", 1, true),
        variable("A", "old2", 2, true),
        variable("B", "keep2", 2, true),
    ])
    .unwrap();
    let b_before: Vec<DocObject> = main
        .find(&Query::new().file_path("B"))
        .into_iter()
        .cloned()
        .collect();

    let mut scratch = main.spawn_scratch();
    scratch
        .insert(vec![variable("A", "new1", 1, true), variable("A", "new2", 5, false)])
        .unwrap();
    let scratch_names: Vec<String> = scratch.iter().map(|d| d.name.clone()).collect();

    let paths = main.remove_and_insert_db(scratch);
    assert_eq!(paths, ["A"]);

    let a_names: Vec<String> = main
        .find(&Query::new().file_path("A"))
        .into_iter()
        .map(|d| d.name.clone())
        .collect();
    assert_eq!(a_names, scratch_names);

    let b_after: Vec<DocObject> = main
        .find(&Query::new().file_path("B"))
        .into_iter()
        .cloned()
        .collect();
    assert_eq!(b_before, b_after);
    assert_eq!(main.file_paths(), ["A", "B"]);
}

#[test]
fn test_self_insert_and_merge_conflict() {
    let mut store = DocStore::new(StoreMode::Generate);
    store
        .insert(vec![variable("a.js", "x", 1, true), variable("a.js", "y", 2, true)])
        .unwrap();
    let snapshot = store.to_json().unwrap();

    let own = store.export(&Query::new());
    let err = store.merge(own.clone()).unwrap_err();
    assert!(matches!(err, DocGraphError::IdentityConflict { .. }));
    let err = store.insert(own).unwrap_err();
    assert!(matches!(err, DocGraphError::IdentityConflict { .. }));
    assert_eq!(store.to_json().unwrap(), snapshot);

    // A clone is a different instance.
    let mut copy = store.clone();
    let outcome = copy.merge(store.export(&Query::new())).unwrap();
    assert_eq!(outcome.replaced.len(), 2);
    assert!(outcome.appended.is_empty());
    assert_eq!(copy.len(), 2);
}

#[test]
fn test_export_copies_instead_of_aliasing() {
    let mut source = DocStore::new(StoreMode::Generate);
    source.insert(variable("a.js", "x", 1, true)).unwrap();
    let mut target = DocStore::new(StoreMode::Generate);
    target.insert(variable("b.js", "y", 1, true)).unwrap();

    let ids = target.insert(source.export(&Query::new())).unwrap();
    assert_eq!(ids, [DocId(2)]);
    target
        .update(ids[0], |d| d.name = "changed".to_string())
        .unwrap();
    assert_eq!(source.find(&Query::new())[0].name, "x");
}

#[test]
fn test_update_rolls_back_a_kind_change() {
    let mut store = DocStore::new(StoreMode::Generate);
    let ids = store
        .insert(vec![file("a.js", &["b.js"]), class("a.js", "A", &[])])
        .unwrap();

    let err = store
        .update(ids[0], |d| {
            d.kind = DocKind::ModuleClass;
            d.name = "renamed".to_string();
        })
        .unwrap_err();
    assert!(matches!(err, DocGraphError::InvalidArgument(_)));

    let kept = store.get(ids[0]).unwrap();
    assert_eq!(kept.kind, DocKind::ModuleFile);
    assert_eq!(kept.name, "a.js");
    assert_eq!(store.find(&Query::new().kind(DocKind::ModuleClass)).len(), 1);
    assert_eq!(store.find_dependent_files(&["a.js"], None), ["b.js"]);

    store
        .update(ids[0], |d| d.kind = DocKind::TestFile)
        .unwrap();
    assert_eq!(store.find(&Query::new().kind(DocKind::TestFile)).len(), 1);
}

#[test]
fn test_merge_by_longname_replaces_in_place() {
    let mut main = DocStore::new(StoreMode::Generate);
    main.insert(vec![variable("a.js", "x", 1, false), variable("a.js", "y", 2, true)])
        .unwrap();

    let updated = variable("a.js", "x", 10, true);
    let fresh = variable("a.js", "z", 3, true);
    let outcome = main
        .merge_by(vec![updated, fresh], MergeKey::Longname)
        .unwrap();
    assert_eq!(outcome.replaced, [DocId(1)]);
    assert_eq!(outcome.appended, [DocId(3)]);

    let x = main.get(DocId(1)).unwrap();
    assert_eq!(x.line_number, Some(10));
    assert!(!x.undocument);
    let order: Vec<_> = main.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(order, ["x", "y", "z"]);

    let other_file = DocObject::builder(DocKind::ModuleVariable, "x", "a.js~x")
        .file_path("b.js")
        .build()
        .unwrap();
    let outcome = main
        .merge_by(other_file, MergeKey::FileAndLongname)
        .unwrap();
    assert!(outcome.replaced.is_empty());
    assert_eq!(outcome.appended.len(), 1);
}

#[test]
fn test_source_coverage() {
    let mut store = DocStore::new(StoreMode::Generate);
    assert_eq!(store.get_source_coverage(None, false).percent(), 0.0);

    let mut docs = Vec::new();
    for i in 0..7 {
        docs.push(variable("a.js", &format!("doc{}", i), i + 1, true));
    }
    for (i, line) in [30u32, 12, 21].iter().enumerate() {
        let path = if i == 0 { "b.js" } else { "a.js" };
        docs.push(variable(path, &format!("undoc{}", i), *line, false));
    }
    docs.push(file("a.js", &[]));
    docs.push(
        DocObject::builder(DocKind::ModuleClass, "Object", "builtin~Object")
            .builtin_virtual(true)
            .undocument(true)
            .build()
            .unwrap(),
    );
    store.insert(docs).unwrap();

    let total = store.get_source_coverage(None, false);
    assert_eq!(total.percent(), 70.0);
    assert_eq!(total.to_string(), "70.00% (7/10)");
    assert!(total.files.is_none());

    let by_file = store.get_source_coverage(None, true);
    let files = by_file.files.unwrap();
    assert_eq!(files["a.js"].undocumented_lines, [12, 21]);
    assert_eq!(files["a.js"].to_string(), "77.77% (7/9)");
    assert_eq!(files["b.js"].undocumented_lines, [30]);

    let only_b = store.get_source_coverage(Some("b.js"), false);
    assert_eq!(only_b.expect_count, 1);
    assert_eq!(only_b.percent(), 0.0);
}

#[test]
fn test_seeded_store_and_options() {
    let options = StoreOptions {
        include_source: true,
        keep_ast: false,
    };
    let store = DocStore::seeded(
        StoreMode::Regenerate,
        options,
        vec![variable("a.js", "x", 1, true), variable("a.js", "y", 2, true)],
    );
    assert_eq!(store.mode(), StoreMode::Regenerate);
    assert_eq!(store.options(), options);
    assert_eq!(store.iter().map(|d| d.id).collect::<Vec<_>>(), [DocId(1), DocId(2)]);

    let json: serde_json::Value = serde_json::from_str(&store.to_json().unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[0]["name"], "x");

    let from_config = StoreOptions::from(&GenerateConfig::default());
    assert!(from_config.include_source);
    assert!(!from_config.keep_ast);
    assert_eq!(StoreOptions::default(), from_config);

    let mut plain = DocStore::new(StoreMode::Generate);
    let id = plain
        .insert_static_doc(
            PendingDoc::new(
                DocObject::builder(DocKind::ModuleVariable, "z", "a.js~z")
                    .content("let z")
                    .build()
                    .unwrap(),
            ),
            None,
        )
        .unwrap();
    assert_eq!(plain.get(id).unwrap().content.as_deref(), Some("let z"));
}
