//! Full-semantic projects: manifests, resolution, and watch events.

mod common;

use common::*;
use projgraph_core::{CapabilityLevel, CommandKind, ErrorKind, FileEvent, NormalizedPath};
use projgraph_host::MemoryFileSystem;
use projgraph_server::{ProjectKind, ServiceConfig, TextChange, TypeAcquisitionConfig};
use serde_json::json;
use std::sync::Arc;

fn configured_id(t: &TestSession) -> projgraph_server::ProjectId {
    t.service()
        .configured_project(&project_path("tsconfig.json"))
        .expect("configured project")
}

/// Projects holding `file` as a root.
fn root_owners(t: &TestSession, file: &NormalizedPath) -> Vec<projgraph_server::ProjectId> {
    t.service()
        .projects_for(file)
        .into_iter()
        .filter(|id| t.service().project(*id).is_some_and(|p| p.has_root(file)))
        .collect()
}

#[test]
fn test_manifest_creates_configured_project() {
    let mut t = TestSession::new(semantic_config(), import_fixture());
    let a = project_path("a.ts");
    t.open(&a);

    assert_eq!(t.service().counts().configured, 1);
    assert_eq!(t.service().counts().inferred, 0);
    let id = configured_id(&t);
    let project = t.service().project(id).unwrap();
    assert_eq!(project.kind(), ProjectKind::Configured);
    assert_eq!(project.capability(), CapabilityLevel::FullSemantic);
    assert_eq!(project.roots().len(), 3, "a, b and c are enumerated roots");
    assert!(!project.is_dirty());

    let files = t.files(id);
    // breadth-first from the first root: a, then what a imports
    assert_eq!(
        &files[..3],
        &[
            a,
            project_path("b.ts"),
            project_path("node_modules/something/index.d.ts")
        ]
    );
    assert!(files.contains(&project_path("c.ts")));
    assert_eq!(files.last(), Some(&path(LIB_FILE)));
}

#[test]
fn test_semantic_requests_are_dispatched() {
    let mut t = TestSession::new(semantic_config(), import_fixture());
    let a = project_path("a.ts");
    t.open(&a);

    let response = t.request_at(CommandKind::Completions, &a, "prop", 1);
    assert!(response.success, "{response:?}");
    let body = response.body.unwrap();
    assert_eq!(body["project"], project_path("tsconfig.json").as_str());
    assert_eq!(body["capability"], "fullSemantic");
    assert_eq!(body["location"], json!({ "line": 3, "offset": 47 }));
    assert!(t.log.rejections().is_empty());
}

#[test]
fn test_closing_document_keeps_configured_project() {
    let mut t = TestSession::new(semantic_config(), import_fixture());
    let a = project_path("a.ts");
    t.open(&a);
    let id = configured_id(&t);

    t.close(&a);
    assert_eq!(t.service().counts().configured, 1);
    let project = t.service().project(id).unwrap();
    assert!(project.is_dirty());
    assert!(project.has_root(&a));
    assert!(t.service().document(&a).is_some_and(|d| !d.is_open()));
}

#[test]
fn test_module_resolution_closure_without_manifest() {
    let fs = Arc::new(
        MemoryFileSystem::with_files([
            ("/w/a.ts", "import { b } from './b';\n/// <reference path=\"d.ts\" />"),
            ("/w/b.ts", "import { a } from './a';\nimport { c } from './c';"),
            ("/w/c.ts", "export const c = 1;"),
            ("/w/d.ts", "/// <reference path=\"a.ts\" />"),
        ])
        .unwrap(),
    );
    let mut t = TestSession::new(ServiceConfig::default(), fs);
    let a = path("/w/a.ts");
    t.open(&a);

    let id = t.only_inferred();
    // cyclic references are visited once; breadth-first from the root
    assert_eq!(
        t.files(id),
        vec![a, path("/w/b.ts"), path("/w/d.ts"), path("/w/c.ts")]
    );
    assert!(t.service().project(id).unwrap().unresolved().is_empty());
}

#[test]
fn test_unresolved_reference_is_recorded_not_fatal() {
    let fs = Arc::new(
        MemoryFileSystem::with_files([("/w/a.ts", "import { x } from './missing';")]).unwrap(),
    );
    let mut t = TestSession::new(ServiceConfig::default(), fs.clone());
    let a = path("/w/a.ts");
    t.open(&a);

    let id = t.only_inferred();
    assert_eq!(t.files(id), vec![a.clone()]);
    let unresolved = t.service().project(id).unwrap().unresolved().to_vec();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].specifier, "./missing");
    assert_eq!(unresolved[0].to_error().kind(), ErrorKind::ResolutionFailure);

    // creating the missing file dirties the project and the next build finds it
    let missing = fs.add_file("/w/missing.ts", "export const x = 1;").unwrap();
    t.service_mut()
        .on_file_event(&FileEvent::created(missing.clone()))
        .unwrap();
    assert!(t.service().project(id).unwrap().is_dirty());
    assert_eq!(t.files(id), vec![a, missing]);
    assert!(t.service().project(id).unwrap().unresolved().is_empty());
}

#[test]
fn test_ambient_declarations_in_full_mode() {
    let fs = import_fixture();
    fs.add_file("/node_modules/@types/somemodule/index.d.ts", SOMETHING_D_TS)
        .unwrap();
    fs.add_file(
        &format!("{PROJECT_DIR}/node_modules/@types/scope__pkg/index.d.ts"),
        "export {};",
    )
    .unwrap();
    let mut t = TestSession::new(semantic_config(), fs);
    t.open(&project_path("a.ts"));

    let files = t.files(configured_id(&t));
    assert!(files.contains(&path("/node_modules/@types/somemodule/index.d.ts")));
    assert!(files.contains(&project_path("node_modules/@types/scope__pkg/index.d.ts")));
}

#[test]
fn test_ambient_acquisition_policy() {
    let fs = import_fixture();
    fs.add_file("/node_modules/@types/somemodule/index.d.ts", SOMETHING_D_TS)
        .unwrap();
    fs.add_file("/node_modules/@types/other/index.d.ts", SOMETHING_D_TS)
        .unwrap();
    let config = ServiceConfig {
        type_acquisition: TypeAcquisitionConfig {
            exclude: vec!["somemodule".into()],
            ..TypeAcquisitionConfig::default()
        },
        ..semantic_config()
    };
    let mut t = TestSession::new(config, fs);
    t.open(&project_path("a.ts"));

    let files = t.files(configured_id(&t));
    assert!(!files.contains(&path("/node_modules/@types/somemodule/index.d.ts")));
    assert!(files.contains(&path("/node_modules/@types/other/index.d.ts")));
}

#[test]
fn test_manifest_types_restrict_acquisition_and_no_lib() {
    let fs = import_fixture();
    fs.add_file("/node_modules/@types/somemodule/index.d.ts", SOMETHING_D_TS)
        .unwrap();
    fs.add_file("/node_modules/@types/other/index.d.ts", SOMETHING_D_TS)
        .unwrap();
    fs.add_file(
        &format!("{PROJECT_DIR}/tsconfig.json"),
        r#"{ "compilerOptions": { "types": ["other"], "noLib": true } }"#,
    )
    .unwrap();
    let mut t = TestSession::new(semantic_config(), fs);
    t.open(&project_path("a.ts"));

    let files = t.files(configured_id(&t));
    assert!(files.contains(&path("/node_modules/@types/other/index.d.ts")));
    assert!(!files.contains(&path("/node_modules/@types/somemodule/index.d.ts")));
    assert!(!files.contains(&path(LIB_FILE)));
}

#[test]
fn test_manifest_syntax_only_option_caps_capability() {
    let fs = import_fixture();
    fs.add_file(
        &format!("{PROJECT_DIR}/tsconfig.json"),
        r#"{ "compilerOptions": { "syntaxOnly": true } }"#,
    )
    .unwrap();
    let mut t = TestSession::new(semantic_config(), fs);
    let a = project_path("a.ts");
    t.open(&a);

    let id = configured_id(&t);
    assert_eq!(
        t.service().project(id).unwrap().capability(),
        CapabilityLevel::SyntacticOnly
    );
    assert_rejected(&t.request(CommandKind::SemanticDiagnosticsSync, &a));
    assert_eq!(t.files(id).len(), 3);
}

#[test]
fn test_unreadable_manifest_degrades_but_tracks_document() {
    let fs = import_fixture();
    fs.add_file(&format!("{PROJECT_DIR}/tsconfig.json"), "{ not json")
        .unwrap();
    let mut t = TestSession::new(semantic_config(), fs);
    let a = project_path("a.ts");
    t.open(&a);

    let id = configured_id(&t);
    let project = t.service().project(id).unwrap();
    assert_eq!(project.capability(), CapabilityLevel::SyntacticOnly);
    assert!(project.has_root(&a));
    assert_eq!(
        project.configuration_error().map(|e| e.kind()),
        Some(ErrorKind::ConfigurationLoadFailure)
    );

    assert_rejected(&t.request(CommandKind::Completions, &a));
    let response = t.request(CommandKind::NavTree, &a);
    assert!(response.success, "{response:?}");
    assert_eq!(t.files(id), vec![a]);
}

#[test]
fn test_manifest_change_reloads_and_failure_downgrades() {
    let fs = import_fixture();
    let mut t = TestSession::new(semantic_config(), fs.clone());
    let a = project_path("a.ts");
    let manifest = project_path("tsconfig.json");
    t.open(&a);
    let id = configured_id(&t);

    fs.add_file(manifest.as_str(), r#"{ "files": ["a.ts"] }"#).unwrap();
    t.service_mut()
        .on_file_event(&FileEvent::modified(manifest.clone()))
        .unwrap();
    assert!(t.service().project(id).unwrap().is_dirty());
    t.files(id);
    let roots: Vec<NormalizedPath> = t.service().project(id).unwrap().roots().iter().cloned().collect();
    assert_eq!(roots, vec![a.clone()]);
    assert_eq!(
        t.service().project(id).unwrap().capability(),
        CapabilityLevel::FullSemantic
    );

    fs.add_file(manifest.as_str(), "[").unwrap();
    t.service_mut()
        .on_file_event(&FileEvent::modified(manifest))
        .unwrap();
    let files = t.files(id);
    let project = t.service().project(id).unwrap();
    assert!(!project.is_dirty());
    assert_eq!(project.capability(), CapabilityLevel::SyntacticOnly);
    assert!(project.configuration_error().is_some());
    assert_eq!(files, vec![a.clone()]);
    assert_rejected(&t.request(CommandKind::References, &a));
}

#[test]
fn test_manifest_deleted_reassigns_open_documents() {
    let fs = import_fixture();
    let mut t = TestSession::new(semantic_config(), fs.clone());
    let a = project_path("a.ts");
    let manifest = project_path("tsconfig.json");
    t.open(&a);

    fs.remove_file(&manifest);
    t.service_mut()
        .on_file_event(&FileEvent::deleted(manifest))
        .unwrap();
    assert_eq!(t.service().counts().configured, 0);
    let id = t.only_inferred();
    assert!(t.service().project(id).unwrap().has_root(&a));
}

#[test]
fn test_manifest_created_moves_open_documents() {
    let fs = import_fixture();
    let manifest = project_path("tsconfig.json");
    fs.remove_file(&manifest);
    let mut t = TestSession::new(semantic_config(), fs.clone());
    let a = project_path("a.ts");
    t.open(&a);
    assert_eq!(t.service().counts().inferred, 1);

    fs.add_file(manifest.as_str(), "{}").unwrap();
    t.service_mut()
        .on_file_event(&FileEvent::created(manifest))
        .unwrap();
    assert_eq!(t.service().counts().inferred, 0);
    assert!(t.service().project(configured_id(&t)).unwrap().has_root(&a));
}

#[test]
fn test_created_file_joins_configured_project() {
    let fs = import_fixture();
    let mut t = TestSession::new(semantic_config(), fs.clone());
    t.open(&project_path("a.ts"));
    let id = configured_id(&t);

    let d = fs
        .add_file(&format!("{PROJECT_DIR}/d.ts"), "export const d = 1;")
        .unwrap();
    t.service_mut()
        .on_file_event(&FileEvent::created(d.clone()))
        .unwrap();
    assert!(t.service().project(id).unwrap().has_root(&d));
    assert!(t.files(id).contains(&d));
}

#[test]
fn test_modified_closed_file_reloads_content() {
    let fs = import_fixture();
    let mut t = TestSession::new(semantic_config(), fs.clone());
    t.open(&project_path("a.ts"));
    let id = configured_id(&t);
    let c = project_path("c.ts");
    assert_eq!(t.service().document(&c).unwrap().version(), 1);

    fs.add_file(c.as_str(), "export const cc = 11;").unwrap();
    t.service_mut()
        .on_file_event(&FileEvent::modified(c.clone()))
        .unwrap();
    let document = t.service().document(&c).unwrap();
    assert_eq!(document.version(), 2);
    assert_eq!(document.content(), "export const cc = 11;");
    assert!(t.service().project(id).unwrap().is_dirty());
}

#[test]
fn test_modified_event_ignored_for_open_document() {
    let fs = import_fixture();
    let mut t = TestSession::new(semantic_config(), fs.clone());
    let a = project_path("a.ts");
    t.open(&a);

    fs.add_file(a.as_str(), "changed on disk").unwrap();
    t.service_mut()
        .on_file_event(&FileEvent::modified(a.clone()))
        .unwrap();
    assert_eq!(t.service().document(&a).unwrap().content(), A_TS);
}

#[test]
fn test_deleted_file_leaves_project() {
    let fs = import_fixture();
    let mut t = TestSession::new(semantic_config(), fs.clone());
    t.open(&project_path("a.ts"));
    let id = configured_id(&t);
    let c = project_path("c.ts");

    fs.remove_file(&c);
    t.service_mut()
        .on_file_event(&FileEvent::deleted(c.clone()))
        .unwrap();
    assert!(t.service().document(&c).is_none());
    let files = t.files(id);
    assert!(!files.contains(&c));
    let unresolved = t.service().project(id).unwrap().unresolved();
    assert!(unresolved.iter().any(|u| u.specifier == "./c"));
}

#[test]
fn test_edit_rejects_stale_version() {
    let mut t = TestSession::new(semantic_config(), import_fixture());
    let a = project_path("a.ts");
    t.open(&a);
    let id = configured_id(&t);

    t.service_mut()
        .edit_document(&a, &TextChange::full("let a = 1;"), 5)
        .unwrap();
    t.service_mut().ensure_up_to_date(id).unwrap();

    let err = t
        .service_mut()
        .edit_document(&a, &TextChange::full("let a = 2;"), 5)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VersionOrderingViolation);
    let document = t.service().document(&a).unwrap();
    assert_eq!(document.content(), "let a = 1;");
    assert_eq!(document.version(), 5);
    assert!(!t.service().project(id).unwrap().is_dirty());
}

#[test]
fn test_edit_closed_document_fails() {
    let mut t = TestSession::new(semantic_config(), import_fixture());
    t.open(&project_path("a.ts"));

    let c = project_path("c.ts");
    let err = t
        .service_mut()
        .edit_document(&c, &TextChange::full(""), 2)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DocumentNotOpen);

    let err = t
        .service_mut()
        .close_document(&project_path("nowhere.ts"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownDocument);
}

#[test]
fn test_list_projects_summaries() {
    let mut t = TestSession::new(semantic_config(), import_fixture());
    t.open(&project_path("a.ts"));
    t.service_mut()
        .open_document(path("/elsewhere/x.ts"), "let x = 1;".into())
        .unwrap();

    let summaries = t.service().list_projects();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].kind, ProjectKind::Configured);
    assert_eq!(summaries[0].root_count, 3);
    assert!(!summaries[0].dirty);
    assert_eq!(summaries[1].kind, ProjectKind::Inferred);
    assert_eq!(summaries[1].root_count, 1);
    assert!(summaries[1].dirty);

    let encoded = serde_json::to_value(&summaries[1]).unwrap();
    assert_eq!(encoded["rootCount"], 1);
    assert_eq!(encoded["kind"], "inferred");
}

#[test]
fn test_file_in_two_projects_prefers_root_owner() {
    let fs = Arc::new(
        MemoryFileSystem::with_files([
            ("/w/lib/shared.ts", "export const s = 1;"),
            ("/w/lib/tsconfig.json", "{}"),
            ("/w/app/main.ts", "import { s } from '../lib/shared';"),
        ])
        .unwrap(),
    );
    let mut t = TestSession::new(ServiceConfig::default(), fs);
    let main = path("/w/app/main.ts");
    let shared = path("/w/lib/shared.ts");
    t.open(&main);
    t.open(&shared);

    let owners = t.service().projects_for(&shared);
    assert_eq!(owners.len(), 2);
    let first = t.service().project(owners[0]).unwrap();
    assert_eq!(first.kind(), ProjectKind::Configured);
    assert_eq!(t.service().default_project_for(&shared), Some(owners[0]));
}

#[test]
fn test_manifest_reload_claims_document_from_inferred_project() {
    let fs = import_fixture();
    let manifest = project_path("tsconfig.json");
    fs.add_file(manifest.as_str(), r#"{ "files": ["a.ts"] }"#).unwrap();
    let mut t = TestSession::new(semantic_config(), fs.clone());
    let a = project_path("a.ts");
    let b = project_path("b.ts");
    t.open(&a);
    t.open(&b);
    let id = configured_id(&t);
    let inferred = t.only_inferred();
    assert_eq!(root_owners(&t, &b), vec![inferred]);

    fs.add_file(manifest.as_str(), r#"{ "files": ["a.ts", "b.ts"] }"#)
        .unwrap();
    t.service_mut()
        .on_file_event(&FileEvent::modified(manifest))
        .unwrap();
    t.service_mut().ensure_all_up_to_date().unwrap();

    assert_eq!(root_owners(&t, &b), vec![id]);
    assert_eq!(root_owners(&t, &a), vec![id]);
    assert!(t.service().project(inferred).is_none());
    assert_eq!(t.service().counts().inferred, 0);
    assert_eq!(t.service().default_project_for(&b), Some(id));
}

#[test]
fn test_new_configured_project_claims_open_roots() {
    let fs = import_fixture();
    let manifest = project_path("tsconfig.json");
    fs.remove_file(&manifest);
    let mut t = TestSession::new(semantic_config(), fs.clone());
    let a = project_path("a.ts");
    let b = project_path("b.ts");
    t.open(&b);
    let inferred = t.only_inferred();

    // no watch event: the manifest is only found while assigning `a`
    fs.add_file(manifest.as_str(), "{}").unwrap();
    t.open(&a);
    let id = configured_id(&t);

    assert_eq!(root_owners(&t, &a), vec![id]);
    assert_eq!(root_owners(&t, &b), vec![id]);
    assert!(t.service().project(inferred).is_none());
    assert_eq!(t.service().counts().inferred, 0);
}

#[test]
fn test_recovered_manifest_clears_configuration_error() {
    let fs = import_fixture();
    let mut t = TestSession::new(semantic_config(), fs.clone());
    let a = project_path("a.ts");
    let manifest = project_path("tsconfig.json");
    t.open(&a);
    let id = configured_id(&t);

    fs.add_file(manifest.as_str(), "[").unwrap();
    t.service_mut()
        .on_file_event(&FileEvent::modified(manifest.clone()))
        .unwrap();
    t.files(id);
    assert!(t.service().project(id).unwrap().configuration_error().is_some());

    fs.add_file(manifest.as_str(), "{}").unwrap();
    t.service_mut()
        .on_file_event(&FileEvent::modified(manifest))
        .unwrap();
    t.files(id);
    let project = t.service().project(id).unwrap();
    assert!(project.configuration_error().is_none());
    assert_eq!(project.capability(), CapabilityLevel::FullSemantic);

    let info = t.request(CommandKind::ProjectInfo, &a);
    assert!(info.success, "{info:?}");
}

#[test]
fn test_non_source_files_stay_out_of_configured_project() {
    let fs = import_fixture();
    let readme = fs
        .add_file(&format!("{PROJECT_DIR}/README.md"), "# myproject")
        .unwrap();
    let mut t = TestSession::new(semantic_config(), fs.clone());
    let a = project_path("a.ts");
    t.open(&a);
    let id = configured_id(&t);
    assert!(!t.service().project(id).unwrap().has_root(&readme));
    assert!(!t.service().project(id).unwrap().has_root(&project_path("tsconfig.json")));

    t.open(&readme);
    let owners = root_owners(&t, &readme);
    assert_eq!(owners.len(), 1);
    assert_eq!(
        t.service().project(owners[0]).unwrap().kind(),
        ProjectKind::Inferred
    );

    let notes = fs.add_file(&format!("{PROJECT_DIR}/notes.txt"), "x").unwrap();
    t.service_mut()
        .on_file_event(&FileEvent::created(notes.clone()))
        .unwrap();
    assert!(!t.service().project(id).unwrap().has_root(&notes));
}
