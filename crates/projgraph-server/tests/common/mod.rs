//! Common test utilities for integration tests.
//!
//! Fixtures mirror a small project laid out under
//! `/user/username/projects/myproject` on a virtual host.

#![allow(dead_code)] // not every test binary uses every helper

use projgraph_core::{CommandKind, ErrorKind, NormalizedPath};
use projgraph_host::MemoryFileSystem;
use projgraph_server::{
    EchoLanguageService, MemoryLog, ProjectId, ProjectService, Response, ServiceConfig, Session,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) const PROJECT_DIR: &str = "/user/username/projects/myproject";
pub(crate) const LIB_FILE: &str = "/a/lib/lib.d.ts";

pub(crate) const A_TS: &str = r#"import { y, cc } from "./b";
import { something } from "something";
class c { prop = "hello"; foo() { return this.prop; } }"#;

pub(crate) const B_TS: &str = r#"export { cc } from "./c";
import { something } from "something";
                export const y = 10;"#;

pub(crate) const C_TS: &str = "export const cc = 10;";

pub(crate) const SOMETHING_D_TS: &str = "export const something = 10;";

pub(crate) const LIB_D_TS: &str = r#"/// <reference no-default-lib="true"/>
interface Boolean {}
interface Function {}
interface IArguments {}
interface Number { toExponential: any; }
interface Object {}
interface RegExp {}
interface String { charAt: any; }
interface Array<T> { length: number; [n: number]: T; }"#;

/// Absolute path beneath the fixture project.
pub(crate) fn project_path(relative: &str) -> NormalizedPath {
    NormalizedPath::new(&format!("{PROJECT_DIR}/{relative}")).unwrap()
}

pub(crate) fn path(raw: &str) -> NormalizedPath {
    NormalizedPath::new(raw).unwrap()
}

/// Host with the module-import fixture: `a` imports `b`, `b` re-exports
/// from `c`, both import the `something` package.
pub(crate) fn import_fixture() -> Arc<MemoryFileSystem> {
    let fs = MemoryFileSystem::with_files([
        (format!("{PROJECT_DIR}/a.ts").as_str(), A_TS),
        (format!("{PROJECT_DIR}/b.ts").as_str(), B_TS),
        (format!("{PROJECT_DIR}/c.ts").as_str(), C_TS),
        (
            format!("{PROJECT_DIR}/node_modules/something/index.d.ts").as_str(),
            SOMETHING_D_TS,
        ),
        (LIB_FILE, LIB_D_TS),
        (format!("{PROJECT_DIR}/tsconfig.json").as_str(), "{}"),
    ])
    .unwrap();
    Arc::new(fs)
}

/// Host with the reference-directive fixture: `a` references `b`, `b`
/// references `c`, both reference the `something` declaration file.
pub(crate) fn directive_fixture() -> Arc<MemoryFileSystem> {
    let something = format!("{PROJECT_DIR}/node_modules/something/index.d.ts");
    let a = format!(
        "///<reference path=\"b.ts\"/>\n///<reference path=\"{something}\"/>\nfunction fooA() {{ }}"
    );
    let b = format!(
        "///<reference path=\"./c.ts\"/>\n///<reference path=\"{something}\"/>\nfunction fooB() {{ }}"
    );
    let fs = MemoryFileSystem::with_files([
        (format!("{PROJECT_DIR}/a.ts").as_str(), a.as_str()),
        (format!("{PROJECT_DIR}/b.ts").as_str(), b.as_str()),
        (format!("{PROJECT_DIR}/c.ts").as_str(), "function fooC() { }"),
        (something.as_str(), "function something() {}"),
        (LIB_FILE, LIB_D_TS),
        (format!("{PROJECT_DIR}/tsconfig.json").as_str(), "{}"),
    ])
    .unwrap();
    Arc::new(fs)
}

/// Configuration of the syntax-only server used by the fixtures.
pub(crate) fn syntax_only_config() -> ServiceConfig {
    ServiceConfig {
        use_single_inferred_project: true,
        default_library: Some(path(LIB_FILE)),
        ..ServiceConfig::syntax_only()
    }
}

/// Full-semantic configuration with the fixture's default library.
pub(crate) fn semantic_config() -> ServiceConfig {
    ServiceConfig {
        default_library: Some(path(LIB_FILE)),
        ..ServiceConfig::default()
    }
}

pub(crate) struct TestSession {
    pub(crate) session: Session,
    pub(crate) log: Arc<MemoryLog>,
    pub(crate) fs: Arc<MemoryFileSystem>,
}

impl TestSession {
    pub(crate) fn new(config: ServiceConfig, fs: Arc<MemoryFileSystem>) -> Self {
        let log = Arc::new(MemoryLog::new());
        let service = ProjectService::new(config, fs.clone());
        let session =
            Session::new(service, Arc::new(EchoLanguageService)).with_log(log.clone());
        Self { session, log, fs }
    }

    pub(crate) fn service(&self) -> &ProjectService {
        self.session.service()
    }

    pub(crate) fn service_mut(&mut self) -> &mut ProjectService {
        self.session.service_mut()
    }

    /// Opens `file` with its content read from the host.
    pub(crate) fn open(&mut self, file: &NormalizedPath) -> Response {
        let response = self
            .session
            .execute_command(CommandKind::Open, json!({ "file": file }));
        assert!(response.success, "open {file} failed: {response:?}");
        response
    }

    pub(crate) fn close(&mut self, file: &NormalizedPath) -> Response {
        let response = self
            .session
            .execute_command(CommandKind::Close, json!({ "file": file }));
        assert!(response.success, "close {file} failed: {response:?}");
        response
    }

    /// Issues a location request at the `index`-th occurrence of `needle`
    /// in `file`.
    pub(crate) fn request_at(
        &mut self,
        command: CommandKind,
        file: &NormalizedPath,
        needle: &str,
        index: usize,
    ) -> Response {
        let text = self
            .service()
            .document(file)
            .map(|d| d.content().to_string())
            .unwrap_or_default();
        let (line, offset) = location_of(&text, needle, index);
        self.session.execute_command(
            command,
            json!({ "file": file, "line": line, "offset": offset }),
        )
    }

    pub(crate) fn request(&mut self, command: CommandKind, file: &NormalizedPath) -> Response {
        self.session
            .execute_command(command, json!({ "file": file }))
    }

    /// Derived file set of `id`, rebuilt if dirty.
    pub(crate) fn files(&mut self, id: ProjectId) -> Vec<NormalizedPath> {
        self.service_mut().get_project_files(id).unwrap()
    }

    pub(crate) fn only_inferred(&self) -> ProjectId {
        let inferred = self.service().inferred_projects();
        assert_eq!(inferred.len(), 1, "expected one inferred project");
        inferred[0]
    }
}

/// One-based line and offset of the `index`-th occurrence of `needle`.
pub(crate) fn location_of(text: &str, needle: &str, index: usize) -> (u32, u32) {
    let byte = text
        .match_indices(needle)
        .nth(index)
        .map(|(i, _)| i)
        .unwrap_or_else(|| panic!("'{needle}' occurrence {index} not found"));
    let before = &text[..byte];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let offset = text[line_start..byte].chars().count() + 1;
    (line as u32, offset as u32)
}

pub(crate) fn assert_rejected(response: &Response) {
    assert!(!response.success, "expected rejection: {response:?}");
    assert_eq!(
        response.error_kind(),
        Some(ErrorKind::UnsupportedInCapabilityMode),
        "{response:?}"
    );
}
