//! Command session.
//!
//! Receives structured requests, resolves the target project, brings it up
//! to date, applies capability gating and dispatches to the language
//! service. Every request produces a [`Response`]; failures are data, never
//! panics.

use crate::document::TextChange;
use crate::log::{LogEntry, Outcome, SessionLog, TracingLog};
use crate::project::ProjectId;
use crate::service::ProjectService;
use projgraph_core::{
    CommandKind, ErrorKind, GatedLanguageService, LanguageRequest, LanguageService, Location,
    NormalizedPath, ProjectError, RequestClass, Result, ensure_supported,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// Incoming request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub seq: u64,
    pub command: String,
    #[serde(default)]
    pub arguments: Value,
}

impl Request {
    pub fn new(seq: u64, command: CommandKind, arguments: Value) -> Self {
        Self {
            seq,
            command: command.as_str().to_string(),
            arguments,
        }
    }
}

/// Structured error carried by a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Outgoing response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub seq: u64,
    pub request_seq: u64,
    pub command: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenArgs {
    file: NormalizedPath,
    #[serde(default)]
    file_content: Option<String>,
}

#[derive(Deserialize)]
struct FileArgs {
    file: NormalizedPath,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeArgs {
    file: NormalizedPath,
    line: u32,
    offset: u32,
    end_line: u32,
    end_offset: u32,
    #[serde(default)]
    insert_string: String,
    #[serde(default)]
    version: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationArgs {
    file: NormalizedPath,
    line: Option<u32>,
    offset: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectInfoArgs {
    file: NormalizedPath,
    #[serde(default)]
    need_file_name_list: bool,
}

fn parse_args<T: DeserializeOwned>(command: CommandKind, arguments: &Value) -> Result<T> {
    T::deserialize(arguments)
        .map_err(|e| ProjectError::InvalidRequest(format!("bad arguments for '{command}': {e}")))
}

/// What a handled request produced.
struct Handled {
    body: Option<Value>,
    project: Option<String>,
}

impl Handled {
    fn empty() -> Self {
        Self {
            body: None,
            project: None,
        }
    }
}

pub struct Session {
    service: ProjectService,
    language: Arc<dyn LanguageService>,
    log: Arc<dyn SessionLog>,
    seq: u64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("service", &self.service)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(service: ProjectService, language: Arc<dyn LanguageService>) -> Self {
        Self {
            service,
            language,
            log: Arc::new(TracingLog),
            seq: 0,
        }
    }

    #[must_use]
    pub fn with_log(mut self, log: Arc<dyn SessionLog>) -> Self {
        self.log = log;
        self
    }

    pub fn service(&self) -> &ProjectService {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut ProjectService {
        &mut self.service
    }

    /// Language service handle for one project, gated by its capability.
    pub fn language_service_for(&self, id: ProjectId) -> Result<GatedLanguageService> {
        let project = self
            .service
            .project(id)
            .ok_or_else(|| ProjectError::UnknownProject(id.to_string()))?;
        Ok(GatedLanguageService::new(
            Arc::clone(&self.language),
            project.capability(),
            project.name().to_string(),
        ))
    }

    /// Executes one request. Never panics on bad input.
    pub fn execute(&mut self, request: &Request) -> Response {
        self.seq += 1;
        let seq = self.seq;
        let result = self.dispatch(request);

        let outcome = match &result {
            Ok(handled) => Outcome::Success {
                project: handled.project.clone(),
            },
            Err(e) => Outcome::from_error(e),
        };
        self.log.record(LogEntry {
            seq: request.seq,
            command: request.command.clone(),
            outcome,
        });

        match result {
            Ok(handled) => Response {
                seq,
                request_seq: request.seq,
                command: request.command.clone(),
                success: true,
                body: handled.body,
                error: None,
            },
            Err(e) => Response {
                seq,
                request_seq: request.seq,
                command: request.command.clone(),
                success: false,
                body: None,
                error: Some(ResponseError {
                    kind: e.kind(),
                    message: e.to_string(),
                }),
            },
        }
    }

    /// Builds and executes a request with the next sequence number.
    pub fn execute_command(&mut self, command: CommandKind, arguments: Value) -> Response {
        let request = Request::new(self.seq + 1, command, arguments);
        self.execute(&request)
    }

    fn dispatch(&mut self, request: &Request) -> Result<Handled> {
        let command: CommandKind = serde_json::from_value(Value::String(request.command.clone()))
            .map_err(|_| {
                ProjectError::InvalidRequest(format!("unknown command '{}'", request.command))
            })?;

        match command.class() {
            RequestClass::Lifecycle => self.lifecycle(command, &request.arguments),
            RequestClass::Syntactic | RequestClass::Semantic => {
                self.language_request(command, &request.arguments)
            }
        }
    }

    fn lifecycle(&mut self, command: CommandKind, arguments: &Value) -> Result<Handled> {
        match command {
            CommandKind::Open => {
                let args: OpenArgs = parse_args(command, arguments)?;
                let content = match args.file_content {
                    Some(content) => content,
                    None => self.service.file_system().read_file(&args.file)?,
                };
                let id = self.service.open_document(args.file, content)?;
                self.service.ensure_up_to_date(id)?;
                Ok(Handled::empty())
            }
            CommandKind::Close => {
                let args: FileArgs = parse_args(command, arguments)?;
                self.service.close_document(&args.file)?;
                Ok(Handled::empty())
            }
            CommandKind::Change => {
                let args: ChangeArgs = parse_args(command, arguments)?;
                let current = self
                    .service
                    .document(&args.file)
                    .map(|d| d.version())
                    .ok_or_else(|| ProjectError::UnknownDocument(args.file.to_string()))?;
                let change = TextChange::range(
                    Location {
                        line: args.line,
                        offset: args.offset,
                    },
                    Location {
                        line: args.end_line,
                        offset: args.end_offset,
                    },
                    args.insert_string,
                );
                let version = match args.version {
                    Some(version) => version,
                    None => current.checked_add(1).ok_or_else(|| {
                        ProjectError::VersionOrderingViolation {
                            path: args.file.to_string(),
                            current,
                            attempted: current,
                        }
                    })?,
                };
                self.service.edit_document(&args.file, &change, version)?;
                Ok(Handled::empty())
            }
            CommandKind::ProjectInfo => {
                let args: ProjectInfoArgs = parse_args(command, arguments)?;
                let id = self
                    .service
                    .default_project_for(&args.file)
                    .ok_or_else(|| ProjectError::NoProject(args.file.to_string()))?;
                let files = self.service.get_project_files(id)?;
                let project = self
                    .service
                    .project(id)
                    .ok_or_else(|| ProjectError::UnknownProject(id.to_string()))?;

                let config_file_name = project
                    .manifest_path()
                    .map_or_else(|| project.name().to_string(), ToString::to_string);
                let mut body = json!({
                    "configFileName": config_file_name,
                    "projectKind": project.kind(),
                    "capability": project.capability(),
                    "languageServiceDisabled": !project.capability().is_semantic(),
                });
                if args.need_file_name_list {
                    body["fileNames"] = json!(files);
                }
                Ok(Handled {
                    body: Some(body),
                    project: Some(project.name().to_string()),
                })
            }
            other => Err(ProjectError::InvalidRequest(format!(
                "'{other}' is not a lifecycle command"
            ))),
        }
    }

    fn language_request(&mut self, command: CommandKind, arguments: &Value) -> Result<Handled> {
        let args: LocationArgs = parse_args(command, arguments)?;

        let mut targets = self.service.projects_for(&args.file);
        if targets.is_empty() {
            targets.push(self.service.ensure_project_for(&args.file)?);
        }
        for id in &targets {
            self.service.ensure_up_to_date(*id)?;
        }
        let Some(&target) = targets.first() else {
            return Err(ProjectError::NoProject(args.file.to_string()));
        };

        let project = self
            .service
            .project(target)
            .ok_or_else(|| ProjectError::UnknownProject(target.to_string()))?;
        ensure_supported(command, project.capability(), project.name())?;

        let location = match (args.line, args.offset) {
            (Some(line), Some(offset)) => Some(Location { line, offset }),
            _ => None,
        };
        let request = LanguageRequest {
            command,
            file: args.file,
            location,
        };
        let language = self.language_service_for(target)?;
        let program = self.service.program(target)?;
        let body = language.execute(&program, &request)?;
        Ok(Handled {
            body: Some(body),
            project: Some(program.project.to_string()),
        })
    }
}
