use projgraph_core::{LanguageRequest, LanguageService, ProgramView, ProjectError, Result};
use serde_json::json;

/// Stand-in language service that reports what it was given.
///
/// Parsing and checking live outside this crate. This implementation lets
/// the binary and the tests observe exactly which program a request was
/// dispatched against.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoLanguageService;

impl LanguageService for EchoLanguageService {
    fn execute(&self, program: &ProgramView<'_>, request: &LanguageRequest) -> Result<serde_json::Value> {
        if !program.contains(&request.file) {
            return Err(ProjectError::LanguageService(format!(
                "{} is not part of project {}",
                request.file, program.project
            )));
        }
        let text_length = program
            .source_text(&request.file)
            .map_or(0, |text| text.chars().count());

        Ok(json!({
            "command": request.command,
            "file": request.file,
            "location": request.location,
            "project": program.project,
            "capability": program.capability,
            "files": program.files,
            "textLength": text_length,
        }))
    }
}
