use projgraph_core::FileEvent;
use projgraph_host::DiskFileSystem;
use projgraph_server::{
    EchoLanguageService, ProjectService, Request, ServiceConfig, ServiceHandle, Session,
};
use serde::Deserialize;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Recorded sequence of events and requests to replay.
#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    config: ServiceConfig,
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Step {
    Request(Request),
    FileEvent(FileEvent),
}

fn load(path: &str) -> projgraph_core::Result<Scenario> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: projgraph <scenario.json>");
        return ExitCode::from(2);
    };
    let scenario = match load(&path) {
        Ok(scenario) => scenario,
        Err(e) => {
            tracing::error!("cannot load scenario {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    let service = ProjectService::new(scenario.config, Arc::new(DiskFileSystem::new()));
    let session = Session::new(service, Arc::new(EchoLanguageService));
    let (handle, task) = ServiceHandle::spawn(session);

    for step in scenario.steps {
        let line = match step {
            Step::Request(request) => handle
                .execute(request)
                .await
                .and_then(|response| Ok(serde_json::to_string(&response)?)),
            Step::FileEvent(event) => match handle.file_event(event.clone()).await {
                Ok(()) => Ok(serde_json::json!({ "event": event, "success": true }).to_string()),
                Err(e) => Ok(serde_json::json!({
                    "event": event,
                    "success": false,
                    "error": { "kind": e.kind(), "message": e.to_string() },
                })
                .to_string()),
            },
        };
        match line {
            Ok(line) => println!("{line}"),
            Err(e) => {
                tracing::error!("replay aborted: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    match handle.list_projects().await {
        Ok(projects) => tracing::info!("replay finished with {} project(s)", projects.len()),
        Err(e) => tracing::warn!("cannot list projects: {}", e),
    }
    drop(handle);
    if let Err(e) = task.await {
        tracing::error!("service task failed: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
