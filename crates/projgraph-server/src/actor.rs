//! Single-writer task owning the session.
//!
//! Every event and request is sent over a bounded channel and processed to
//! completion before the next one is received, so callers on any number of
//! tasks observe one serialized history.

use crate::document::TextChange;
use crate::project::{ProjectId, ProjectSummary};
use crate::session::{Request, Response, Session};
use projgraph_core::{FileEvent, NormalizedPath, ProjectError, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const COMMAND_CHANNEL_CAPACITY: usize = 64;

enum Command {
    Execute {
        request: Request,
        reply: oneshot::Sender<Response>,
    },
    Open {
        path: NormalizedPath,
        content: String,
        reply: oneshot::Sender<Result<ProjectId>>,
    },
    Close {
        path: NormalizedPath,
        reply: oneshot::Sender<Result<()>>,
    },
    Edit {
        path: NormalizedPath,
        change: TextChange,
        version: u32,
        reply: oneshot::Sender<Result<()>>,
    },
    FileEvent {
        event: FileEvent,
        reply: oneshot::Sender<Result<()>>,
    },
    ListProjects {
        reply: oneshot::Sender<Vec<ProjectSummary>>,
    },
    ProjectFiles {
        id: ProjectId,
        reply: oneshot::Sender<Result<Vec<NormalizedPath>>>,
    },
    Shutdown {
        reply: oneshot::Sender<Session>,
    },
}

/// Cloneable handle to a session running on its own task.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Command>,
}

impl ServiceHandle {
    /// Moves `session` onto a new task. Must be called inside a runtime.
    pub fn spawn(session: Session) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let task = tokio::spawn(run(session, rx));
        (Self { tx }, task)
    }

    pub async fn execute(&self, request: Request) -> Result<Response> {
        self.call(|reply| Command::Execute { request, reply }).await
    }

    pub async fn open_document(&self, path: NormalizedPath, content: String) -> Result<ProjectId> {
        self.call(|reply| Command::Open {
            path,
            content,
            reply,
        })
        .await?
    }

    pub async fn close_document(&self, path: NormalizedPath) -> Result<()> {
        self.call(|reply| Command::Close { path, reply }).await?
    }

    pub async fn edit_document(
        &self,
        path: NormalizedPath,
        change: TextChange,
        version: u32,
    ) -> Result<()> {
        self.call(|reply| Command::Edit {
            path,
            change,
            version,
            reply,
        })
        .await?
    }

    pub async fn file_event(&self, event: FileEvent) -> Result<()> {
        self.call(|reply| Command::FileEvent { event, reply }).await?
    }

    pub async fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        self.call(|reply| Command::ListProjects { reply }).await
    }

    pub async fn project_files(&self, id: ProjectId) -> Result<Vec<NormalizedPath>> {
        self.call(|reply| Command::ProjectFiles { id, reply }).await?
    }

    /// Stops the task and hands the session back.
    pub async fn shutdown(&self) -> Result<Session> {
        self.call(|reply| Command::Shutdown { reply }).await
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ProjectError::ServiceStopped)?;
        rx.await.map_err(|_| ProjectError::ServiceStopped)
    }
}

async fn run(mut session: Session, mut rx: mpsc::Receiver<Command>) {
    tracing::debug!("project service task started");
    while let Some(command) = rx.recv().await {
        // A dropped receiver only means the caller stopped waiting.
        match command {
            Command::Execute { request, reply } => {
                let _ = reply.send(session.execute(&request));
            }
            Command::Open {
                path,
                content,
                reply,
            } => {
                let _ = reply.send(session.service_mut().open_document(path, content));
            }
            Command::Close { path, reply } => {
                let _ = reply.send(session.service_mut().close_document(&path));
            }
            Command::Edit {
                path,
                change,
                version,
                reply,
            } => {
                let _ = reply.send(session.service_mut().edit_document(&path, &change, version));
            }
            Command::FileEvent { event, reply } => {
                let _ = reply.send(session.service_mut().on_file_event(&event));
            }
            Command::ListProjects { reply } => {
                let _ = reply.send(session.service().list_projects());
            }
            Command::ProjectFiles { id, reply } => {
                let _ = reply.send(session.service_mut().get_project_files(id));
            }
            Command::Shutdown { reply } => {
                tracing::debug!("project service task stopping");
                let _ = reply.send(session);
                return;
            }
        }
    }
    tracing::debug!("all handles dropped, project service task exiting");
}
