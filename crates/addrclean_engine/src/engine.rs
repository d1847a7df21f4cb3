use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use addrclean_logging::{client_debug, client_info, client_warn};

use crate::api::{ClientSettings, JobApi, ReqwestJobApi};
use crate::poll::PollTimer;
use crate::{ApiError, EngineEvent, JobAction, Ticket};

enum EngineCommand {
    Upload {
        ticket: Ticket,
        path: PathBuf,
    },
    Job {
        ticket: Ticket,
        job_id: String,
        action: JobAction,
    },
    Download {
        ticket: Ticket,
        job_id: String,
        dest_dir: PathBuf,
    },
    StartPolling {
        interval: Duration,
    },
    StopPolling,
    Shutdown,
}

/// Owns the background IO thread. Requests run concurrently on its tokio
/// runtime; results come back on the event receiver handed out at spawn.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    worker: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    pub fn spawn(settings: ClientSettings) -> io::Result<(Self, mpsc::Receiver<EngineEvent>)> {
        let api = ReqwestJobApi::new(settings).map_err(io::Error::other)?;
        Self::with_api(Arc::new(api))
    }

    pub fn with_api(api: Arc<dyn JobApi>) -> io::Result<(Self, mpsc::Receiver<EngineEvent>)> {
        let runtime = tokio::runtime::Runtime::new()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("addrclean-engine".to_string())
            .spawn(move || {
                let mut timer = PollTimer::new();
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        EngineCommand::StartPolling { interval } => {
                            let tx = event_tx.clone();
                            let started = timer.start(runtime.handle(), interval, move || {
                                tx.send(EngineEvent::PollTick).is_ok()
                            });
                            client_debug!("Poll timer start requested, started={}", started);
                        }
                        EngineCommand::StopPolling => {
                            let stopped = timer.stop();
                            client_debug!("Poll timer stop requested, stopped={}", stopped);
                        }
                        EngineCommand::Shutdown => break,
                        request => {
                            let api = api.clone();
                            let event_tx = event_tx.clone();
                            runtime.spawn(async move {
                                handle_request(api.as_ref(), request, event_tx).await;
                            });
                        }
                    }
                }
                timer.stop();
                runtime.shutdown_timeout(Duration::from_secs(2));
                client_info!("Engine thread stopped");
            })?;

        Ok((
            Self {
                cmd_tx,
                worker: Some(worker),
            },
            event_rx,
        ))
    }

    pub fn upload(&self, ticket: Ticket, path: impl Into<PathBuf>) {
        self.send(EngineCommand::Upload {
            ticket,
            path: path.into(),
        });
    }

    pub fn job_action(&self, ticket: Ticket, job_id: impl Into<String>, action: JobAction) {
        self.send(EngineCommand::Job {
            ticket,
            job_id: job_id.into(),
            action,
        });
    }

    pub fn download(&self, ticket: Ticket, job_id: impl Into<String>, dest_dir: impl Into<PathBuf>) {
        self.send(EngineCommand::Download {
            ticket,
            job_id: job_id.into(),
            dest_dir: dest_dir.into(),
        });
    }

    pub fn start_polling(&self, interval: Duration) {
        self.send(EngineCommand::StartPolling { interval });
    }

    pub fn stop_polling(&self) {
        self.send(EngineCommand::StopPolling);
    }

    /// Stops the timer, abandons in-flight requests and joins the thread.
    pub fn shutdown(mut self) {
        self.stop_worker();
    }

    fn send(&self, command: EngineCommand) {
        if self.cmd_tx.send(command).is_err() {
            client_warn!("Engine thread is gone; command dropped");
        }
    }

    fn stop_worker(&mut self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

async fn handle_request(
    api: &dyn JobApi,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let event = match command {
        EngineCommand::Upload { ticket, path } => {
            client_debug!("ticket={} upload {:?}", ticket, path);
            let result = api.upload(&path).await;
            log_failure(ticket, "upload", &result);
            EngineEvent::JobResponse { ticket, result }
        }
        EngineCommand::Job {
            ticket,
            job_id,
            action,
        } => {
            client_debug!("ticket={} {} job_id={}", ticket, action.endpoint(), job_id);
            let result = api.job_action(&job_id, action).await;
            log_failure(ticket, action.endpoint(), &result);
            EngineEvent::JobResponse { ticket, result }
        }
        EngineCommand::Download {
            ticket,
            job_id,
            dest_dir,
        } => {
            client_debug!("ticket={} download job_id={}", ticket, job_id);
            let result = api.download(&job_id, &dest_dir).await;
            log_failure(ticket, "download", &result);
            EngineEvent::DownloadFinished { ticket, result }
        }
        EngineCommand::StartPolling { .. } | EngineCommand::StopPolling | EngineCommand::Shutdown => {
            return;
        }
    };
    let _ = event_tx.send(event);
}

fn log_failure<T>(ticket: Ticket, what: &str, result: &Result<T, ApiError>) {
    if let Err(err) = result {
        client_warn!("ticket={} {} failed: {}", ticket, what, err);
    }
}
