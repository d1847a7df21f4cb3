use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use addrclean_core::{Effect, JobState, Msg, RemoteCall, RequestTag};
use addrclean_engine::{EngineEvent, EngineHandle, JobAction, JobSnapshot, Ticket};
use addrclean_logging::{client_debug, client_info, client_warn};

use super::app::AppEvent;
use super::persistence;

#[derive(Debug, Clone)]
enum PendingKind {
    Call(RemoteCall),
    Download,
}

#[derive(Debug, Clone)]
struct PendingRequest {
    tag: RequestTag,
    kind: PendingKind,
}

type PendingMap = Arc<Mutex<HashMap<Ticket, PendingRequest>>>;

#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub poll_interval: Duration,
    pub download_dir: PathBuf,
    pub session_file: PathBuf,
}

/// Executes controller effects on the engine and feeds engine events back
/// as controller messages. Alerts are not effects it handles; the caller
/// presents those.
pub struct EffectRunner {
    engine: EngineHandle,
    settings: RunnerSettings,
    pending: PendingMap,
    next_ticket: Ticket,
    forwarder: Option<thread::JoinHandle<()>>,
}

impl EffectRunner {
    pub fn new(
        engine: EngineHandle,
        events: mpsc::Receiver<EngineEvent>,
        msg_tx: mpsc::Sender<AppEvent>,
        settings: RunnerSettings,
    ) -> Self {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let forwarder = spawn_event_loop(events, pending.clone(), msg_tx);
        Self {
            engine,
            settings,
            pending,
            next_ticket: 1,
            forwarder: Some(forwarder),
        }
    }

    pub fn run(&mut self, effect: Effect) {
        match effect {
            Effect::Upload { tag, path } => {
                let ticket = self.register(tag, PendingKind::Call(RemoteCall::Upload));
                client_info!("Upload ticket={} path={:?}", ticket, path);
                self.engine.upload(ticket, path);
            }
            Effect::Call { tag, job_id, call } => {
                let action = match call {
                    RemoteCall::Start => JobAction::Start,
                    RemoteCall::Stop => JobAction::Stop,
                    RemoteCall::Status => JobAction::Status,
                    RemoteCall::Upload => {
                        client_warn!("Upload routed as a job call; ignored");
                        return;
                    }
                };
                let ticket = self.register(tag, PendingKind::Call(call));
                if call != RemoteCall::Status {
                    client_info!("{:?} ticket={} job_id={}", call, ticket, job_id);
                }
                self.engine.job_action(ticket, job_id, action);
            }
            Effect::Download { tag, job_id } => {
                let ticket = self.register(tag, PendingKind::Download);
                client_info!("Download ticket={} job_id={}", ticket, job_id);
                self.engine
                    .download(ticket, job_id, self.settings.download_dir.clone());
            }
            Effect::StartPolling => {
                client_info!("Polling every {:?}", self.settings.poll_interval);
                self.engine.start_polling(self.settings.poll_interval);
            }
            Effect::StopPolling => {
                client_info!("Polling stopped");
                self.engine.stop_polling();
            }
            Effect::PersistJobId(job_id) => {
                persistence::save_last_job_id(&self.settings.session_file, &job_id);
            }
            Effect::Alert(alert) => {
                client_debug!("Alert reached the effect runner: {:?}", alert);
            }
        }
    }

    /// Stops the engine and waits for the event loop to drain.
    pub fn shutdown(mut self) {
        self.engine.shutdown();
        if let Some(forwarder) = self.forwarder.take() {
            let _ = forwarder.join();
        }
    }

    fn register(&mut self, tag: RequestTag, kind: PendingKind) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        client_debug!(
            "ticket={} {:?} job_id={:?} epoch={}",
            ticket,
            kind,
            tag.job_id,
            tag.epoch
        );
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ticket, PendingRequest { tag, kind });
        ticket
    }
}

fn spawn_event_loop(
    events: mpsc::Receiver<EngineEvent>,
    pending: PendingMap,
    msg_tx: mpsc::Sender<AppEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for event in events.iter() {
            let Some(msg) = event_to_msg(event, &pending) else {
                continue;
            };
            if msg_tx.send(AppEvent::Controller(msg)).is_err() {
                break;
            }
        }
    })
}

fn event_to_msg(event: EngineEvent, pending: &PendingMap) -> Option<Msg> {
    let take = |ticket: Ticket| {
        let request = pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&ticket);
        if request.is_none() {
            client_warn!("Response for unknown ticket {}", ticket);
        }
        request
    };

    match event {
        EngineEvent::PollTick => Some(Msg::PollTick),
        EngineEvent::JobResponse { ticket, result } => {
            let request = take(ticket)?;
            let PendingKind::Call(call) = request.kind else {
                client_warn!("Ticket {} expected a download", ticket);
                return None;
            };
            Some(Msg::RemoteCompleted {
                tag: request.tag,
                call,
                result: result
                    .map(|response| map_job(response.job))
                    .map_err(|err| err.user_message()),
            })
        }
        EngineEvent::DownloadFinished { ticket, result } => {
            let request = take(ticket)?;
            Some(Msg::DownloadFinished {
                tag: request.tag,
                result: result
                    .map(|file| file.path)
                    .map_err(|err| err.user_message()),
            })
        }
    }
}

fn map_job(job: JobSnapshot) -> JobState {
    JobState {
        job_id: job.job_id,
        percent: job.percent,
        done: job.done,
        total: job.total,
        message: job.message,
        source_name: job.source_name,
        running: job.running,
        can_start: job.can_start,
        can_download: job.can_download,
        completed: job.completed,
        stopped: job.stopped,
        error: job.error,
    }
}
