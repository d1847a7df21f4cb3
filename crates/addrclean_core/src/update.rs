use crate::{
    Alert, AlertKind, ControllerState, Effect, JobState, Msg, RemoteCall, RequestTag,
    MSG_COMPLETED, MSG_SELECT_FILE, MSG_UPLOADING, MSG_UPLOAD_FIRST,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: ControllerState, msg: Msg) -> (ControllerState, Vec<Effect>) {
    if state.is_shut_down() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::FileSelected(path) => {
            state.set_selected_file(path);
            Vec::new()
        }
        Msg::UploadClicked => {
            if state.upload_in_flight() {
                return (state, Vec::new());
            }
            let Some(path) = state.selected_file().cloned() else {
                return (state, vec![validation_alert(MSG_SELECT_FILE)]);
            };
            state.set_upload_in_flight(true);
            state.set_status(MSG_UPLOADING);
            vec![Effect::Upload {
                tag: state.request_tag(),
                path,
            }]
        }
        Msg::StartClicked => {
            let allowed = state.start_allowed();
            gated_job_call(&state, RemoteCall::Start, allowed)
        }
        Msg::StopClicked => {
            let allowed = state.stop_allowed();
            gated_job_call(&state, RemoteCall::Stop, allowed)
        }
        Msg::RefreshRequested | Msg::PollTick => {
            job_call(&state, RemoteCall::Status).unwrap_or_default()
        }
        Msg::DownloadClicked => match state.job_id() {
            Some(job_id) if state.download_allowed() => vec![Effect::Download {
                tag: state.request_tag(),
                job_id: job_id.to_string(),
            }],
            _ => Vec::new(),
        },
        Msg::Resume(job_id) => {
            if job_id.is_empty() || state.job_id() == Some(job_id.as_str()) {
                return (state, Vec::new());
            }
            state.switch_job(job_id.clone());
            let mut effects = vec![Effect::PersistJobId(job_id.clone())];
            if state.ensure_polling() {
                effects.push(Effect::StartPolling);
            }
            effects.push(Effect::Call {
                tag: state.request_tag(),
                job_id,
                call: RemoteCall::Status,
            });
            effects
        }
        Msg::RemoteCompleted { tag, call, result } => {
            apply_remote_result(&mut state, tag, call, result)
        }
        Msg::DownloadFinished { tag, result } => {
            if !state.accepts(&tag) {
                return (state, Vec::new());
            }
            match result {
                Ok(path) => {
                    state.set_status(format!("Saved {}", path.display()));
                    Vec::new()
                }
                Err(message) => remote_failure(&mut state, message),
            }
        }
        Msg::Shutdown => {
            let stop = state.cease_polling();
            state.shut_down();
            if stop {
                vec![Effect::StopPolling]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}

fn apply_remote_result(
    state: &mut ControllerState,
    tag: RequestTag,
    call: RemoteCall,
    result: Result<JobState, String>,
) -> Vec<Effect> {
    if call == RemoteCall::Upload {
        // The upload control comes back regardless of how the request ended.
        state.set_upload_in_flight(false);
    }
    if !state.accepts(&tag) {
        return Vec::new();
    }

    match (call, result) {
        (RemoteCall::Upload, Ok(job)) => {
            let job_id = job.job_id.clone();
            state.switch_job(job_id.clone());
            let mut effects = vec![Effect::PersistJobId(job_id)];
            effects.extend(apply_job_state(state, job));
            if state.ensure_polling() {
                effects.push(Effect::StartPolling);
            }
            effects
        }
        (RemoteCall::Start | RemoteCall::Stop, Ok(job)) => {
            let mut effects = apply_job_state(state, job);
            if state.ensure_polling() {
                effects.push(Effect::StartPolling);
            }
            effects
        }
        (RemoteCall::Status, Ok(job)) => apply_job_state(state, job),
        (RemoteCall::Status, Err(message)) => {
            // Background failures stay inline; no blocking alert.
            state.set_status(message);
            Vec::new()
        }
        (RemoteCall::Upload | RemoteCall::Start | RemoteCall::Stop, Err(message)) => {
            remote_failure(state, message)
        }
    }
}

fn apply_job_state(state: &mut ControllerState, job: JobState) -> Vec<Effect> {
    if state.apply_job_state(job) {
        vec![Effect::Alert(Alert::new(AlertKind::Completed, MSG_COMPLETED))]
    } else {
        Vec::new()
    }
}

fn job_call(state: &ControllerState, call: RemoteCall) -> Option<Vec<Effect>> {
    let job_id = state.job_id()?;
    Some(vec![Effect::Call {
        tag: state.request_tag(),
        job_id: job_id.to_string(),
        call,
    }])
}

/// A disabled control does nothing; a missing job is a validation error.
fn gated_job_call(state: &ControllerState, call: RemoteCall, allowed: bool) -> Vec<Effect> {
    match job_call(state, call) {
        None => vec![validation_alert(MSG_UPLOAD_FIRST)],
        Some(_) if !allowed => Vec::new(),
        Some(effects) => effects,
    }
}

fn remote_failure(state: &mut ControllerState, message: String) -> Vec<Effect> {
    state.set_status(message.clone());
    vec![Effect::Alert(Alert::new(AlertKind::Remote, message))]
}

fn validation_alert(message: &str) -> Effect {
    Effect::Alert(Alert::new(AlertKind::Validation, message))
}
