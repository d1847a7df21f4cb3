use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;

use addrclean_core::{update, ControllerState, Effect, Msg};
use addrclean_engine::EngineHandle;
use addrclean_logging::{client_debug, client_error, client_info};
use anyhow::Context;

use super::effects::{EffectRunner, RunnerSettings};
use super::persistence;
use super::ui;
use crate::config::{parse_args, ClientConfig, ARGS_USAGE};

/// Everything the main loop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AppEvent {
    Controller(Msg),
    Help,
    Quit,
    Unknown(String),
}

pub fn run_app() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        println!("{ARGS_USAGE}");
        return Ok(());
    }

    let mut config = ClientConfig::load(&args.config_path)?;
    if let Some(server_url) = args.server_url.clone() {
        config.server_url = server_url;
    }
    addrclean_logging::initialize(config.log_destination(), config.level_filter());
    client_info!("addrclean starting, server {}", config.server_url);

    let (engine, engine_events) = EngineHandle::spawn(config.client_settings())
        .context("failed to start the network engine")?;

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>();
    let mut runner = EffectRunner::new(
        engine,
        engine_events,
        event_tx.clone(),
        RunnerSettings {
            poll_interval: config.poll_interval(),
            download_dir: config.download_dir.clone(),
            session_file: config.session_file.clone(),
        },
    );
    spawn_stdin_reader(event_tx);

    let mut controller = Controller::new(io::stdout());
    controller.print_lines(&[ui::render::USAGE.to_string()]);
    controller.render_now();

    let initial_job = args
        .job_id
        .or_else(|| persistence::load_last_job_id(&config.session_file));
    if let Some(job_id) = initial_job {
        client_info!("Resuming job {}", job_id);
        for effect in controller.dispatch(Msg::Resume(job_id)) {
            runner.run(effect);
        }
    }

    while let Ok(event) = event_rx.recv() {
        match event {
            AppEvent::Controller(msg) => {
                for effect in controller.dispatch(msg) {
                    runner.run(effect);
                }
            }
            AppEvent::Help => controller.print_lines(&[ui::render::USAGE.to_string()]),
            AppEvent::Unknown(word) => controller.print_lines(&[format!(
                "unknown command {word:?}, type help for the list"
            )]),
            AppEvent::Quit => {
                for effect in controller.dispatch(Msg::Shutdown) {
                    runner.run(effect);
                }
                break;
            }
        }
    }

    runner.shutdown();
    client_info!("addrclean stopped");
    Ok(())
}

fn spawn_stdin_reader(tx: mpsc::Sender<AppEvent>) {
    // Detached: a blocked read must not hold up exit.
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    client_error!("stdin read failed: {}", err);
                    break;
                }
            };
            for event in ui::commands::parse_line(&line) {
                if tx.send(event).is_err() {
                    return;
                }
            }
        }
        let _ = tx.send(AppEvent::Quit);
    });
}

/// Holds the controller state and renders it to `out`. Alerts are written
/// here; every other effect is handed back to the caller.
struct Controller<W: Write> {
    state: ControllerState,
    out: W,
}

impl<W: Write> Controller<W> {
    fn new(out: W) -> Self {
        Self {
            state: ControllerState::new(),
            out,
        }
    }

    fn dispatch(&mut self, msg: Msg) -> Vec<Effect> {
        match &msg {
            Msg::RemoteCompleted { tag, call, .. } if !self.state.accepts(tag) => {
                client_debug!("Discarding stale {:?} response for {:?}", call, tag.job_id);
            }
            Msg::DownloadFinished { tag, .. } if !self.state.accepts(tag) => {
                client_debug!("Discarding stale download for {:?}", tag.job_id);
            }
            _ => {}
        }

        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let dirty = state.consume_dirty();
        self.state = state;

        if dirty {
            self.render_now();
        }

        let mut pending = Vec::with_capacity(effects.len());
        for effect in effects {
            match effect {
                Effect::Alert(alert) => {
                    client_info!("Alert: {}", alert.message);
                    let stamp = chrono::Local::now().format("%H:%M:%S");
                    let line = format!("[{stamp}] {}", ui::render::format_alert(&alert));
                    self.print_lines(&[line]);
                }
                other => pending.push(other),
            }
        }
        pending
    }

    fn render_now(&mut self) {
        let lines = ui::render::render(&self.state.view());
        self.print_lines(&lines);
    }

    fn print_lines(&mut self, lines: &[String]) {
        for line in lines {
            if let Err(err) = writeln!(self.out, "{line}") {
                client_error!("terminal write failed: {}", err);
                return;
            }
        }
        let _ = writeln!(self.out);
        let _ = self.out.flush();
    }
}
