use addrclean_core::{Alert, ControllerViewModel};

const BAR_WIDTH: u32 = 20;

pub const USAGE: &str = "\
commands:
  select <path>    choose the xlsx file to upload (no path clears it)
  upload [path]    upload the selected file, or select <path> first
  start            start cleaning the uploaded job
  stop             stop the running job
  status           refresh the job status now
  download         save the cleaned output to the download directory
  help             show this text
  quit             stop polling and exit";

pub fn render(view: &ControllerViewModel) -> Vec<String> {
    let mut lines = Vec::with_capacity(5);

    lines.push(format!(
        "{} {}",
        progress_bar(view.progress_value),
        view.progress_text
    ));

    if !view.status_text.is_empty() {
        lines.push(format!("Status: {}", view.status_text));
    }

    let selected = view
        .selected_file
        .as_ref()
        .map(|path| path.display().to_string());
    match (&view.file_name, selected) {
        (Some(name), _) => lines.push(format!("File: {name}")),
        (None, Some(path)) => lines.push(format!("Selected: {path}")),
        (None, None) => {}
    }

    if let Some(job_id) = &view.job_id {
        let polling = if view.polling { " (polling)" } else { "" };
        lines.push(format!("Job: {job_id}{polling}"));
    }

    lines.push(format!("Actions: {}", enabled_actions(view)));
    lines
}

pub fn format_alert(alert: &Alert) -> String {
    format!("!! {}", alert.message)
}

fn progress_bar(value: u32) -> String {
    let filled = value.min(100) * BAR_WIDTH / 100;
    let mut bar = String::with_capacity(BAR_WIDTH as usize + 2);
    bar.push('[');
    for cell in 0..BAR_WIDTH {
        bar.push(if cell < filled { '#' } else { '.' });
    }
    bar.push(']');
    bar
}

fn enabled_actions(view: &ControllerViewModel) -> String {
    let actions = [
        ("upload", view.upload_enabled),
        ("start", view.start_enabled),
        ("stop", view.stop_enabled),
        ("download", view.download_enabled),
    ];
    let enabled: Vec<&str> = actions
        .iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(name, _)| *name)
        .collect();
    if enabled.is_empty() {
        "none".to_string()
    } else {
        enabled.join(" ")
    }
}
