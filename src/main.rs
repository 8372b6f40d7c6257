use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use undelete_client::config::ClientConfig;
use undelete_client::core::engine::{Completion, Confirm, Controller, Regions};
use undelete_client::core::events::UiEvent;
use undelete_client::core::modal::{ListenerCounter, ModalConfig, ModalController, Rect, Size};
use undelete_client::core::model::{BrowseTarget, FileEntry, JobId, JobKind, PreviewPayload, ScanRequest};
use undelete_client::core::presenter::render_results;
use undelete_client::core::selection::{parse_selection, ResultsView};
use undelete_client::core::status::StatusReporter;
use undelete_client::gateway::http::HttpGateway;
use undelete_client::i18n::{get_messages, Locale, Messages};

fn build_cli() -> Command {
    let scan = Command::new("scan")
        .about("Scan a drive or folder for deleted files")
        .arg(Arg::new("drive").help("Drive or path to scan").required(true))
        .arg(Arg::new("file_type").long("type").help("File extension filter, e.g. .jpg").default_value(""))
        .arg(Arg::new("min_size").long("min-size").help("Minimum size in KB").num_args(1))
        .arg(Arg::new("max_size").long("max-size").help("Maximum size in KB").num_args(1))
        .arg(Arg::new("start_date").long("start-date").help("Earliest modification date (YYYY-MM-DD)").num_args(1))
        .arg(Arg::new("end_date").long("end-date").help("Latest modification date (YYYY-MM-DD)").num_args(1))
        .arg(Arg::new("html").long("html").help("Write the rendered result list to this file").num_args(1))
        .arg(Arg::new("recover_to").long("recover-to").help("Recover selected results into this directory").num_args(1))
        .arg(
            Arg::new("select")
                .long("select")
                .help("Rows to recover: all, or numbers/ranges like 1,3,5-7")
                .default_value("all")
                .requires("recover_to"),
        );

    let recover = Command::new("recover")
        .about("Recover files by their full original path")
        .arg(Arg::new("save_dir").long("save-dir").help("Directory to save recovered files").required(true))
        .arg(Arg::new("paths").action(ArgAction::Append).num_args(1..).required(true));

    let delete = Command::new("delete")
        .about("Permanently delete files (cannot be undone)")
        .arg(Arg::new("yes").long("yes").help("Skip the confirmation prompt").action(ArgAction::SetTrue))
        .arg(Arg::new("paths").action(ArgAction::Append).num_args(1..).required(true));

    let preview = Command::new("preview")
        .about("Preview a file through the backend")
        .arg(Arg::new("path").required(true))
        .arg(Arg::new("html").long("html").help("Write the preview markup to this file").num_args(1));

    let browse = Command::new("browse")
        .about("Open the backend's folder picker")
        .arg(Arg::new("target").value_parser(["drive", "save"]).required(true));

    let wait = Command::new("wait")
        .about("Follow already running jobs, e.g. scan:42 recover:43")
        .arg(Arg::new("jobs").action(ArgAction::Append).num_args(1..).required(true));

    Command::new("undelete")
        .about("Drive a deleted-file recovery backend from the terminal")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(Arg::new("server").long("server").global(true).help("Backend base URL").num_args(1))
        .arg(Arg::new("config").long("config").global(true).help("Config file (TOML)").num_args(1))
        .arg(Arg::new("locale").long("locale").global(true).help("Message language: en, zh").num_args(1))
        .arg(Arg::new("verbose").long("verbose").short('v').global(true).action(ArgAction::SetTrue))
        .subcommand(scan)
        .subcommand(recover)
        .subcommand(delete)
        .subcommand(preview)
        .subcommand(browse)
        .subcommand(Command::new("progress").about("Show the backend's progress counters"))
        .subcommand(wait)
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(format!("undelete_client={level}").parse()?))
        .init();
    Ok(())
}

struct PromptConfirm {
    assume_yes: bool,
}

impl Confirm for PromptConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        tokio::task::block_in_place(|| {
            dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()
                .unwrap_or(false)
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_flag("verbose"))?;

    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let mut cfg = ClientConfig::load(config_path.as_deref())?;
    if let Some(server) = matches.get_one::<String>("server") {
        cfg.server.base_url = server.clone();
    }
    if let Some(locale) = matches.get_one::<String>("locale") {
        cfg.ui.locale = locale.clone();
    }
    let msg = get_messages(Locale::from_str(&cfg.ui.locale));

    let gateway = HttpGateway::new(&cfg.server.base_url, cfg.gateway_context())
        .with_context(|| format!("backend {}", cfg.server.base_url))?;

    let (event_tx, _) = broadcast::channel(256);
    let modal = ModalController::new(
        Arc::new(ListenerCounter::default()),
        ModalConfig::default(),
        Size { width: 1280.0, height: 800.0 },
        Rect { left: 240.0, top: 120.0, width: 800.0, height: 560.0 },
    )
    .with_events(event_tx.clone());
    let regions = Regions {
        status: StatusReporter::new(event_tx.clone()),
        results: ResultsView::new(),
        modal: Arc::new(Mutex::new(modal)),
    };
    let controller = Controller::new(Arc::new(gateway), regions, cfg.poll_policy(), msg);

    let ui_task = tokio::spawn(run_ui(event_tx.subscribe(), cfg.ui.progress_width));

    let result = dispatch(&controller, &matches, msg).await;

    drop(controller);
    drop(event_tx);
    let _ = ui_task.await;
    result
}

async fn dispatch(controller: &Controller, matches: &ArgMatches, msg: &Messages) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("scan", m)) => {
            let opt = |id: &str| m.get_one::<String>(id).filter(|s| !s.is_empty()).cloned();
            let req = ScanRequest {
                drive: m.get_one::<String>("drive").cloned().unwrap_or_default(),
                file_type: m.get_one::<String>("file_type").cloned().unwrap_or_default(),
                min_size: opt("min_size"),
                max_size: opt("max_size"),
                start_date: opt("start_date"),
                end_date: opt("end_date"),
            };
            let done = controller.scan(req).await?;
            print_rows(controller).await;

            if let Some(html_path) = m.get_one::<String>("html") {
                write_results_html(controller, Path::new(html_path)).await?;
            }

            if let Some(save_dir) = m.get_one::<String>("recover_to") {
                if !matches!(done, Completion::Rendered { .. }) {
                    anyhow::bail!("scan produced no result list to recover from");
                }
                let results = &controller.regions().results;
                let rows = results.rows().await.len();
                let spec = m.get_one::<String>("select").map(String::as_str).unwrap_or("all");
                if spec.trim().eq_ignore_ascii_case("all") {
                    results.check_all().await;
                } else {
                    for i in parse_selection(spec, rows).map_err(anyhow::Error::msg)? {
                        results.set_checked(i, true).await;
                    }
                }
                controller.recover(save_dir).await?;
            }
        }
        Some(("recover", m)) => {
            let save_dir = m.get_one::<String>("save_dir").cloned().unwrap_or_default();
            load_paths(controller, m, msg).await;
            controller.recover(&save_dir).await?;
        }
        Some(("delete", m)) => {
            load_paths(controller, m, msg).await;
            let confirm = PromptConfirm { assume_yes: m.get_flag("yes") };
            controller.delete(&confirm).await?;
        }
        Some(("preview", m)) => {
            let path = m.get_one::<String>("path").cloned().unwrap_or_default();
            let payload = controller.preview(&path).await?;
            match &payload {
                PreviewPayload::Text { content } => println!("{content}"),
                PreviewPayload::Image { src } => {
                    let head: String = src.chars().take(48).collect();
                    println!("image preview ({} bytes): {head}...", src.len());
                }
                PreviewPayload::Error { message } => println!("preview error: {message}"),
                PreviewPayload::Unavailable => println!("preview not available"),
            }
            if let Some(html_path) = m.get_one::<String>("html") {
                let html = controller.regions().modal.lock().await.content().to_string();
                tokio::fs::write(html_path, html)
                    .await
                    .with_context(|| format!("write {html_path}"))?;
            }
        }
        Some(("browse", m)) => {
            let target = match m.get_one::<String>("target").map(String::as_str) {
                Some("save") => BrowseTarget::SaveDir,
                _ => BrowseTarget::Drive,
            };
            let path = controller.browse(target).await?;
            if path.is_empty() {
                println!("(nothing selected)");
            } else {
                println!("{path}");
            }
        }
        Some(("progress", _)) => {
            let snap = controller.progress().await?;
            for kind in JobKind::ALL {
                println!("{:<8} {:>3}%", kind, snap.percent(kind));
            }
        }
        Some(("wait", m)) => {
            let mut jobs = Vec::new();
            for raw in m.get_many::<String>("jobs").into_iter().flatten() {
                let (kind, id) = raw
                    .split_once(':')
                    .and_then(|(k, id)| Some((JobKind::parse(k)?, id)))
                    .with_context(|| format!("expected <scan|recover>:<job-id>, got {raw}"))?;
                jobs.push((kind, JobId(id.to_string())));
            }
            let results = futures::future::join_all(
                jobs.into_iter().map(|(kind, id)| async move { (kind, controller.wait(kind, id).await) }),
            )
            .await;
            let mut first_err = None;
            for (kind, r) in results {
                match r {
                    Ok(done) => println!("{kind}: {done:?}"),
                    Err(e) => {
                        eprintln!("{kind}: {e}");
                        first_err.get_or_insert(e);
                    }
                }
            }
            print_rows(controller).await;
            if let Some(e) = first_err {
                return Err(e.into());
            }
        }
        _ => {}
    }
    Ok(())
}

async fn load_paths(controller: &Controller, m: &ArgMatches, msg: &Messages) {
    let paths: Vec<String> = m.get_many::<String>("paths").into_iter().flatten().cloned().collect();
    let files: Vec<FileEntry> = paths.iter().map(|p| FileEntry::new(p.clone(), None)).collect();
    let results = &controller.regions().results;
    results.show(render_results(&files, msg)).await;
    results.check_paths(&paths).await;
}

async fn print_rows(controller: &Controller) {
    let rows = controller.regions().results.rows().await;
    for (i, row) in rows.iter().enumerate() {
        println!("{:>4}. {:<32} {:>10}  {}", i + 1, row.name, row.size, row.path);
    }
}

async fn write_results_html(controller: &Controller, path: &Path) -> anyhow::Result<()> {
    let rendered = controller.regions().results.rendered().await;
    let Some(r) = rendered else { return Ok(()) };
    let mut html = String::new();
    if let Some(summary) = &r.summary_html {
        html.push_str(&format!("<div id=\"summary\">{summary}</div>\n"));
    }
    html.push_str(&format!("<div id=\"results\">\n{}\n</div>\n", r.list_html));
    tokio::fs::write(path, html)
        .await
        .with_context(|| format!("write {}", path.display()))
}

async fn run_ui(mut rx: broadcast::Receiver<UiEvent>, bar_width: u16) {
    let mp = MultiProgress::new();
    let sty_spinner = ProgressStyle::with_template("{spinner:.green} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("|/-\\ ");
    let sty_bar = ProgressStyle::with_template(&format!("{{prefix:>8}} {{bar:{bar_width}.cyan/blue}} {{pos:>3}}%"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());

    let status = mp.add(ProgressBar::new_spinner());
    status.set_style(sty_spinner);
    let mut bars: HashMap<JobKind, ProgressBar> = HashMap::new();

    loop {
        let evt = match rx.recv().await {
            Ok(e) => e,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match evt {
            UiEvent::StatusChanged { text } => status.set_message(text),
            UiEvent::SpinnerToggled { visible } => {
                if visible {
                    status.enable_steady_tick(std::time::Duration::from_millis(120));
                } else {
                    status.disable_steady_tick();
                    status.tick();
                }
            }
            UiEvent::Progress { kind, percent } => {
                let pb = bars.entry(kind).or_insert_with(|| {
                    let pb = mp.add(ProgressBar::new(100));
                    pb.set_style(sty_bar.clone());
                    pb.set_prefix(kind.to_string());
                    pb
                });
                pb.set_position(u64::from(percent));
            }
            UiEvent::ResultsRendered { rows, summary } => {
                let counts: Vec<String> = summary.iter().map(|(ext, n)| format!("{ext}: {n}")).collect();
                let _ = mp.println(format!("{rows} file(s) | {}", counts.join(", ")));
            }
            UiEvent::Notify { message } => {
                let _ = mp.println(format!("[!] {message}"));
            }
            UiEvent::ModalChanged { open } => {
                tracing::debug!(open, "preview modal");
            }
            UiEvent::Error { scope, message } => {
                let _ = mp.println(format!("[ERR] {scope}: {message}"));
            }
        }
    }

    for pb in bars.values() {
        pb.finish();
    }
    status.finish();
}
