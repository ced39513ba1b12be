mod app;
mod cli;
mod config;
mod dispatch;
mod filter;
mod input;
mod mesh;
mod model;
mod query;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppEffect, InputMode};
use clap::Parser;
use cli::CliArgs;
use config::{RuntimeConfigSnapshot, RuntimeConfigWatcher};
use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use dispatch::Dispatcher;
use futures::StreamExt;
use mesh::SnapshotSource;
use model::ResourceTab;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter)?;

    let initial_tab = args.tab.as_deref().and_then(ResourceTab::from_token);
    if args.tab.is_some() && initial_tab.is_none() {
        warn!("unrecognized tab token {:?}, starting on Meshes", args.tab);
    }

    let mut source = SnapshotSource::new(args.snapshot.clone());
    let snapshot = source.load()?;

    let mut config = RuntimeConfigWatcher::discover();
    let runtime_config = config.load_current().unwrap_or_else(|error| {
        warn!("runtime config ignored: {error:#}");
        RuntimeConfigSnapshot::default()
    });

    let mut app = App::new(
        source.label(),
        &snapshot,
        runtime_config.placeholder.clone(),
        args.query.clone(),
        initial_tab,
    );
    let mut keys = build_normal_dispatcher(&runtime_config);

    run(
        &mut app,
        &mut keys,
        &mut source,
        &mut config,
        args.refresh_ms.max(250),
    )
    .await
}

fn init_tracing(level_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::sink)
        .try_init();

    Ok(())
}

/// The normal-mode dispatcher: built-in bindings plus validated extras from
/// the runtime config. Rebuilt whole on config reload; the returned instance
/// is already subscribed.
fn build_normal_dispatcher(runtime_config: &RuntimeConfigSnapshot) -> Dispatcher<App> {
    let mut extras = Vec::new();
    for hotkey in &runtime_config.hotkeys {
        let Some(combo) = input::normalize_hotkey_spec(&hotkey.key) else {
            warn!("skipping hotkey with unusable key spec {:?}", hotkey.key);
            continue;
        };
        if !app::is_known_command(&hotkey.command) {
            warn!(
                "skipping hotkey {:?}: unknown command {:?}",
                hotkey.key, hotkey.command
            );
            continue;
        }
        extras.push((combo, hotkey.command.clone()));
    }

    let mut keys = app::normal_dispatcher(&extras);
    keys.register_listener();
    keys
}

async fn run(
    app: &mut App,
    keys: &mut Dispatcher<App>,
    source: &mut SnapshotSource,
    config: &mut RuntimeConfigWatcher,
    refresh_ms: u64,
) -> Result<()> {
    let mut terminal = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, keys, source, config, refresh_ms).await;
    let restore_result = restore_terminal(&mut terminal);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<TuiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    keys: &mut Dispatcher<App>,
    source: &mut SnapshotSource,
    config: &mut RuntimeConfigWatcher,
    refresh_ms: u64,
) -> Result<()> {
    let mut reader = EventStream::new();
    let mut ticker = interval(Duration::from_millis(refresh_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        handle_key(app, keys, &key);
                        apply_effects(app, source);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                match source.reload_if_changed() {
                    Ok(Some(snapshot)) => {
                        app.set_snapshot(&snapshot);
                        app.set_status(format!("Snapshot reloaded from {}", source.label()));
                    }
                    Ok(None) => {}
                    Err(error) => {
                        app.set_active_table_error(format!("{error:#}"));
                        app.set_status(format!("Snapshot reload failed: {error:#}"));
                    }
                }
                match config.reload_if_changed() {
                    Ok(Some(runtime_config)) => {
                        keys.unregister_listener();
                        *keys = build_normal_dispatcher(&runtime_config);
                        let source_label = runtime_config
                            .source
                            .unwrap_or_else(|| "defaults".to_string());
                        app.set_status(format!("Runtime config reloaded from {source_label}"));
                    }
                    Ok(None) => {}
                    Err(error) => {
                        app.set_status(format!("Runtime config reload failed: {error:#}"));
                    }
                }
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, keys: &Dispatcher<App>, key: &KeyEvent) {
    let mut press = input::key_press_from_event(key);
    debug!("combo={}", press.combo());
    match app.mode() {
        InputMode::Normal => {
            keys.dispatch(app, &mut press);
            app.drain_filter_changes();
        }
        InputMode::Filter => {
            app.handle_filter_key(&mut press, input::text_char(key));
        }
    }
}

fn apply_effects(app: &mut App, source: &mut SnapshotSource) {
    for effect in app.take_effects() {
        match effect {
            AppEffect::ReloadSnapshot => match source.load() {
                Ok(snapshot) => {
                    app.set_snapshot(&snapshot);
                    app.set_status(format!("Reloaded {}", source.label()));
                }
                Err(error) => {
                    app.set_active_table_error(format!("{error:#}"));
                    app.set_status(format!("Reload failed: {error:#}"));
                }
            },
        }
    }
}
