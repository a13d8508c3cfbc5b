#![forbid(unsafe_code)]

mod animation;
mod app;
mod clock_face;
mod color;
mod config;
mod constants;
mod controller;
mod display;
mod event_handler;
mod font;
mod geometry;
mod overlay;
mod overlay_window;
mod poller;
mod settings;
mod tray;
mod visibility;
mod x11_utils;

use anyhow::{Context, Result};
use chrono::{Local, Timelike};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{error, info, warn, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use app::{subscribe_settings, App};
use constants::timing;
use event_handler::{handle_event, spawn_event_reader};
use poller::{LoopEvent, Ticker};
use settings::{SettingKey, SettingsStore};
use tray::{spawn_tray, TrayCommand, TrayHandle, TrayState};

fn tray_state(settings: &SettingsStore) -> TrayState {
    TrayState {
        clock_enabled: settings.get(SettingKey::ClockEnabled),
        show_background: settings.get(SettingKey::ShowBackground),
    }
}

/// Time left until the wall clock reaches the next whole second
fn until_next_second() -> Duration {
    let into_second = Local::now().nanosecond() % 1_000_000_000;
    Duration::from_nanos(u64::from(1_000_000_000 - into_second))
}

#[cfg(unix)]
fn register_shutdown_signals(flag: &Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    signal_hook::flag::register(SIGINT, Arc::clone(flag)).context("Failed to register SIGINT handler")?;
    signal_hook::flag::register(SIGTERM, Arc::clone(flag)).context("Failed to register SIGTERM handler")?;
    Ok(())
}

#[cfg(not(unix))]
fn register_shutdown_signals(_flag: &Arc<AtomicBool>) -> Result<()> {
    Ok(())
}

/// Returns false when the tray asked to quit
fn handle_tray_command(command: TrayCommand, settings: &SettingsStore, tray: Option<&TrayHandle>) -> bool {
    info!(?command, "Tray command");
    let result = match command {
        TrayCommand::ToggleClock => settings.toggle(SettingKey::ClockEnabled),
        TrayCommand::ToggleBackground => settings.toggle(SettingKey::ShowBackground),
        TrayCommand::Quit => return false,
    };
    if let Err(e) = result {
        error!(error = ?e, "Failed to save settings");
    }
    if let Some(tray) = tray {
        tray.update(tray_state(settings));
    }
    true
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var(constants::env::LOG_LEVEL)
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X11 server")?;
    let conn = Arc::new(conn);
    info!(screen = screen_num, "Connected to X11");

    let settings = SettingsStore::load();
    let app = Rc::new(RefCell::new(App::new(Arc::clone(&conn), screen_num, &settings)?));
    let subscriptions = subscribe_settings(&app, &settings);

    let shutdown = Arc::new(AtomicBool::new(false));
    register_shutdown_signals(&shutdown)?;

    // Event thread and tray thread -> main loop
    let (event_tx, event_rx) = mpsc::channel();
    spawn_event_reader(Arc::clone(&conn), event_tx.clone())?;
    let tray = match spawn_tray(tray_state(&settings), event_tx) {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!(error = ?e, "Failed to start tray, continuing without it");
            None
        }
    };

    let start = Instant::now();
    if let Err(e) = app.borrow_mut().start(start) {
        warn!(error = ?e, "Failed to draw initial clock face");
    }

    let mut poll = Ticker::new(timing::POLL_INTERVAL, start);
    let mut clock = Ticker::starting_at(timing::CLOCK_REFRESH_INTERVAL, start + until_next_second());
    let mut frames = Ticker::new(timing::FRAME_INTERVAL, start);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown signal received");
            break;
        }

        let now = Instant::now();
        let animating = app.borrow().is_animating();
        let mut wait = poll
            .time_until(now)
            .min(clock.time_until(now))
            .min(timing::MAX_LOOP_WAIT);
        if animating {
            wait = wait.min(frames.time_until(now));
        }

        match event_rx.recv_timeout(wait) {
            Ok(LoopEvent::X11(event)) => {
                let _ = handle_event(&mut app.borrow_mut(), event, Instant::now())
                    .inspect_err(|err| error!("encountered error in 'handle_event': err={err:#?}"));
            }
            Ok(LoopEvent::Tray(command)) => {
                if !handle_tray_command(command, &settings, tray.as_ref()) {
                    info!("Quit requested from tray menu");
                    break;
                }
            }
            Ok(LoopEvent::ConnectionLost(reason)) => {
                return Err(anyhow::anyhow!("Lost connection to X11 server: {}", reason));
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(anyhow::anyhow!("All event sources disconnected"));
            }
        }

        let now = Instant::now();
        if poll.poll(now) {
            app.borrow_mut().evaluate_and_apply(now);
        }
        if clock.poll(now) {
            let _ = app
                .borrow_mut()
                .refresh_clock()
                .inspect_err(|err| warn!(error = ?err, "Failed to refresh clock"));
        }
        if app.borrow().is_animating() {
            if frames.poll(now) {
                app.borrow_mut().tick_animation(now);
            }
        } else {
            frames = Ticker::new(timing::FRAME_INTERVAL, now);
        }
    }

    // Listeners go before the window they drive
    drop(subscriptions);
    drop(tray);
    drop(app);
    info!("Exiting");
    Ok(())
}
