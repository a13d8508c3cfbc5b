//! StatusNotifier tray item (ksni) running on its own thread

use anyhow::{Context, Result};
use ksni::TrayMethods;
use ksni::menu::{MenuItem, StandardItem};
use std::sync::mpsc::Sender;
use std::thread;
use tokio::sync::mpsc::{self as async_mpsc, UnboundedSender};
use tracing::{error, info, warn};

use crate::constants::tray;
use crate::poller::LoopEvent;

/// Menu actions, handled on the main thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayCommand {
    ToggleClock,
    ToggleBackground,
    Quit,
}

/// What the menu labels reflect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrayState {
    pub clock_enabled: bool,
    pub show_background: bool,
}

impl TrayState {
    pub fn clock_label(&self) -> &'static str {
        if self.clock_enabled { "Hide Clock" } else { "Show Clock" }
    }

    pub fn background_label(&self) -> &'static str {
        if self.show_background { "Hide Background" } else { "Show Background" }
    }
}

struct CornerTray {
    state: TrayState,
    events: Sender<LoopEvent>,
}

impl CornerTray {
    fn send(&self, command: TrayCommand) {
        if self.events.send(LoopEvent::Tray(command)).is_err() {
            warn!(?command, "Main loop gone, dropping tray command");
        }
    }
}

impl ksni::Tray for CornerTray {
    fn id(&self) -> String {
        tray::ID.into()
    }

    fn title(&self) -> String {
        tray::TITLE.into()
    }

    fn icon_name(&self) -> String {
        tray::ICON_NAME.into()
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        vec![
            StandardItem {
                label: self.state.clock_label().into(),
                activate: Box::new(|tray: &mut Self| tray.send(TrayCommand::ToggleClock)),
                ..Default::default()
            }
            .into(),
            StandardItem {
                label: self.state.background_label().into(),
                activate: Box::new(|tray: &mut Self| tray.send(TrayCommand::ToggleBackground)),
                ..Default::default()
            }
            .into(),
            MenuItem::Separator,
            StandardItem {
                label: "Quit".into(),
                icon_name: "application-exit".into(),
                activate: Box::new(|tray: &mut Self| tray.send(TrayCommand::Quit)),
                ..Default::default()
            }
            .into(),
        ]
    }
}

/// Pushes label changes to the tray thread. Dropping it shuts the tray down.
pub struct TrayHandle {
    updates: UnboundedSender<TrayState>,
}

impl TrayHandle {
    pub fn update(&self, state: TrayState) {
        if self.updates.send(state).is_err() {
            warn!("Tray thread has exited, label update dropped");
        }
    }
}

/// Spawn the tray thread. A missing StatusNotifier host is logged there and
/// the overlay keeps running without a tray.
pub fn spawn_tray(initial: TrayState, events: Sender<LoopEvent>) -> Result<TrayHandle> {
    let (updates, mut receiver) = async_mpsc::unbounded_channel::<TrayState>();

    thread::Builder::new()
        .name("tray".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!(error = %e, "Failed to build tray runtime");
                    return;
                }
            };

            runtime.block_on(async move {
                let tray = CornerTray { state: initial, events };
                let handle = match tray.spawn().await {
                    Ok(handle) => handle,
                    Err(e) => {
                        error!(error = ?e, "Failed to register tray icon (no StatusNotifier host?)");
                        return;
                    }
                };
                info!("Tray icon registered");

                while let Some(state) = receiver.recv().await {
                    handle.update(|tray: &mut CornerTray| tray.state = state).await;
                }
                handle.shutdown().await;
                info!("Tray icon removed");
            });
        })
        .context("Failed to spawn tray thread")?;

    Ok(TrayHandle { updates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_labels_follow_state() {
        let state = TrayState { clock_enabled: true, show_background: false };
        assert_eq!(state.clock_label(), "Hide Clock");
        assert_eq!(state.background_label(), "Show Background");

        let state = TrayState { clock_enabled: false, show_background: true };
        assert_eq!(state.clock_label(), "Show Clock");
        assert_eq!(state.background_label(), "Hide Background");
    }

    #[test]
    fn test_menu_items_forward_commands() {
        let (sender, receiver) = mpsc::channel();
        let tray = CornerTray {
            state: TrayState { clock_enabled: true, show_background: false },
            events: sender,
        };
        tray.send(TrayCommand::ToggleBackground);
        tray.send(TrayCommand::Quit);

        let received: Vec<TrayCommand> = receiver
            .try_iter()
            .filter_map(|event| match event {
                LoopEvent::Tray(command) => Some(command),
                _ => None,
            })
            .collect();
        assert_eq!(received, vec![TrayCommand::ToggleBackground, TrayCommand::Quit]);
    }

    #[test]
    fn test_send_after_main_loop_exit_is_harmless() {
        let (sender, receiver) = mpsc::channel();
        drop(receiver);
        let tray = CornerTray {
            state: TrayState { clock_enabled: true, show_background: true },
            events: sender,
        };
        tray.send(TrayCommand::ToggleClock);
    }
}
