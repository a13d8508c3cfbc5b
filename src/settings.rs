//! Reactive settings store for the two user toggles.
//!
//! Listeners are called synchronously, on the thread that calls [`SettingsStore::set`],
//! and only when a value actually changes. A [`Subscription`] releases its
//! listener when dropped.

use anyhow::Result;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::{Rc, Weak};
use tracing::{info, warn};

use crate::config::{DisplayConfig, PersistentState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    ClockEnabled,
    ShowBackground,
}

type Listener = Rc<RefCell<dyn FnMut(bool)>>;

struct Inner {
    state: PersistentState,
    /// `None` keeps the store in memory only
    path: Option<PathBuf>,
    listeners: Vec<(u64, SettingKey, Listener)>,
    next_id: u64,
}

#[derive(Clone)]
pub struct SettingsStore {
    inner: Rc<RefCell<Inner>>,
}

/// Keeps a listener registered. Drop to unsubscribe.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    store: Weak<RefCell<Inner>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            inner.borrow_mut().listeners.retain(|(id, _, _)| *id != self.id);
        }
    }
}

impl SettingsStore {
    pub fn new(state: PersistentState, path: Option<PathBuf>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state,
                path,
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Load from the user's config file
    pub fn load() -> Self {
        let path = PersistentState::config_path();
        let state = PersistentState::load_from(&path);
        Self::new(state, Some(path))
    }

    pub fn get(&self, key: SettingKey) -> bool {
        let inner = self.inner.borrow();
        match key {
            SettingKey::ClockEnabled => inner.state.clock_enabled,
            SettingKey::ShowBackground => inner.state.show_background,
        }
    }

    pub fn display_config(&self) -> DisplayConfig {
        self.inner.borrow().state.build_display_config()
    }

    /// Write a value, persist it, then notify listeners of `key`.
    ///
    /// Listeners run even if persisting fails; the error is returned afterwards.
    pub fn set(&self, key: SettingKey, value: bool) -> Result<()> {
        let (saved, listeners) = {
            let mut inner = self.inner.borrow_mut();
            let slot = match key {
                SettingKey::ClockEnabled => &mut inner.state.clock_enabled,
                SettingKey::ShowBackground => &mut inner.state.show_background,
            };
            if *slot == value {
                return Ok(());
            }
            *slot = value;
            info!(setting = ?key, value, "Setting changed");

            let saved = match &inner.path {
                Some(path) => inner.state.save_to(path),
                None => Ok(()),
            };
            let listeners: Vec<Listener> = inner
                .listeners
                .iter()
                .filter(|(_, k, _)| *k == key)
                .map(|(_, _, listener)| Rc::clone(listener))
                .collect();
            (saved, listeners)
        };

        for listener in listeners {
            match listener.try_borrow_mut() {
                Ok(mut callback) => (&mut *callback)(value),
                Err(_) => warn!(setting = ?key, "listener re-entered itself, skipping"),
            }
        }
        saved
    }

    /// Flip a value and return the new one
    pub fn toggle(&self, key: SettingKey) -> Result<bool> {
        let value = !self.get(key);
        self.set(key, value)?;
        Ok(value)
    }

    pub fn subscribe(&self, key: SettingKey, listener: impl FnMut(bool) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        let listener: Listener = Rc::new(RefCell::new(listener));
        inner.listeners.push((id, key, listener));
        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
        }
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn store() -> SettingsStore {
        SettingsStore::new(PersistentState::default(), None)
    }

    #[test]
    fn test_defaults() {
        let settings = store();
        assert!(settings.get(SettingKey::ClockEnabled));
        assert!(!settings.get(SettingKey::ShowBackground));
    }

    #[test]
    fn test_notifies_only_watched_key_on_change() {
        let settings = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = settings.subscribe(SettingKey::ClockEnabled, move |v| sink.borrow_mut().push(v));

        settings.set(SettingKey::ClockEnabled, true).unwrap();
        settings.set(SettingKey::ShowBackground, true).unwrap();
        settings.set(SettingKey::ClockEnabled, false).unwrap();
        settings.set(SettingKey::ClockEnabled, false).unwrap();
        settings.set(SettingKey::ClockEnabled, true).unwrap();

        assert_eq!(*seen.borrow(), vec![false, true]);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let settings = store();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let sub = settings.subscribe(SettingKey::ShowBackground, move |_| counter.set(counter.get() + 1));
        assert_eq!(settings.listener_count(), 1);

        settings.toggle(SettingKey::ShowBackground).unwrap();
        drop(sub);
        assert_eq!(settings.listener_count(), 0);
        settings.toggle(SettingKey::ShowBackground).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_subscription_outliving_store() {
        let settings = store();
        let sub = settings.subscribe(SettingKey::ClockEnabled, |_| {});
        drop(settings);
        drop(sub);
    }

    #[test]
    fn test_listener_can_read_and_write_store() {
        let settings = store();
        let handle = settings.clone();
        let observed = Rc::new(Cell::new(None));
        let sink = Rc::clone(&observed);
        let _sub = settings.subscribe(SettingKey::ClockEnabled, move |enabled| {
            sink.set(Some(handle.get(SettingKey::ClockEnabled)));
            if !enabled {
                handle.set(SettingKey::ShowBackground, false).unwrap();
            }
        });

        settings.set(SettingKey::ShowBackground, true).unwrap();
        settings.set(SettingKey::ClockEnabled, false).unwrap();
        assert_eq!(observed.get(), Some(false));
        assert!(!settings.get(SettingKey::ShowBackground));
    }

    #[test]
    fn test_toggle_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let settings = SettingsStore::new(PersistentState::default(), Some(path.clone()));

        assert!(!settings.toggle(SettingKey::ClockEnabled).unwrap());
        let reloaded = PersistentState::load_from(&path);
        assert!(!reloaded.clock_enabled);
    }

    #[test]
    fn test_save_failure_still_notifies() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the write fail
        let path = dir.path().join("config.json");
        std::fs::create_dir(&path).unwrap();
        let settings = SettingsStore::new(PersistentState::default(), Some(path));
        let notified = Rc::new(Cell::new(false));
        let sink = Rc::clone(&notified);
        let _sub = settings.subscribe(SettingKey::ShowBackground, move |_| sink.set(true));

        assert!(settings.set(SettingKey::ShowBackground, true).is_err());
        assert!(notified.get());
        assert!(settings.get(SettingKey::ShowBackground));
    }
}
