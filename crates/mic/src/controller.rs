//! Debounced microphone controller
//!
//! User-initiated actions go through the coalescer: a toggle is leading-edge
//! (the first press acts at once, presses inside the window are absorbed) and
//! settings writes are trailing-edge per setting key (only the last value of
//! a burst is persisted). State notifications are published immediately and
//! are never debounced. Every mute change that reaches the backend is
//! followed by a feedback cue when a [`SoundPlayer`] is configured.

use crate::backend::AudioBackend;
use crate::error::MicError;
use crate::sound::{Cue, SoundPlayer};
use crate::state::{MicrophoneState, Settings};
use coalesce::{DebouncePolicy, Debouncer, KeyedDebounced, KeyedRegistry};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Receives settings after a debounced write
pub type SettingsSink = Arc<dyn Fn(&Settings) -> Result<(), MicError> + Send + Sync>;

const TELEMETRY_KEY: &str = "telemetry";

type ToggleResult = Result<MicrophoneState, MicError>;
type SettingsResult = Result<Settings, MicError>;

/// Controller construction options
#[derive(Clone)]
pub struct ControllerOptions {
    /// Toggle debounce (default: 300ms leading)
    pub toggle: DebouncePolicy,

    /// Settings write debounce (default: 500ms trailing)
    pub settings: DebouncePolicy,

    /// Evict idle settings streams after this long (default: never)
    pub settings_eviction: Option<Duration>,

    /// Settings in effect at startup
    pub initial_settings: Settings,

    /// Where debounced settings writes go
    pub sink: Option<SettingsSink>,

    /// Feedback after mute changes (default: none)
    pub sound: Option<Arc<dyn SoundPlayer>>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            toggle: DebouncePolicy::leading(Duration::from_millis(300)),
            settings: DebouncePolicy::trailing(Duration::from_millis(500)),
            settings_eviction: None,
            initial_settings: Settings::default(),
            sink: None,
            sound: None,
        }
    }
}

/// Microphone controller
pub struct MicController {
    backend: Arc<dyn AudioBackend>,
    settings: Arc<Mutex<Settings>>,
    last_write: Arc<Mutex<Option<SettingsResult>>>,
    sound: Option<Arc<dyn SoundPlayer>>,
    toggle: Debouncer<(), ToggleResult>,
    settings_writes: KeyedRegistry<&'static str, SettingsResult>,
    telemetry: KeyedDebounced<&'static str, bool, SettingsResult>,
    settings_policy: DebouncePolicy,
    state_tx: Arc<watch::Sender<MicrophoneState>>,
    evictor: Option<JoinHandle<()>>,
}

impl MicController {
    /// Build a controller on the current tokio runtime
    pub fn new(backend: Arc<dyn AudioBackend>, options: ControllerOptions) -> coalesce::Result<Self> {
        let initial = backend.state().unwrap_or_else(|e| {
            warn!("Failed to read initial microphone state from {}: {}", backend.name(), e);
            MicrophoneState::default()
        });
        let (state_tx, _) = watch::channel(initial);
        let state_tx = Arc::new(state_tx);

        let toggle = {
            let backend = Arc::clone(&backend);
            let state_tx = Arc::clone(&state_tx);
            let sound = options.sound.clone();
            Debouncer::new(options.toggle, move |_: ()| {
                toggle_once(backend.as_ref(), &state_tx, sound.as_deref())
            })?
        };

        let settings = Arc::new(Mutex::new(options.initial_settings));
        let last_write = Arc::new(Mutex::new(None));
        let settings_writes = KeyedRegistry::new()?;
        let telemetry = {
            let settings = Arc::clone(&settings);
            let last_write = Arc::clone(&last_write);
            let sink = options.sink.clone();
            settings_writes.with_key(TELEMETRY_KEY, options.settings, move |enabled: bool| {
                let result = apply_telemetry(&settings, sink.as_ref(), enabled);
                *last_write.lock() = Some(result.clone());
                result
            })
        };

        let evictor = match options.settings_eviction {
            Some(max_idle) => Some(settings_writes.spawn_eviction(max_idle, max_idle)?),
            None => None,
        };

        Ok(Self {
            backend,
            settings,
            last_write,
            sound: options.sound,
            toggle,
            settings_writes,
            telemetry,
            settings_policy: options.settings,
            state_tx,
            evictor,
        })
    }

    /// Toggle mute, debounced
    ///
    /// Returns the outcome of the last toggle that reached the backend,
    /// which is this one if it was the first press of a burst.
    pub fn toggle(&self) -> Option<ToggleResult> {
        self.toggle.call(())
    }

    /// Set mute directly, bypassing the debounce window
    pub fn set_mute(&self, mute: bool) -> ToggleResult {
        let state = self.backend.set_mute(mute)?;
        self.publish(state);
        announce(self.sound.as_deref(), state);
        Ok(state)
    }

    /// Query the backend
    pub fn state(&self) -> ToggleResult {
        self.backend.state()
    }

    /// Last published state
    pub fn current(&self) -> MicrophoneState {
        *self.state_tx.borrow()
    }

    /// Push a state change observed outside the controller
    pub fn notify(&self, state: MicrophoneState) {
        debug!("Microphone state notification: {}", state.label());
        self.publish(state);
    }

    /// Watch published state changes
    pub fn subscribe(&self) -> watch::Receiver<MicrophoneState> {
        self.state_tx.subscribe()
    }

    /// Change the telemetry setting, debounced
    pub fn set_telemetry(&self, enabled: bool) -> Option<SettingsResult> {
        self.telemetry.call(enabled)
    }

    /// Settings as of the last applied write
    pub fn settings(&self) -> Settings {
        self.settings.lock().clone()
    }

    /// Outcome of the last applied telemetry write
    ///
    /// Also kept by the controller, so it survives idle eviction of the
    /// settings stream.
    pub fn last_settings_write(&self) -> Option<SettingsResult> {
        self.telemetry
            .last_result()
            .or_else(|| self.last_write.lock().clone())
    }

    /// True while a settings write is waiting for its window to close
    ///
    /// A leading-edge settings policy writes immediately, so this is false
    /// during its window.
    pub fn is_settling(&self) -> bool {
        self.settings_writes.has_deferred(&TELEMETRY_KEY)
    }

    /// Wait until pending settings writes have been applied
    pub async fn settle(&self) {
        while self.is_settling() {
            tokio::time::sleep(self.settings_policy.wait() + Duration::from_millis(1)).await;
        }
    }

    /// Drop pending debounced work without running it
    pub fn shutdown(&self) -> usize {
        let toggles = usize::from(self.toggle.cancel());
        let writes = self.settings_writes.cancel_all();
        if writes > 0 {
            warn!("Discarded {} pending settings writes", writes);
        }
        toggles + writes
    }

    /// Backend name
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    fn publish(&self, state: MicrophoneState) {
        self.state_tx.send_replace(state);
    }
}

impl Drop for MicController {
    fn drop(&mut self) {
        if let Some(evictor) = self.evictor.take() {
            evictor.abort();
        }
    }
}

fn toggle_once(
    backend: &dyn AudioBackend,
    state_tx: &watch::Sender<MicrophoneState>,
    sound: Option<&dyn SoundPlayer>,
) -> ToggleResult {
    let result = backend
        .state()
        .and_then(|current| backend.set_mute(!current.is_muted));

    match &result {
        Ok(state) => {
            info!("Microphone {}", state.label());
            state_tx.send_replace(*state);
            announce(sound, *state);
        }
        Err(e) => warn!("Failed to toggle microphone: {}", e),
    }
    result
}

fn announce(sound: Option<&dyn SoundPlayer>, state: MicrophoneState) {
    let Some(sound) = sound else {
        return;
    };
    if let Err(e) = sound.play(Cue::for_muted(state.is_muted)) {
        warn!("Failed to play {} sound via {}: {}", state.label(), sound.name(), e);
    }
}

fn apply_telemetry(settings: &Mutex<Settings>, sink: Option<&SettingsSink>, enabled: bool) -> SettingsResult {
    let snapshot = {
        let mut settings = settings.lock();
        settings.telemetry_enabled = enabled;
        settings.clone()
    };
    info!("Telemetry {}", if enabled { "enabled" } else { "disabled" });

    if let Some(sink) = sink {
        if let Err(e) = sink(&snapshot) {
            warn!("Failed to persist settings: {}", e);
            return Err(e);
        }
    }
    Ok(snapshot)
}
