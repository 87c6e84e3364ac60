//! High-level device handle for a pair of G1 glasses.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use even_g1_core::event::{self, AudioFrame};
use even_g1_core::ops::{self, DashboardMode, DashboardSubMode};
use even_g1_core::Side;
use tokio::task::JoinHandle;

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// A pair of G1 glasses.
///
/// Thin facade over the [`Engine`]: one typed async method per protocol
/// operation, the multi-step bitmap handshake, a background heartbeat, and
/// named listener registration for gestures and status events. Advanced
/// callers can reach the engine itself through [`engine`](Glasses::engine),
/// e.g. to submit commands with custom deadlines or to cancel them.
///
/// # Example
/// ```no_run
/// use even_g1::Glasses;
/// # async fn example(left: std::sync::Arc<dyn even_g1::Transport>,
/// #                  right: std::sync::Arc<dyn even_g1::Transport>)
/// #     -> even_g1::Result<()> {
/// let glasses = Glasses::new(left, right);
/// glasses.connect().await?;
/// glasses.set_brightness(50, true).await?;
/// glasses.send_text("hello from rust").await?;
/// # Ok(())
/// # }
/// ```
pub struct Glasses {
    engine: Engine,
    heartbeat_seq: Arc<AtomicU8>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl Glasses {
    /// Builds a device handle over the two transport endpoints.
    pub fn new(left: Arc<dyn Transport>, right: Arc<dyn Transport>) -> Self {
        Self {
            engine: Engine::new(left, right),
            heartbeat_seq: Arc::new(AtomicU8::new(0)),
            heartbeat: Mutex::new(None),
        }
    }

    /// The underlying protocol engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Connects both sides.
    pub async fn connect(&self) -> Result<()> {
        for side in Side::ALL {
            self.engine.connect(side).await?;
        }
        Ok(())
    }

    /// Disconnects both sides, failing anything still pending.
    pub async fn disconnect(&self) {
        self.stop_heartbeat();
        for side in Side::ALL {
            self.engine.disconnect(side).await;
        }
    }

    /// Opens the protocol session. Call once both sides are initialized.
    pub async fn initialize(&self) -> Result<bool> {
        self.engine.submit_and_wait(ops::initialize()).await
    }

    /// Sets display brightness (0-100 percent) and auto-brightness.
    pub async fn set_brightness(&self, level: u8, auto: bool) -> Result<bool> {
        self.engine
            .submit_and_wait(ops::set_brightness(level, auto))
            .await
    }

    /// Enables or disables silent mode.
    pub async fn set_silent_mode(&self, silent: bool) -> Result<bool> {
        self.engine
            .submit_and_wait(ops::set_silent_mode(silent))
            .await
    }

    /// Enables or disables the microphone.
    pub async fn set_microphone_enabled(&self, enabled: bool) -> Result<bool> {
        self.engine
            .submit_and_wait(ops::set_microphone_enabled(enabled))
            .await
    }

    /// Selects the dashboard layout and panel.
    pub async fn set_dashboard_mode(
        &self,
        mode: DashboardMode,
        sub_mode: DashboardSubMode,
    ) -> Result<bool> {
        self.engine
            .submit_and_wait(ops::set_dashboard_mode(mode, sub_mode)?)
            .await
    }

    /// Sets the head-up display angle (clamped to 0-60 degrees).
    pub async fn set_head_up_angle(&self, angle: u8) -> Result<bool> {
        self.engine
            .submit_and_wait(ops::set_head_up_angle(angle))
            .await
    }

    /// Enables or disables wear detection.
    pub async fn set_wear_detection(&self, enabled: bool) -> Result<bool> {
        self.engine
            .submit_and_wait(ops::set_wear_detection(enabled))
            .await
    }

    /// Battery percentage of one arm.
    pub async fn battery(&self, side: Side) -> Result<u8> {
        self.engine.submit_and_wait(ops::battery(side)).await
    }

    /// Firmware build version, e.g. `"1.5.0.12"`.
    pub async fn firmware_info(&self) -> Result<String> {
        self.engine.submit_and_wait(ops::firmware_info()).await
    }

    /// Exits the current app back to the dashboard.
    pub async fn exit_app(&self) -> Result<bool> {
        self.engine.submit_and_wait(ops::exit_app()).await
    }

    /// Reboots the firmware.
    pub async fn quick_restart(&self) -> Result<bool> {
        self.engine.submit_and_wait(ops::quick_restart()).await
    }

    /// Queries device uptime.
    pub async fn device_uptime(&self) -> Result<bool> {
        self.engine.submit_and_wait(ops::device_uptime()).await
    }

    /// Fetches the on-device usage counters.
    pub async fn usage_report(&self) -> Result<bool> {
        self.engine.submit_and_wait(ops::usage_report()).await
    }

    /// Displays text on the glasses.
    pub async fn send_text(&self, text: &str) -> Result<bool> {
        self.engine.submit_and_wait(ops::send_text(text)?).await
    }

    /// Uploads the JSON notification configuration.
    pub async fn set_notification_config(&self, json: &str) -> Result<bool> {
        self.engine
            .submit_and_wait(ops::set_notification_config(json)?)
            .await
    }

    /// Uploads the JSON app whitelist.
    pub async fn set_whitelist(&self, json: &str) -> Result<bool> {
        self.engine
            .submit_and_wait(ops::set_whitelist(json)?)
            .await
    }

    /// Runs the full bitmap flow: chunked upload, checksum verification,
    /// then end-of-transfer to show the image.
    ///
    /// `bmp` is an already-rendered 1-bit BMP; this crate does not touch
    /// pixels. Returns `false` as soon as the device rejects a step.
    pub async fn display_bitmap(&self, bmp: &[u8]) -> Result<bool> {
        if !self.engine.submit_and_wait(ops::send_bitmap(bmp)?).await? {
            return Ok(false);
        }
        if !self.engine.submit_and_wait(ops::bitmap_crc(bmp)).await? {
            log::warn!("bitmap checksum rejected by the device");
            return Ok(false);
        }
        self.engine
            .submit_and_wait(ops::end_bitmap_transfer())
            .await
    }

    /// Starts a background heartbeat at `interval`.
    ///
    /// The sequence number wraps; beats that lose the prefix to another
    /// in-flight command are skipped silently. Restarting replaces the
    /// previous task.
    pub fn start_heartbeat(&self, interval: Duration) {
        let engine = self.engine.clone();
        let seq = Arc::clone(&self.heartbeat_seq);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let n = seq.fetch_add(1, Ordering::Relaxed);
                match engine.submit_and_wait(ops::heartbeat(n)).await {
                    Ok(true) => {}
                    Ok(false) => log::warn!("heartbeat {n} rejected"),
                    Err(Error::Busy) => log::trace!("heartbeat {n} skipped, prefix busy"),
                    Err(Error::SideNotReady(side)) => {
                        log::debug!("heartbeat {n} skipped, {side} side not ready");
                    }
                    Err(err) => log::warn!("heartbeat {n} failed: {err}"),
                }
            }
        });
        if let Some(previous) = self.heartbeat.lock().unwrap().replace(task) {
            previous.abort();
        }
    }

    /// Stops the background heartbeat, if running.
    pub fn stop_heartbeat(&self) {
        if let Some(task) = self.heartbeat.lock().unwrap().take() {
            task.abort();
        }
    }

    /// Removes a listener registered by any of the `on_*` helpers (or
    /// [`Engine::add_listener`]) by its id.
    pub fn remove_listener(&self, id: &str) -> bool {
        self.engine.remove_listener(id)
    }

    /// Double tap on either temple.
    pub fn on_double_tap<F>(&self, handler: F)
    where
        F: Fn(bool, Side) + Send + Sync + 'static,
    {
        self.engine.add_listener("double-tap", event::DoubleTap, handler);
    }

    /// Single tap on either temple.
    pub fn on_single_tap<F>(&self, handler: F)
    where
        F: Fn(bool, Side) + Send + Sync + 'static,
    {
        self.engine.add_listener("single-tap", event::SingleTap, handler);
    }

    /// Triple tap on either temple.
    pub fn on_triple_tap<F>(&self, handler: F)
    where
        F: Fn(bool, Side) + Send + Sync + 'static,
    {
        self.engine.add_listener("triple-tap", event::TripleTap, handler);
    }

    /// Long press in progress.
    pub fn on_long_press_held<F>(&self, handler: F)
    where
        F: Fn(bool, Side) + Send + Sync + 'static,
    {
        self.engine
            .add_listener("long-press-held", event::LongPressHeld, handler);
    }

    /// Long press released.
    pub fn on_long_press_release<F>(&self, handler: F)
    where
        F: Fn(bool, Side) + Send + Sync + 'static,
    {
        self.engine
            .add_listener("long-press-release", event::LongPressRelease, handler);
    }

    /// Pairing completed on the radio layer.
    pub fn on_ble_paired<F>(&self, handler: F)
    where
        F: Fn(bool, Side) + Send + Sync + 'static,
    {
        self.engine.add_listener("ble-paired", event::BlePaired, handler);
    }

    /// Case opened.
    pub fn on_case_open<F>(&self, handler: F)
    where
        F: Fn(bool, Side) + Send + Sync + 'static,
    {
        self.engine.add_listener("case-open", event::CaseOpen, handler);
    }

    /// Case closed.
    pub fn on_case_closed<F>(&self, handler: F)
    where
        F: Fn(bool, Side) + Send + Sync + 'static,
    {
        self.engine.add_listener("case-closed", event::CaseClosed, handler);
    }

    /// Case started charging.
    pub fn on_case_charging<F>(&self, handler: F)
    where
        F: Fn(bool, Side) + Send + Sync + 'static,
    {
        self.engine
            .add_listener("case-charging", event::CaseCharging, handler);
    }

    /// Case battery percentage reports.
    pub fn on_case_battery<F>(&self, handler: F)
    where
        F: Fn(u8, Side) + Send + Sync + 'static,
    {
        self.engine
            .add_listener("case-battery", event::CaseBattery, handler);
    }

    /// Glasses battery percentage reports.
    pub fn on_glasses_battery<F>(&self, handler: F)
    where
        F: Fn(u8, Side) + Send + Sync + 'static,
    {
        self.engine
            .add_listener("glasses-battery", event::GlassesBattery, handler);
    }

    /// Streamed microphone frames (enable with
    /// [`set_microphone_enabled`](Glasses::set_microphone_enabled)).
    pub fn on_mic_audio<F>(&self, handler: F)
    where
        F: Fn(AudioFrame, Side) + Send + Sync + 'static,
    {
        self.engine.add_listener("mic-audio", event::MicAudio, handler);
    }
}

impl Drop for Glasses {
    fn drop(&mut self) {
        self.stop_heartbeat();
    }
}
