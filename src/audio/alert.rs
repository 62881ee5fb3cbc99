// Audible alert played while the session is paused by a noise warning

use anyhow::{anyhow, Context, Result};
use rodio::{Decoder, OutputStream, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::{
    mpsc::{self, Sender},
    Mutex,
};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// External alert side effect
pub trait AlertPlayer: Send + Sync {
    /// Start the alert. Calling it while already playing does nothing.
    fn play(&self) -> Result<()>;

    /// Silence the alert and rewind it. Always safe to call.
    fn stop(&self) -> Result<()>;
}

/// Alert player that only logs; used headless or with `--silent`
#[derive(Debug, Default)]
pub struct SilentAlertPlayer;

impl AlertPlayer for SilentAlertPlayer {
    fn play(&self) -> Result<()> {
        info!("Alert requested (silent mode)");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        debug!("Alert stop requested (silent mode)");
        Ok(())
    }
}

enum AlertCommand {
    Play,
    Stop,
}

/// Plays a looping alert through the default output device
///
/// rodio output streams are not Send, so playback runs on a dedicated
/// "alert-audio" thread fed by a command channel.
pub struct RodioAlertPlayer {
    tx: Mutex<Option<Sender<AlertCommand>>>,
    sound_path: Option<PathBuf>,
    volume: f32,
}

impl RodioAlertPlayer {
    /// `sound_path` is looped when set; otherwise a generated chime plays
    pub fn new(sound_path: Option<PathBuf>, volume: f32) -> Self {
        Self {
            tx: Mutex::new(None),
            sound_path,
            volume: volume.clamp(0.0, 1.0),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AlertCommand>> {
        let mut guard = self
            .tx
            .lock()
            .map_err(|_| anyhow!("alert player state poisoned"))?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AlertCommand>();
        let sound_path = self.sound_path.clone();
        let volume = self.volume;

        thread::Builder::new()
            .name("alert-audio".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AlertCommand::Play => {
                            if sink.as_ref().is_some_and(|s| !s.empty()) {
                                continue;
                            }
                            match open_alert(sound_path.as_ref(), volume) {
                                Ok((stream, new_sink)) => {
                                    _stream = Some(stream);
                                    sink = Some(new_sink);
                                    info!("Alert playback started");
                                }
                                Err(e) => warn!("Alert playback failed: {:#}", e),
                            }
                        }
                        AlertCommand::Stop => {
                            if let Some(old) = sink.take() {
                                old.stop();
                                info!("Alert playback stopped");
                            }
                            _stream = None;
                        }
                    }
                }
            })
            .context("Failed to spawn alert audio thread")?;

        *guard = Some(tx.clone());
        Ok(tx)
    }
}

impl AlertPlayer for RodioAlertPlayer {
    fn play(&self) -> Result<()> {
        let tx = self.ensure_thread()?;
        tx.send(AlertCommand::Play)
            .map_err(|_| anyhow!("alert audio thread has exited"))
    }

    fn stop(&self) -> Result<()> {
        // Never started means nothing to silence
        if let Ok(Some(tx)) = self.tx.lock().map(|g| g.clone()) {
            let _ = tx.send(AlertCommand::Stop);
        }
        Ok(())
    }
}

fn open_alert(sound_path: Option<&PathBuf>, volume: f32) -> Result<(OutputStream, Sink)> {
    let (stream, handle) =
        OutputStream::try_default().context("Failed to create audio output stream")?;
    let sink = Sink::try_new(&handle).context("Failed to create audio sink")?;

    match sound_path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open alert sound {}", path.display()))?;
            let source = Decoder::new_looped(BufReader::new(file))
                .with_context(|| format!("Failed to decode alert sound {}", path.display()))?;
            sink.append(source);
        }
        None => sink.append(AlertChime::new()),
    }

    sink.set_volume(volume);
    sink.play();

    Ok((stream, sink))
}

/// Endless chime: 880 Hz beep for 250 ms, then 750 ms of silence
pub struct AlertChime {
    sample_rate: u32,
    position: u64,
}

impl AlertChime {
    const FREQUENCY_HZ: f32 = 880.0;
    const BEEP_MS: u64 = 250;
    const PERIOD_MS: u64 = 1000;

    pub fn new() -> Self {
        Self {
            sample_rate: 44100,
            position: 0,
        }
    }
}

impl Default for AlertChime {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for AlertChime {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let rate = self.sample_rate as u64;
        let period = rate * Self::PERIOD_MS / 1000;
        let beep = rate * Self::BEEP_MS / 1000;
        let offset = self.position % period;
        self.position = self.position.wrapping_add(1);

        if offset >= beep {
            return Some(0.0);
        }

        // Short linear fade at both ends to avoid clicks
        let fade = (rate / 200).max(1);
        let envelope = (offset.min(beep - offset) as f32 / fade as f32).min(1.0);
        let t = offset as f32 / self.sample_rate as f32;
        Some((2.0 * std::f32::consts::PI * Self::FREQUENCY_HZ * t).sin() * envelope * 0.5)
    }
}

impl Source for AlertChime {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1 // Mono
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
