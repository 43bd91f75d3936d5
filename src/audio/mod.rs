pub mod cue;

use cue::CountCue;

use anyhow::{anyhow, Result};
use rodio::{OutputStream, Sink};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

const CUE_FREQ_HZ: f32 = 880.0;

/// Looping audio feedback played while the pose is held.
pub trait AudioCue: Send + Sync {
    fn play(&self) -> Result<()>;
    /// Pauses and rewinds so the next `play` starts the cue from the top.
    fn pause_and_rewind(&self) -> Result<()>;
    /// Releases the output device.
    fn stop(&self) -> Result<()>;
}

/// Used when audio is disabled or no output device exists.
pub struct SilentCue;

impl AudioCue for SilentCue {
    fn play(&self) -> Result<()> {
        Ok(())
    }

    fn pause_and_rewind(&self) -> Result<()> {
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        Ok(())
    }
}

enum AudioCommand {
    Play,
    PauseAndRewind,
    Stop,
}

pub struct AudioEngineHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
    volume: f32,
}

impl AudioEngineHandle {
    pub fn new(volume: f32) -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            volume: volume.clamp(0.0, 1.0),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>> {
        let mut guard = self
            .tx
            .lock()
            .map_err(|e| anyhow!("audio handle poisoned: {e}"))?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let initial_volume = self.volume;

        // rodio output objects are not Send, so they live on their own thread
        thread::Builder::new()
            .name("audio-cue".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;
                let volume = initial_volume;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                    volume: f32,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                        new_sink.set_volume(volume);
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Play => {
                            if let Err(err) = ensure_sink(&mut _stream, &mut sink, volume) {
                                log::warn!("{err}");
                                continue;
                            }
                            if let Some(ref s) = sink {
                                if s.empty() {
                                    s.append(CountCue::new(CUE_FREQ_HZ));
                                }
                                s.play();
                            }
                        }
                        AudioCommand::PauseAndRewind => {
                            if let Some(ref s) = sink {
                                s.pause();
                                s.clear();
                            }
                        }
                        AudioCommand::Stop => {
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            _stream = None;
                        }
                    }
                }
            })
            .map_err(|e| anyhow!("failed to spawn audio thread: {e}"))?;

        *guard = Some(tx.clone());
        Ok(tx)
    }
}

impl AudioCue for AudioEngineHandle {
    fn play(&self) -> Result<()> {
        let tx = self.ensure_thread()?;
        tx.send(AudioCommand::Play)
            .map_err(|e| anyhow!("audio thread gone: {e}"))
    }

    fn pause_and_rewind(&self) -> Result<()> {
        let tx = self.ensure_thread()?;
        tx.send(AudioCommand::PauseAndRewind)
            .map_err(|e| anyhow!("audio thread gone: {e}"))
    }

    fn stop(&self) -> Result<()> {
        if let Ok(Some(tx)) = self.tx.lock().map(|g| g.clone()) {
            let _ = tx.send(AudioCommand::Stop);
        }
        Ok(())
    }
}
