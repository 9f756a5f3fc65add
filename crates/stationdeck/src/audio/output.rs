//! Audio output device
//!
//! The device sink lives on a dedicated thread (cpal streams may be !Send);
//! handles connect to its mixer.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender};
use rodio::mixer::Mixer;
use rodio::DeviceSinkBuilder;
use tracing::info;

use crate::engine::{EventSender, HandleId, OutputHandle, Player};
use crate::error::{DeckError, Result};

use super::handle::RodioHandle;

/// `Player` that decodes with rodio and plays on the default output device
pub struct RodioPlayer {
    mixer: Mixer,
    shutdown_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl RodioPlayer {
    /// Open the default output device.
    ///
    /// Blocks until the device is initialized (or fails).
    pub fn new() -> Result<Self> {
        let (init_tx, init_rx) = bounded::<std::result::Result<Mixer, String>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        let thread = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let mut sink = match DeviceSinkBuilder::open_default_sink() {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = init_tx.send(Err(format!("Failed to open audio output: {}", e)));
                        return;
                    }
                };
                sink.log_on_drop(false);
                let _ = init_tx.send(Ok(sink.mixer().clone()));

                // Keep the device open until the player goes away
                let _ = shutdown_rx.recv();
            })
            .map_err(|e| DeckError::Audio(format!("Failed to spawn audio thread: {}", e)))?;

        let mixer = init_rx
            .recv()
            .map_err(|_| DeckError::Audio("Audio thread terminated during init".to_string()))?
            .map_err(DeckError::Audio)?;
        info!("audio output ready");

        Ok(Self {
            mixer,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        })
    }
}

impl Player for RodioPlayer {
    fn open(
        &self,
        locator: &str,
        id: HandleId,
        events: EventSender,
    ) -> Result<Box<dyn OutputHandle>> {
        Ok(Box::new(RodioHandle::open(&self.mixer, locator, id, events)?))
    }
}

impl Drop for RodioPlayer {
    fn drop(&mut self) {
        drop(self.shutdown_tx.take());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
