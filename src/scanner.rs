//! HID barcode scanner reader session.
//!
//! Each connected scanner gets a dedicated reader thread doing blocking HID
//! reads (blocking I/O stays off the async runtime). Incoming bytes are
//! accumulated and split into frames on CR / LF / ETX terminators; each
//! complete frame goes through the barcode decoder and is emitted as a
//! `barcode-scanned` event.
//!
//! Key design goals:
//! - **Background reader**: one thread per scanner, joined on stop
//! - **Non-fatal errors**: read failures emit `scanner-error` and back off,
//!   they never kill the session
//! - **Bounded buffer**: a stuck stream cannot grow the frame buffer forever

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{info, warn};

use crate::barcode;
use crate::capability::HidStream;
use crate::events::{EventBus, HardwareEvent};

/// Read timeout per poll; also bounds how fast `stop` is observed.
const READ_TIMEOUT_MS: u64 = 50;

/// Backoff after a read error before trying again.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Frame buffer cap — anything past this without a terminator is garbage.
const MAX_FRAME_BUF: usize = 512;

/// Frame terminators scanners commonly append: LF, CR, ETX.
fn is_terminator(byte: u8) -> bool {
    matches!(byte, b'\n' | b'\r' | 0x03)
}

/// Drain every complete frame out of `buf`, leaving a partial tail in place.
fn split_frames(buf: &mut Vec<u8>) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    while let Some(pos) = buf.iter().position(|&b| is_terminator(b)) {
        let mut frame: Vec<u8> = buf.drain(..=pos).collect();
        frame.pop(); // drop the terminator itself
        if !frame.is_empty() {
            frames.push(frame);
        }
    }
    if buf.len() > MAX_FRAME_BUF {
        warn!(len = buf.len(), "Scanner frame buffer overflow — discarding");
        buf.clear();
    }
    frames
}

/// A running reader bound to one connected scanner.
pub struct ScannerSession {
    device_id: String,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ScannerSession {
    /// Spawn the reader thread over an opened HID stream.
    pub fn start(device_id: &str, mut stream: Box<dyn HidStream>, events: EventBus) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let id = device_id.to_string();
        let thread_id = id.clone();

        let handle = std::thread::spawn(move || {
            info!(device = %thread_id, "Scanner reader started");
            let mut frame_buf: Vec<u8> = Vec::new();
            let mut buf = [0u8; 256];

            while flag.load(Ordering::SeqCst) {
                match stream.read(&mut buf, READ_TIMEOUT_MS) {
                    Ok(0) => continue,
                    Ok(n) => {
                        frame_buf.extend_from_slice(&buf[..n]);
                        for frame in split_frames(&mut frame_buf) {
                            if let Some(result) = barcode::decode(&frame) {
                                info!(
                                    device = %thread_id,
                                    barcode = %result.barcode,
                                    valid = result.is_valid,
                                    "Barcode scanned"
                                );
                                events.emit(HardwareEvent::BarcodeScanned(result));
                            }
                        }
                    }
                    Err(e) => {
                        warn!(device = %thread_id, error = %e, "Scanner read error");
                        events.emit(HardwareEvent::ScannerError {
                            device_id: thread_id.clone(),
                            message: e.to_string(),
                        });
                        std::thread::sleep(ERROR_BACKOFF);
                    }
                }
            }
            info!(device = %thread_id, "Scanner reader stopped");
        });

        Self {
            device_id: id,
            running,
            handle: Some(handle),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Signal the reader to stop and wait for the thread to exit.
    /// Safe to call more than once.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ScannerSession {
    fn drop(&mut self) {
        self.stop();
    }
}

// ===========================================================================
// Tests
// ===========================================================================
