//! Simulated bridge backing the interactive binary.
//!
//! Behaves like a healthy service bridge with one supported pad attached.
//! When reporting starts, a background task replays a canned signature at
//! roughly pad rate so the whole capture pipeline can be exercised end to
//! end without hardware.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use sigpad_core::{DeviceCapability, DeviceDescriptor, InkThreshold, PenReport, PenSample};

use super::{
    BridgeError, DeviceBridge, DeviceSession, EncryptionHandler, InkingMode, PadInterface,
};

/// Interval between replayed pen reports (~200 Hz, the pad's report rate).
const REPORT_INTERVAL: Duration = Duration::from_millis(5);

struct SimulatedInterface {
    descriptor: DeviceDescriptor,
}

impl PadInterface for SimulatedInterface {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }
}

/// A [`DeviceBridge`] with one synthetic pad permanently attached.
pub struct SimulatedBridge {
    device: DeviceDescriptor,
}

impl SimulatedBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            device: DeviceDescriptor {
                vendor_id: 0x056a,
                product_id: 0x00a8,
                name: "Simulated STU-540".to_string(),
            },
        })
    }
}

#[async_trait]
impl DeviceBridge for SimulatedBridge {
    async fn is_service_ready(&self) -> bool {
        true
    }

    async fn is_component_ready(&self) -> bool {
        true
    }

    async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, BridgeError> {
        Ok(vec![self.device.clone()])
    }

    async fn is_supported_device(&self, vendor_id: u16, product_id: u16) -> bool {
        (vendor_id, product_id) == (self.device.vendor_id, self.device.product_id)
    }

    async fn open_interface(
        &self,
        device: &DeviceDescriptor,
        _exclusive: bool,
    ) -> Result<Box<dyn PadInterface>, BridgeError> {
        Ok(Box::new(SimulatedInterface {
            descriptor: device.clone(),
        }))
    }

    async fn create_session(
        &self,
        interface: Box<dyn PadInterface>,
        _encryption: Option<Arc<dyn EncryptionHandler>>,
        _encryption2: Option<Arc<dyn EncryptionHandler>>,
    ) -> Result<Arc<dyn DeviceSession>, BridgeError> {
        debug!(device = %interface.descriptor().name, "simulated session created");
        Ok(Arc::new(SimulatedSession {
            playback: Mutex::new(None),
        }))
    }

    async fn reinitialize(&self) -> Result<(), BridgeError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), BridgeError> {
        Ok(())
    }
}

struct SimulatedSession {
    playback: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

#[async_trait]
impl DeviceSession for SimulatedSession {
    async fn capability(&self) -> Result<DeviceCapability, BridgeError> {
        Ok(DeviceCapability {
            max_x: 10800,
            max_y: 6480,
            screen_width: 800,
            screen_height: 480,
        })
    }

    async fn ink_threshold(&self) -> Result<InkThreshold, BridgeError> {
        Ok(InkThreshold {
            on_pressure_mark: 21,
            off_pressure_mark: 18,
        })
    }

    async fn set_clear_screen(&self) -> Result<(), BridgeError> {
        debug!("simulated pad: clear screen");
        Ok(())
    }

    async fn set_inking_mode(&self, mode: InkingMode) -> Result<(), BridgeError> {
        debug!(?mode, "simulated pad: inking mode");
        Ok(())
    }

    async fn start_reporting(&self) -> Result<mpsc::Receiver<PenReport>, BridgeError> {
        let (tx, rx) = mpsc::channel(64);

        let handle = tokio::spawn(async move {
            for report in canned_signature() {
                if tx.send(report).await.is_err() {
                    return; // subscriber gone
                }
                tokio::time::sleep(REPORT_INTERVAL).await;
            }
        });

        let mut playback = self.playback.lock().expect("lock poisoned");
        if let Some(previous) = playback.replace(handle) {
            previous.abort();
        }
        Ok(rx)
    }
}

impl Drop for SimulatedSession {
    fn drop(&mut self) {
        if let Some(handle) = self.playback.lock().expect("lock poisoned").take() {
            handle.abort();
        }
    }
}

/// A two-stroke looping scribble spanning most of the digitizer area.
fn canned_signature() -> Vec<PenReport> {
    let mut reports = Vec::new();
    let mut time = 0u32;
    let mut push = |x: u16, y: u16, pressure: u16, reports: &mut Vec<PenReport>| {
        reports.push(PenReport::TimeCountSequence {
            sample: PenSample {
                x,
                y,
                pressure,
                time,
            },
            sequence: time as u16,
        });
        time += 1;
    };

    // Stroke 1: a sine sweep left to right.
    for i in 0..200u32 {
        let x = 500 + i * 45;
        let y = 3200.0 + 1800.0 * (i as f64 / 18.0).sin();
        push(x as u16, y as u16, 320, &mut reports);
    }
    push(9500, 3200, 0, &mut reports);

    // Hover back to the start of the second stroke.
    push(2000, 4800, 0, &mut reports);

    // Stroke 2: a short underline.
    for i in 0..80u32 {
        push((2000 + i * 80) as u16, 4800, 280, &mut reports);
    }
    push(8400, 4800, 0, &mut reports);

    reports
}
