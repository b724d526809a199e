//! Scriptable mock bridge for unit and integration testing.
//!
//! Lets tests script every answer the real service bridge could give —
//! readiness timing, device listings, lock denial — and inspect every call
//! the session state machine makes, without a pad or a running bridge
//! service.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use sigpad_core::{DeviceCapability, DeviceDescriptor, InkThreshold, PenReport};

use super::{
    BridgeError, DeviceBridge, DeviceSession, EncryptionHandler, InkingMode, PadInterface,
};

/// A command observed by the mock pad, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadCommand {
    ClearScreen,
    InkingOn,
    InkingOff,
    StartReporting,
}

/// Scripted behaviour of a [`MockBridge`].
#[derive(Debug, Clone)]
pub struct MockBridgeScript {
    /// Number of `is_service_ready` polls that answer `false` before the
    /// service reports ready.  `None` means the service never becomes ready.
    pub service_ready_after_polls: Option<u32>,
    /// Component readiness before any reinitialize call.
    pub component_ready: bool,
    /// Component readiness after a reinitialize call.
    pub component_ready_after_reinit: bool,
    /// Devices returned by discovery.
    pub devices: Vec<DeviceDescriptor>,
    /// Vendor/product pairs accepted as supported.
    pub supported: Vec<(u16, u16)>,
    /// Whether the exclusive lock request is denied.
    pub deny_lock: bool,
    /// Capability reported by sessions.
    pub capability: DeviceCapability,
    /// Ink threshold reported by sessions.
    pub threshold: InkThreshold,
}

impl Default for MockBridgeScript {
    fn default() -> Self {
        let device = DeviceDescriptor {
            vendor_id: 0x056a,
            product_id: 0x00a8,
            name: "Mock STU-540".to_string(),
        };
        Self {
            service_ready_after_polls: Some(0),
            component_ready: true,
            component_ready_after_reinit: true,
            devices: vec![device],
            supported: vec![(0x056a, 0x00a8)],
            deny_lock: false,
            capability: DeviceCapability {
                max_x: 10000,
                max_y: 10000,
                screen_width: 800,
                screen_height: 480,
            },
            threshold: InkThreshold {
                on_pressure_mark: 50,
                off_pressure_mark: 30,
            },
        }
    }
}

struct MockInterface {
    descriptor: DeviceDescriptor,
}

impl PadInterface for MockInterface {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }
}

/// Mutable call-tracking state shared between the mock and its inspector.
#[derive(Default)]
struct MockState {
    service_polls: u32,
    reinitialize_calls: u32,
    close_calls: u32,
    encryption_names: Vec<String>,
    last_session: Option<Arc<MockDeviceSession>>,
}

/// A scriptable [`DeviceBridge`] implementation.
pub struct MockBridge {
    script: MockBridgeScript,
    state: Mutex<MockState>,
}

impl MockBridge {
    pub fn new(script: MockBridgeScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            state: Mutex::new(MockState::default()),
        })
    }

    /// Number of `is_service_ready` polls observed so far.
    pub fn service_polls(&self) -> u32 {
        self.state.lock().expect("lock poisoned").service_polls
    }

    /// Number of `reinitialize` calls observed so far.
    pub fn reinitialize_calls(&self) -> u32 {
        self.state.lock().expect("lock poisoned").reinitialize_calls
    }

    /// Number of `close` calls observed so far.
    pub fn close_calls(&self) -> u32 {
        self.state.lock().expect("lock poisoned").close_calls
    }

    /// Names of encryption handlers passed to `create_session`, in order.
    pub fn encryption_names(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("lock poisoned")
            .encryption_names
            .clone()
    }

    /// The most recently created session, for command-log inspection.
    pub fn last_session(&self) -> Option<Arc<MockDeviceSession>> {
        self.state.lock().expect("lock poisoned").last_session.clone()
    }
}

#[async_trait]
impl DeviceBridge for MockBridge {
    async fn is_service_ready(&self) -> bool {
        let mut state = self.state.lock().expect("lock poisoned");
        let poll = state.service_polls;
        state.service_polls += 1;
        match self.script.service_ready_after_polls {
            Some(after) => poll >= after,
            None => false,
        }
    }

    async fn is_component_ready(&self) -> bool {
        let reinitialized = self.reinitialize_calls() > 0;
        if reinitialized {
            self.script.component_ready_after_reinit
        } else {
            self.script.component_ready
        }
    }

    async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, BridgeError> {
        Ok(self.script.devices.clone())
    }

    async fn is_supported_device(&self, vendor_id: u16, product_id: u16) -> bool {
        self.script.supported.contains(&(vendor_id, product_id))
    }

    async fn open_interface(
        &self,
        device: &DeviceDescriptor,
        _exclusive: bool,
    ) -> Result<Box<dyn PadInterface>, BridgeError> {
        if self.script.deny_lock {
            return Err(BridgeError::LockDenied(format!(
                "device {:04x}:{:04x} held by another client",
                device.vendor_id, device.product_id
            )));
        }
        Ok(Box::new(MockInterface {
            descriptor: device.clone(),
        }))
    }

    async fn create_session(
        &self,
        interface: Box<dyn PadInterface>,
        encryption: Option<Arc<dyn EncryptionHandler>>,
        encryption2: Option<Arc<dyn EncryptionHandler>>,
    ) -> Result<Arc<dyn DeviceSession>, BridgeError> {
        let session = Arc::new(MockDeviceSession::new(
            interface.descriptor().clone(),
            self.script.capability,
            self.script.threshold,
        ));
        let mut state = self.state.lock().expect("lock poisoned");
        for handler in [encryption, encryption2].into_iter().flatten() {
            state.encryption_names.push(handler.name().to_string());
        }
        state.last_session = Some(Arc::clone(&session));
        Ok(session)
    }

    async fn reinitialize(&self) -> Result<(), BridgeError> {
        self.state.lock().expect("lock poisoned").reinitialize_calls += 1;
        Ok(())
    }

    async fn close(&self) -> Result<(), BridgeError> {
        self.state.lock().expect("lock poisoned").close_calls += 1;
        Ok(())
    }
}

/// Session half of the mock: records pad commands and lets tests feed the
/// pen report stream by hand.
pub struct MockDeviceSession {
    #[allow(dead_code)]
    descriptor: DeviceDescriptor,
    capability: DeviceCapability,
    threshold: InkThreshold,
    commands: Mutex<Vec<PadCommand>>,
    report_tx: Mutex<Option<mpsc::Sender<PenReport>>>,
}

impl MockDeviceSession {
    fn new(
        descriptor: DeviceDescriptor,
        capability: DeviceCapability,
        threshold: InkThreshold,
    ) -> Self {
        Self {
            descriptor,
            capability,
            threshold,
            commands: Mutex::new(Vec::new()),
            report_tx: Mutex::new(None),
        }
    }

    /// The pad commands observed so far, in call order.
    pub fn commands(&self) -> Vec<PadCommand> {
        self.commands.lock().expect("lock poisoned").clone()
    }

    /// Injects a pen report, as if streamed from hardware.
    ///
    /// Panics if `start_reporting` has not been called.
    pub async fn push_report(&self, report: PenReport) {
        let tx = self
            .report_tx
            .lock()
            .expect("lock poisoned")
            .clone()
            .expect("push_report called before start_reporting");
        tx.send(report)
            .await
            .expect("report receiver has been dropped");
    }

    /// Ends the report stream by dropping the sender.
    pub fn end_reporting(&self) {
        *self.report_tx.lock().expect("lock poisoned") = None;
    }

    fn record(&self, command: PadCommand) {
        self.commands.lock().expect("lock poisoned").push(command);
    }
}

#[async_trait]
impl DeviceSession for MockDeviceSession {
    async fn capability(&self) -> Result<DeviceCapability, BridgeError> {
        Ok(self.capability)
    }

    async fn ink_threshold(&self) -> Result<InkThreshold, BridgeError> {
        Ok(self.threshold)
    }

    async fn set_clear_screen(&self) -> Result<(), BridgeError> {
        self.record(PadCommand::ClearScreen);
        Ok(())
    }

    async fn set_inking_mode(&self, mode: InkingMode) -> Result<(), BridgeError> {
        self.record(match mode {
            InkingMode::On => PadCommand::InkingOn,
            InkingMode::Off => PadCommand::InkingOff,
        });
        Ok(())
    }

    async fn start_reporting(&self) -> Result<mpsc::Receiver<PenReport>, BridgeError> {
        self.record(PadCommand::StartReporting);
        let (tx, rx) = mpsc::channel(64);
        *self.report_tx.lock().expect("lock poisoned") = Some(tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigpad_core::PenSample;

    #[tokio::test]
    async fn test_mock_session_streams_injected_reports() {
        let bridge = MockBridge::new(MockBridgeScript::default());
        let device = bridge.list_devices().await.unwrap().remove(0);
        let interface = bridge.open_interface(&device, true).await.unwrap();
        let session = bridge.create_session(interface, None, None).await.unwrap();

        let mut rx = session.start_reporting().await.unwrap();
        let mock = bridge.last_session().unwrap();
        mock.push_report(PenReport::Basic(PenSample {
            x: 1,
            y: 2,
            pressure: 3,
            time: 4,
        }))
        .await;

        let report = rx.recv().await.expect("report");
        assert_eq!(report.sample().pressure, 3);
    }

    #[tokio::test]
    async fn test_end_reporting_closes_channel() {
        let bridge = MockBridge::new(MockBridgeScript::default());
        let device = bridge.list_devices().await.unwrap().remove(0);
        let interface = bridge.open_interface(&device, true).await.unwrap();
        let session = bridge.create_session(interface, None, None).await.unwrap();

        let mut rx = session.start_reporting().await.unwrap();
        bridge.last_session().unwrap().end_reporting();

        assert!(rx.recv().await.is_none(), "channel must close");
    }

    #[tokio::test]
    async fn test_service_readiness_script_counts_polls() {
        let script = MockBridgeScript {
            service_ready_after_polls: Some(2),
            ..Default::default()
        };
        let bridge = MockBridge::new(script);

        assert!(!bridge.is_service_ready().await);
        assert!(!bridge.is_service_ready().await);
        assert!(bridge.is_service_ready().await);
        assert_eq!(bridge.service_polls(), 3);
    }

    #[tokio::test]
    async fn test_lock_denial_surfaces_as_lock_denied() {
        let script = MockBridgeScript {
            deny_lock: true,
            ..Default::default()
        };
        let bridge = MockBridge::new(script);
        let device = bridge.list_devices().await.unwrap().remove(0);

        let result = bridge.open_interface(&device, true).await;
        assert!(matches!(result, Err(BridgeError::LockDenied(_))));
    }
}
