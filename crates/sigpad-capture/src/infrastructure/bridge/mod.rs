//! Device bridge infrastructure.
//!
//! A pad is never opened directly: all access goes through an intermediary
//! service bridge that owns the USB transport and the pad's device-control
//! component.  This module defines the trait seam for that external
//! collaborator ([`DeviceBridge`] / [`DeviceSession`]), mirroring the bridge
//! operations one-to-one so the session state machine in the application
//! layer stays transport-agnostic.
//!
//! # Testability
//!
//! The concrete transport (a local WebSocket service in production) lives
//! outside this repository.  [`mock::MockBridge`] gives tests a fully
//! scriptable bridge; [`simulated::SimulatedBridge`] backs the interactive
//! binary with a synthetic pad that replays a canned signature.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use sigpad_core::{DeviceCapability, DeviceDescriptor, InkThreshold, PenReport};

pub mod mock;
pub mod simulated;

/// Error type for bridge transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    /// The bridge transport failed (service gone, protocol error, ...).
    #[error("bridge transport failure: {0}")]
    Transport(String),

    /// The bridge refused to grant the exclusive device lock.
    #[error("device lock denied: {0}")]
    LockDenied(String),

    /// The logical device session has been closed.
    #[error("device session closed")]
    SessionClosed,
}

/// On-device ink rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InkingMode {
    On,
    Off,
}

/// Optional cryptographic handler handed to session construction.
///
/// The bridge accepts up to two handlers; when omitted the session is built
/// without encryption, matching the bridge's own default.
pub trait EncryptionHandler: Send + Sync {
    /// Identifier used by the bridge to select the cipher suite.
    fn name(&self) -> &str;
}

/// An opened low-level pad interface holding the exclusive device lock.
///
/// Opaque to the application layer: its only purpose is to be exchanged for
/// a logical [`DeviceSession`].  Dropping it releases the lock.
pub trait PadInterface: Send {
    /// The device this interface is locked to.
    fn descriptor(&self) -> &DeviceDescriptor;
}

/// The service bridge as seen by the session state machine.
#[async_trait]
pub trait DeviceBridge: Send + Sync {
    /// Whether the bridge service itself answers.
    async fn is_service_ready(&self) -> bool;

    /// Whether the bridge's device-control component is ready.
    async fn is_component_ready(&self) -> bool;

    /// Lists currently attached pads.
    async fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, BridgeError>;

    /// Whether the given vendor/product pair is a supported pad model.
    async fn is_supported_device(&self, vendor_id: u16, product_id: u16) -> bool;

    /// Opens the low-level interface to `device`.
    ///
    /// With `exclusive` set, no other bridge client may hold the device
    /// concurrently; denial surfaces as [`BridgeError::LockDenied`].
    async fn open_interface(
        &self,
        device: &DeviceDescriptor,
        exclusive: bool,
    ) -> Result<Box<dyn PadInterface>, BridgeError>;

    /// Builds the logical device session atop a locked interface.
    async fn create_session(
        &self,
        interface: Box<dyn PadInterface>,
        encryption: Option<Arc<dyn EncryptionHandler>>,
        encryption2: Option<Arc<dyn EncryptionHandler>>,
    ) -> Result<Arc<dyn DeviceSession>, BridgeError>;

    /// Asks the bridge to reinitialize its device-control component.
    ///
    /// Issued once when connection setup finds the component not ready.
    async fn reinitialize(&self) -> Result<(), BridgeError>;

    /// Releases the bridge resource.  Best-effort; called on shutdown.
    async fn close(&self) -> Result<(), BridgeError>;
}

/// A logical session with a connected pad.
#[async_trait]
pub trait DeviceSession: Send + Sync {
    /// Fetches the pad's geometric capability.
    async fn capability(&self) -> Result<DeviceCapability, BridgeError>;

    /// Fetches the pad's pressure threshold pair.
    async fn ink_threshold(&self) -> Result<InkThreshold, BridgeError>;

    /// Blanks the pad's on-surface display.
    async fn set_clear_screen(&self) -> Result<(), BridgeError>;

    /// Enables or disables ink rendering on the pad's own display.
    async fn set_inking_mode(&self, mode: InkingMode) -> Result<(), BridgeError>;

    /// Subscribes to the pen report stream.
    ///
    /// Reports arrive in pad order on a single-consumer channel; a fresh
    /// subscription supersedes any previous one.
    async fn start_reporting(&self) -> Result<mpsc::Receiver<PenReport>, BridgeError>;
}
