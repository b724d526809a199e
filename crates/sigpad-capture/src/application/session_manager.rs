//! SessionManager: the pad connection state machine.
//!
//! Owns the path from "nothing attached" to a live [`Session`]:
//!
//! ```text
//! Idle → WaitingForService → WaitingForComponent → DiscoveringDevice
//!      → Connecting → Connected
//!                   ↘ Faulted(ComponentNotReady)   (single auto-recovery)
//! ```
//!
//! Service readiness is polled on a timer with a bounded budget; the first
//! poll is delayed by a short interval and subsequent polls by a longer one.
//! Of the whole fault taxonomy, only [`SessionError::ComponentNotReady`] is
//! recovered automatically: one `reinitialize` to the bridge followed by one
//! rescheduled connection attempt.  Every other fault returns the manager to
//! `Idle` and waits for the caller to retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use sigpad_core::{DeviceCapability, DeviceDescriptor, InkThreshold};

use crate::infrastructure::bridge::{
    BridgeError, DeviceBridge, DeviceSession, EncryptionHandler,
};

/// Error type for connection setup; a closed fault set so the recovery
/// dispatcher can match exhaustively and new kinds cannot silently fall
/// through to generic handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The bridge service never reported ready within the retry budget.
    #[error("bridge service not ready after {attempts} readiness polls")]
    ServiceUnavailable { attempts: u32 },

    /// The bridge's device-control component is not ready.  The one fault
    /// kind eligible for automatic recovery.
    #[error("device-control component not ready")]
    ComponentNotReady,

    /// Discovery returned an empty device list.
    #[error("no pad devices found")]
    NoDeviceFound,

    /// The first discovered device is not a supported pad model.
    #[error("device {vendor_id:04x}:{product_id:04x} is not a supported pad")]
    UnsupportedDevice { vendor_id: u16, product_id: u16 },

    /// The bridge refused the exclusive device lock.
    #[error("exclusive device lock failed: {0}")]
    ExclusiveLockFailed(String),

    /// A bridge transport failure outside the specific kinds above.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Readiness polling budget, driven entirely by the timer abstraction so it
/// is testable under a paused clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum failed polls before the final check gives up.
    pub max_retries: u32,
    /// Delay before the first poll.
    pub short_delay: Duration,
    /// Delay between subsequent polls and before the post-reinitialize
    /// reattempt.
    pub long_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 20,
            short_delay: Duration::from_millis(500),
            long_delay: Duration::from_millis(1000),
        }
    }
}

/// Connection state, exposed for diagnostics and asserted on in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    WaitingForService,
    WaitingForComponent,
    DiscoveringDevice,
    Connecting,
    Connected,
    Faulted(SessionError),
}

/// A live logical session with a connected pad.
///
/// Bundles the device identity with the capability and ink-threshold
/// snapshots fetched at connect time.  Snapshots are immutable for the
/// session's lifetime; a new session always re-fetches them.
pub struct Session {
    id: Uuid,
    device: DeviceDescriptor,
    capability: DeviceCapability,
    threshold: InkThreshold,
    handle: Arc<dyn DeviceSession>,
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    pub fn capability(&self) -> DeviceCapability {
        self.capability
    }

    pub fn ink_threshold(&self) -> InkThreshold {
        self.threshold
    }

    /// The underlying bridge session handle.
    pub fn handle(&self) -> &Arc<dyn DeviceSession> {
        &self.handle
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("device", &self.device)
            .field("capability", &self.capability)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

/// The connection state machine.
pub struct SessionManager {
    bridge: Arc<dyn DeviceBridge>,
    retry: RetryPolicy,
    state: ConnectionState,
    encryption: Option<Arc<dyn EncryptionHandler>>,
    encryption2: Option<Arc<dyn EncryptionHandler>>,
}

impl SessionManager {
    pub fn new(bridge: Arc<dyn DeviceBridge>, retry: RetryPolicy) -> Self {
        Self {
            bridge,
            retry,
            state: ConnectionState::Idle,
            encryption: None,
            encryption2: None,
        }
    }

    /// Installs up to two encryption handlers passed through to session
    /// construction.  Without handlers the session is built unencrypted,
    /// which is the bridge's own default.
    pub fn with_encryption(
        mut self,
        primary: Option<Arc<dyn EncryptionHandler>>,
        secondary: Option<Arc<dyn EncryptionHandler>>,
    ) -> Self {
        self.encryption = primary;
        self.encryption2 = secondary;
        self
    }

    /// Current state of the connection machine.
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Runs the connection machine to completion and returns the session.
    ///
    /// Applies the recovery policy: a `ComponentNotReady` fault triggers
    /// exactly one bridge reinitialize and exactly one rescheduled attempt
    /// after the long delay.  All other faults are returned to the caller
    /// for explicit re-invocation.
    ///
    /// # Errors
    ///
    /// Any [`SessionError`] variant; see the per-step mapping in
    /// [`Self::connect_once`].
    pub async fn connect(&mut self) -> Result<Session, SessionError> {
        match self.connect_once().await {
            Ok(session) => Ok(session),
            // The recovery dispatcher matches the whole fault set so a new
            // variant cannot silently reach a catch-all arm.
            Err(SessionError::ComponentNotReady) => {
                warn!("device-control component not ready; reinitializing bridge");
                if let Err(e) = self.bridge.reinitialize().await {
                    debug!("bridge reinitialize failed: {e}");
                }
                sleep(self.retry.long_delay).await;
                self.connect_once().await
            }
            Err(
                fault @ (SessionError::ServiceUnavailable { .. }
                | SessionError::NoDeviceFound
                | SessionError::UnsupportedDevice { .. }
                | SessionError::ExclusiveLockFailed(_)
                | SessionError::Bridge(_)),
            ) => Err(fault),
        }
    }

    /// One pass through the state machine, without recovery.
    async fn connect_once(&mut self) -> Result<Session, SessionError> {
        let result = self.drive().await;
        self.state = match &result {
            Ok(_) => ConnectionState::Connected,
            Err(fault @ SessionError::ComponentNotReady) => {
                ConnectionState::Faulted(fault.clone())
            }
            // Terminal faults return the machine to Idle; the caller decides
            // whether to try again.
            Err(_) => ConnectionState::Idle,
        };
        result
    }

    async fn drive(&mut self) -> Result<Session, SessionError> {
        self.state = ConnectionState::WaitingForService;
        self.wait_for_service().await?;
        debug!("bridge service ready");

        self.state = ConnectionState::WaitingForComponent;
        if !self.bridge.is_component_ready().await {
            return Err(SessionError::ComponentNotReady);
        }
        debug!("device-control component ready");

        self.state = ConnectionState::DiscoveringDevice;
        let devices = self.bridge.list_devices().await?;
        // Single-device deployment assumption: take the first listed pad.
        let device = devices
            .into_iter()
            .next()
            .ok_or(SessionError::NoDeviceFound)?;
        info!(
            device = %device.name,
            vendor_id = device.vendor_id,
            product_id = device.product_id,
            "pad discovered"
        );

        if !self
            .bridge
            .is_supported_device(device.vendor_id, device.product_id)
            .await
        {
            return Err(SessionError::UnsupportedDevice {
                vendor_id: device.vendor_id,
                product_id: device.product_id,
            });
        }

        self.state = ConnectionState::Connecting;
        let interface = self
            .bridge
            .open_interface(&device, true)
            .await
            .map_err(|e| match e {
                BridgeError::LockDenied(reason) => SessionError::ExclusiveLockFailed(reason),
                other => SessionError::Bridge(other),
            })?;

        let handle = self
            .bridge
            .create_session(
                interface,
                self.encryption.clone(),
                self.encryption2.clone(),
            )
            .await?;

        // Capability fetch doubles as the connection smoke test.
        let capability = handle.capability().await?;
        let threshold = handle.ink_threshold().await?;
        handle.set_clear_screen().await?;

        let session = Session {
            id: Uuid::new_v4(),
            device,
            capability,
            threshold,
            handle,
        };
        info!(
            session = %session.id,
            max_x = capability.max_x,
            max_y = capability.max_y,
            screen_width = capability.screen_width,
            screen_height = capability.screen_height,
            "pad connected"
        );
        Ok(session)
    }

    /// Polls bridge readiness within the retry budget.
    ///
    /// The first poll runs after `short_delay`; each subsequent poll after
    /// `long_delay`.  With a budget of N, the (N+1)-th failed poll yields
    /// `ServiceUnavailable` instead of scheduling another timer.
    async fn wait_for_service(&self) -> Result<(), SessionError> {
        sleep(self.retry.short_delay).await;
        let mut attempt = 0u32;
        loop {
            if self.bridge.is_service_ready().await {
                return Ok(());
            }
            if attempt >= self.retry.max_retries {
                return Err(SessionError::ServiceUnavailable {
                    attempts: attempt + 1,
                });
            }
            attempt += 1;
            sleep(self.retry.long_delay).await;
        }
    }

    /// Releases the bridge resource on shutdown.
    ///
    /// Best-effort: failures are logged and swallowed, since no further
    /// interaction with the bridge is possible at this point.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.bridge.close().await {
            debug!("bridge close failed during shutdown: {e}");
        }
        self.state = ConnectionState::Idle;
    }
}
