//! Audio endpoint discovery
//!
//! Only the identity of the default endpoint is resolved here. The encoder
//! opens the device itself; no samples pass through this crate.

use crate::error::Result;
use crate::types::{AudioEndpointDescriptor, AudioFlow};

/// Resolves default audio endpoints
pub trait DeviceAudioResolver: Send {
    /// Default capture endpoint for `Capture`, default render endpoint
    /// (for loopback) for `Render`
    ///
    /// Fails with `ReelError::NoAudioDevice` when the OS reports none.
    fn resolve(&self, flow: AudioFlow) -> Result<AudioEndpointDescriptor>;

    /// Names of all endpoints with the given direction
    fn list(&self, flow: AudioFlow) -> Result<Vec<String>>;
}

#[cfg(windows)]
pub use cpal_backend::CpalAudioResolver;

#[cfg(windows)]
mod cpal_backend {
    use cpal::traits::{DeviceTrait, HostTrait};
    use cpal::{Device, StreamConfig};
    use tracing::{debug, warn};

    use super::DeviceAudioResolver;
    use crate::error::{ReelError, Result};
    use crate::types::{AudioEndpointDescriptor, AudioFlow};

    /// WASAPI endpoint lookup through cpal's default host
    #[derive(Debug, Default)]
    pub struct CpalAudioResolver;

    fn device_name(device: &Device) -> Option<String> {
        device.description().ok().map(|d| d.name().to_string())
    }

    impl DeviceAudioResolver for CpalAudioResolver {
        fn resolve(&self, flow: AudioFlow) -> Result<AudioEndpointDescriptor> {
            let host = cpal::default_host();
            let device = match flow {
                AudioFlow::Capture => host.default_input_device(),
                AudioFlow::Render => host.default_output_device(),
            }
            .ok_or_else(|| ReelError::NoAudioDevice(format!("no default {} endpoint", flow)))?;

            let name = device_name(&device).ok_or_else(|| {
                ReelError::NoAudioDevice(format!("default {} endpoint has no name", flow))
            })?;

            let supported = match flow {
                AudioFlow::Capture => device.default_input_config(),
                AudioFlow::Render => device.default_output_config(),
            };
            let (channels, sample_rate) = match supported {
                Ok(supported) => {
                    let config: StreamConfig = supported.into();
                    (Some(config.channels), Some(config.sample_rate))
                }
                Err(e) => {
                    warn!("No default format for '{}': {}", name, e);
                    (None, None)
                }
            };

            let descriptor = AudioEndpointDescriptor {
                name,
                flow,
                channels,
                sample_rate,
            };
            debug!("Resolved audio endpoint: {}", descriptor);
            Ok(descriptor)
        }

        fn list(&self, flow: AudioFlow) -> Result<Vec<String>> {
            let host = cpal::default_host();
            let enumeration_failed =
                |e: cpal::DevicesError| ReelError::NoAudioDevice(format!("enumeration failed: {}", e));
            let names = match flow {
                AudioFlow::Capture => host
                    .input_devices()
                    .map_err(enumeration_failed)?
                    .filter_map(|d| device_name(&d))
                    .collect(),
                AudioFlow::Render => host
                    .output_devices()
                    .map_err(enumeration_failed)?
                    .filter_map(|d| device_name(&d))
                    .collect(),
            };
            Ok(names)
        }
    }
}
