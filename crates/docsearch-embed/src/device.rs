use candle_core::Device;

use crate::DeviceHint;

/// Pick the requested accelerator, falling back to CPU when it cannot be opened.
pub fn select_device(hint: DeviceHint) -> Device {
    let dev = match hint {
        DeviceHint::Cpu => None,
        DeviceHint::Metal => Device::new_metal(0).ok(),
        DeviceHint::Cuda => Device::new_cuda(0).ok(),
    };
    match dev {
        Some(d) => {
            tracing::info!(?hint, "using accelerator");
            d
        }
        None => {
            if hint != DeviceHint::Cpu {
                tracing::warn!(?hint, "accelerator unavailable, falling back to CPU");
            }
            Device::Cpu
        }
    }
}
