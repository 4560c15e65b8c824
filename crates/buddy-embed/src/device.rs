use candle_core::Device;
use tracing::info;

/// CPU unless built with `metal` and a GPU is present. `APP_EMBED_CPU=1` forces CPU.
pub fn select_device() -> Device {
    let force_cpu = std::env::var("APP_EMBED_CPU").is_ok_and(|v| v == "1");
    #[cfg(feature = "metal")]
    {
        if !force_cpu {
            match Device::new_metal(0) {
                Ok(dev) => {
                    info!("embedding on Metal");
                    return dev;
                }
                Err(e) => tracing::warn!(error = %e, "Metal unavailable, using CPU"),
            }
        }
    }
    info!(force_cpu, "embedding on CPU");
    Device::Cpu
}
