//! Host resource probes.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reports whether the host is currently too hot to take on work.
pub trait ThermalProbe: Send + Sync {
    fn is_throttled(&self) -> bool;
}

/// Reports free physical memory.
pub trait MemoryProbe: Send + Sync {
    fn free_memory_bytes(&self) -> io::Result<u64>;
}

/// Reads free RAM from the kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMemoryProbe;

impl MemoryProbe for SystemMemoryProbe {
    #[cfg(target_os = "linux")]
    fn free_memory_bytes(&self) -> io::Result<u64> {
        // SAFETY: `info` is zero-initialised and only read after sysinfo reports
        // success.
        unsafe {
            let mut info: libc::sysinfo = std::mem::zeroed();
            if libc::sysinfo(&mut info) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok((info.freeram as u64).saturating_mul(info.mem_unit as u64))
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn free_memory_bytes(&self) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "free memory probe is only available on Linux",
        ))
    }
}

/// Default sysfs temperature file.
pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Default throttle threshold in millidegrees Celsius.
pub const DEFAULT_THERMAL_THRESHOLD: i64 = 85_000;

/// Thermal probe backed by a background sampler over a sysfs temperature file.
///
/// The latest verdict is cached, so `is_throttled` never touches the filesystem.
pub struct SysfsThermalMonitor {
    zone_path: PathBuf,
    threshold_millidegrees: i64,
    sample_interval: Duration,
    throttled: AtomicBool,
}

impl SysfsThermalMonitor {
    pub fn new(
        zone_path: impl Into<PathBuf>,
        threshold_millidegrees: i64,
        sample_interval: Duration,
    ) -> Self {
        Self {
            zone_path: zone_path.into(),
            threshold_millidegrees,
            sample_interval,
            throttled: AtomicBool::new(false),
        }
    }

    /// Take one sample and update the cached verdict.
    pub async fn sample(&self) -> bool {
        let throttled = match tokio::fs::read_to_string(&self.zone_path).await {
            Ok(raw) => match raw.trim().parse::<i64>() {
                Ok(temp) => temp > self.threshold_millidegrees,
                Err(e) => {
                    debug!(path = %self.zone_path.display(), error = %e, "Unparseable temperature");
                    false
                }
            },
            Err(e) => {
                debug!(path = %self.zone_path.display(), error = %e, "Thermal zone unreadable");
                false
            }
        };

        let was = self.throttled.swap(throttled, Ordering::SeqCst);
        if throttled && !was {
            warn!(path = %self.zone_path.display(), "Thermal throttling engaged");
        } else if !throttled && was {
            info!("Thermal throttling cleared");
        }
        throttled
    }

    /// Run the sampler until `shutdown` is cancelled.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                path = %self.zone_path.display(),
                threshold = self.threshold_millidegrees,
                "Thermal monitor started"
            );
            loop {
                self.sample().await;
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.sample_interval) => {}
                }
            }
            info!("Thermal monitor stopped");
        })
    }
}

impl ThermalProbe for SysfsThermalMonitor {
    fn is_throttled(&self) -> bool {
        self.throttled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn monitor(dir: &TempDir, contents: Option<&str>) -> SysfsThermalMonitor {
        let path = dir.path().join("temp");
        if let Some(contents) = contents {
            std::fs::write(&path, contents).unwrap();
        }
        SysfsThermalMonitor::new(path, DEFAULT_THERMAL_THRESHOLD, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_hot_zone_throttles() {
        let dir = TempDir::new().unwrap();
        let monitor = monitor(&dir, Some("90000\n"));
        assert!(monitor.sample().await);
        assert!(monitor.is_throttled());
    }

    #[tokio::test]
    async fn test_threshold_is_exclusive() {
        let dir = TempDir::new().unwrap();
        let monitor = monitor(&dir, Some("85000"));
        assert!(!monitor.sample().await);
    }

    #[tokio::test]
    async fn test_unreadable_zone_is_not_throttled() {
        let dir = TempDir::new().unwrap();
        let monitor = monitor(&dir, None);
        assert!(!monitor.sample().await);
        assert!(!monitor.is_throttled());
    }

    #[tokio::test]
    async fn test_garbage_is_not_throttled() {
        let dir = TempDir::new().unwrap();
        let monitor = monitor(&dir, Some("hot"));
        assert!(!monitor.sample().await);
    }

    #[tokio::test]
    async fn test_background_sampler_stops_on_cancel() {
        let dir = TempDir::new().unwrap();
        let monitor = Arc::new(monitor(&dir, Some("99000")));
        let token = CancellationToken::new();
        let handle = Arc::clone(&monitor).spawn(token.clone());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(monitor.is_throttled());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_system_memory_probe_reports_something() {
        assert!(SystemMemoryProbe.free_memory_bytes().unwrap() > 0);
    }
}
