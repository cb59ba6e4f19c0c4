use super::DriveInfo;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const SYS_BLOCK: &str = "/sys/block";
const DEV_ROOT: &str = "/dev";

pub struct DriveDetector;

impl DriveDetector {
    /// Physical block devices present on this machine, sorted by name
    pub fn detect_all_drives() -> Result<Vec<DriveInfo>> {
        Self::detect_in(Path::new(SYS_BLOCK), Path::new(DEV_ROOT))
    }

    /// Scan a sysfs block directory, keeping devices that have a node under `dev_root`
    pub fn detect_in(sys_block: &Path, dev_root: &Path) -> Result<Vec<DriveInfo>> {
        let mut drives = Vec::new();
        let mounts = fs::read_to_string("/proc/mounts").unwrap_or_default();

        let block_devices = fs::read_dir(sys_block)
            .with_context(|| format!("Failed to list {}", sys_block.display()))?;

        for entry in block_devices {
            let entry = entry?;
            let device_name = entry.file_name();
            let device_name = device_name.to_string_lossy();

            // Skip non-physical devices
            if Self::should_skip_device(&device_name) {
                continue;
            }

            let device_path = dev_root.join(device_name.as_ref());
            if !device_path.exists() {
                tracing::debug!(device = %device_path.display(), "No device node, skipping");
                continue;
            }

            let sys_dir = entry.path();
            let is_mounted = Self::mounted_in(&mounts, &device_path);
            drives.push(DriveInfo {
                model: Self::read_model(&sys_dir),
                size_bytes: Self::read_size_bytes(&sys_dir),
                is_mounted,
                device_path,
            });
        }

        drives.sort_by(|a, b| a.device_path.cmp(&b.device_path));
        Ok(drives)
    }

    /// Check if device should be skipped
    pub(crate) fn should_skip_device(device_name: &str) -> bool {
        // Skip loop devices, ram disks, device mapper, etc.
        device_name.starts_with("loop")
            || device_name.starts_with("ram")
            || device_name.starts_with("dm-")
            || device_name.starts_with("sr") // CD/DVD drives
            || device_name.starts_with("zram")
    }

    fn read_model(sys_dir: &Path) -> String {
        fs::read_to_string(sys_dir.join("device").join("model"))
            .map(|m| m.trim().to_string())
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// sysfs reports size in 512-byte units regardless of the logical sector size
    fn read_size_bytes(sys_dir: &Path) -> u64 {
        fs::read_to_string(sys_dir.join("size"))
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map_or(0, |sectors| sectors * 512)
    }

    /// Whether `/proc/mounts` text lists the device or one of its partitions
    pub(crate) fn mounted_in(mounts: &str, device_path: &Path) -> bool {
        let device = device_path.to_string_lossy();
        mounts
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .filter_map(|source| source.strip_prefix(device.as_ref()))
            .any(Self::is_partition_suffix)
    }

    /// "", "1" (sda1) or "p1" (nvme0n1p1); anything else is another device
    fn is_partition_suffix(rest: &str) -> bool {
        let digits = rest.strip_prefix('p').unwrap_or(rest);
        rest.is_empty() || (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
    }

    /// 1-based pick used by automatic mode
    pub fn select_by_number(drives: &[DriveInfo], drive_number: u32) -> Option<PathBuf> {
        let index = (drive_number as usize).checked_sub(1)?;
        drives.get(index).map(|d| d.device_path.clone())
    }
}
