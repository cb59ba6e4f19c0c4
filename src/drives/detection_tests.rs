/// Tests for drive detection against a fake sysfs tree

#[cfg(test)]
mod drive_detection_tests {
    use super::super::detection::DriveDetector;
    use super::super::DriveInfo;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn fake_block(sys: &Path, dev: &Path, name: &str, model: Option<&str>, sectors: &str) {
        let dir = sys.join(name);
        fs::create_dir_all(dir.join("device")).unwrap();
        fs::write(dir.join("size"), sectors).unwrap();
        if let Some(model) = model {
            fs::write(dir.join("device").join("model"), format!("{}\n", model)).unwrap();
        }
        fs::write(dev.join(name), b"").unwrap();
    }

    #[test]
    fn test_should_skip_device_loop() {
        assert!(DriveDetector::should_skip_device("loop0"));
        assert!(DriveDetector::should_skip_device("loop99"));
    }

    #[test]
    fn test_should_skip_virtual_devices() {
        assert!(DriveDetector::should_skip_device("ram0"));
        assert!(DriveDetector::should_skip_device("dm-1"));
        assert!(DriveDetector::should_skip_device("sr0"));
        assert!(DriveDetector::should_skip_device("zram0"));
    }

    #[test]
    fn test_should_not_skip_physical() {
        assert!(!DriveDetector::should_skip_device("sda"));
        assert!(!DriveDetector::should_skip_device("nvme0n1"));
        assert!(!DriveDetector::should_skip_device("hdb"));
    }

    #[test]
    fn test_detect_in_fake_sysfs() {
        let sys = TempDir::new().unwrap();
        let dev = TempDir::new().unwrap();
        fake_block(sys.path(), dev.path(), "sdb", Some("WDC WD10EZEX"), "1953525168\n");
        fake_block(sys.path(), dev.path(), "sda", None, "garbage");
        fake_block(sys.path(), dev.path(), "loop0", Some("loop"), "100");
        // sysfs entry without a device node
        fs::create_dir_all(sys.path().join("sdc")).unwrap();

        let drives = DriveDetector::detect_in(sys.path(), dev.path()).unwrap();
        let names: Vec<PathBuf> = drives.iter().map(|d| d.device_path.clone()).collect();
        assert_eq!(names, vec![dev.path().join("sda"), dev.path().join("sdb")]);

        assert_eq!(drives[0].model, "Unknown");
        assert_eq!(drives[0].size_bytes, 0);
        assert_eq!(drives[1].model, "WDC WD10EZEX");
        assert_eq!(drives[1].size_bytes, 1_953_525_168 * 512);
    }

    #[test]
    fn test_detect_in_missing_dir_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(DriveDetector::detect_in(&dir.path().join("none"), dir.path()).is_err());
    }

    #[test]
    fn test_mounted_in() {
        let mounts = "/dev/sda1 / ext4 rw 0 0\nproc /proc proc rw 0 0\n";
        assert!(DriveDetector::mounted_in(mounts, Path::new("/dev/sda")));
        assert!(!DriveDetector::mounted_in(mounts, Path::new("/dev/sdb")));
    }

    #[test]
    fn test_mounted_in_ignores_longer_device_names() {
        let mounts = "/dev/sdaa1 /mnt ext4 rw 0 0\n/dev/nvme0n1p2 /boot vfat rw 0 0\n";
        assert!(!DriveDetector::mounted_in(mounts, Path::new("/dev/sda")));
        assert!(DriveDetector::mounted_in(mounts, Path::new("/dev/sdaa")));
        assert!(DriveDetector::mounted_in(mounts, Path::new("/dev/nvme0n1")));
        assert!(!DriveDetector::mounted_in(mounts, Path::new("/dev/nvme0")));
        assert!(DriveDetector::mounted_in("/dev/sdc / xfs rw 0 0\n", Path::new("/dev/sdc")));
    }

    #[test]
    fn test_select_by_number() {
        let drives = vec![
            DriveInfo {
                device_path: PathBuf::from("/dev/sda"),
                model: "A".into(),
                size_bytes: 0,
                is_mounted: true,
            },
            DriveInfo {
                device_path: PathBuf::from("/dev/sdb"),
                model: "B".into(),
                size_bytes: 1 << 30,
                is_mounted: false,
            },
        ];
        assert_eq!(
            DriveDetector::select_by_number(&drives, 2),
            Some(PathBuf::from("/dev/sdb"))
        );
        assert_eq!(DriveDetector::select_by_number(&drives, 0), None);
        assert_eq!(DriveDetector::select_by_number(&drives, 3), None);
        assert_eq!(drives[1].to_string(), "/dev/sdb - B (1.0 GiB)");
        assert!(drives[0].to_string().ends_with("[mounted]"));
    }
}
