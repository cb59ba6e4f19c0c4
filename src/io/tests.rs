#[cfg(test)]
mod tests {
    use crate::error::HandleRetry;
    use crate::io::*;
    use crate::pattern::Pattern;
    use crate::SectorError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

    /// Regular file standing in for a block device; page cache is fine here
    fn file_backed(sectors: usize) -> Result<(NamedTempFile, RawDevice)> {
        let mut temp = NamedTempFile::new()?;
        temp.write_all(&vec![0xABu8; sectors * SECTOR_SIZE])?;
        temp.flush()?;
        let device = RawDevice::new(temp.path())
            .with_direct_io(false)
            .with_exclusive(false)
            .with_retry(HandleRetry::immediate(2, 2));
        Ok((temp, device))
    }

    #[test]
    fn test_write_then_read_0x55() -> Result<()> {
        let (_temp, device) = file_backed(16)?;
        device.write_sector(5, &Pattern::byte(0x55).tile())?;

        let outcome = device.read_sector(5)?;
        assert_eq!(outcome.data, [0x55u8; SECTOR_SIZE]);
        Ok(())
    }

    #[test]
    fn test_write_then_read_0xaa() -> Result<()> {
        let (_temp, device) = file_backed(16)?;
        device.write_sector(0, &Pattern::byte(0xAA).tile())?;

        let outcome = device.read_sector(0)?;
        assert_eq!(outcome.data, [0xAAu8; SECTOR_SIZE]);
        Ok(())
    }

    #[test]
    fn test_write_lands_at_sector_offset() -> Result<()> {
        let (temp, device) = file_backed(8)?;
        device.write_sector(3, &[0x55; SECTOR_SIZE])?;

        let raw = std::fs::read(temp.path())?;
        assert_eq!(raw.len(), 8 * SECTOR_SIZE);
        assert!(raw[3 * SECTOR_SIZE..4 * SECTOR_SIZE].iter().all(|&b| b == 0x55));
        assert!(raw[2 * SECTOR_SIZE..3 * SECTOR_SIZE].iter().all(|&b| b == 0xAB));
        assert!(raw[4 * SECTOR_SIZE..5 * SECTOR_SIZE].iter().all(|&b| b == 0xAB));
        Ok(())
    }

    #[test]
    fn test_read_past_end_is_io_failure() -> Result<()> {
        let (_temp, device) = file_backed(4)?;
        match device.read_sector(4) {
            Err(SectorError::IoFailure { sector, source }) => {
                assert_eq!(sector, 4);
                assert_eq!(source.kind(), std::io::ErrorKind::UnexpectedEof);
            }
            other => panic!("expected IoFailure, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_missing_device_is_open_failure() {
        let device = RawDevice::new("/nonexistent/hddray-test-device")
            .with_direct_io(false)
            .with_retry(HandleRetry::immediate(2, 0));

        let err = device.read_sector(0).unwrap_err();
        assert!(matches!(err, SectorError::DeviceOpenFailure { .. }));
        assert!(err.to_string().contains("hddray-test-device"));
    }

    #[test]
    fn test_handle_is_released_between_calls() -> Result<()> {
        let (_temp, device) = file_backed(4)?;
        // Repeated exclusive cycles must not exhaust descriptors or deadlock
        for i in 0..64u64 {
            device.write_sector(i % 4, &[i as u8; SECTOR_SIZE])?;
            assert_eq!(device.read_sector(i % 4)?.data[0], i as u8);
        }
        Ok(())
    }

    #[test]
    fn test_read_outcome_latency_checks() {
        let outcome = ReadOutcome {
            data: [0; SECTOR_SIZE],
            latency: std::time::Duration::from_millis(120),
        };
        assert!(!outcome.within(100));
        assert!(outcome.within(120));
        assert!((outcome.latency_ms() - 120.0).abs() < f64::EPSILON);

        match outcome.check_latency(77, 100) {
            Err(SectorError::LatencyExceeded {
                sector, limit_ms, ..
            }) => {
                assert_eq!(sector, 77);
                assert_eq!(limit_ms, 100);
            }
            other => panic!("expected LatencyExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_default_scan_window() {
        assert_eq!(DEFAULT_SCAN_SECTORS, 262_144);
        assert_eq!(sector_offset(262_144), 128 * 1024 * 1024);
    }
}
