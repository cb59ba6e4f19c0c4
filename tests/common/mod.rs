// Common test utilities
//
// - file-backed drives opened through the real raw device adapter
// - settings, log and scenario helpers shared by the integration tests

#![allow(dead_code)]

pub mod mock_drive;
pub mod test_helpers;
