// Utility modules module
// Contains helpers shared by the services

pub mod common; // File name and file check helpers
pub mod ffmpeg; // Locating and running ffmpeg / ffprobe
pub mod logger; // env_logger setup
pub mod temp; // Per-run scratch directories
