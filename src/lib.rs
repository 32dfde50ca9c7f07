//! scriptreel
//!
//! Turns a plain-text script into a narrated slideshow video: the script is
//! split into timed scenes, each chunk of scenes is voiced and illustrated,
//! chunks are assembled into video segments and merged, and optional
//! enhancement stages (subtitles, fades, background music) run on the result.

pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{AppConfig, GenerationOptions, SocialFormat, VideoQuality};
pub use errors::{AppError, AppResult};
pub use models::{Chunk, Dimensions, GenerationResult, Scene, ScriptStatistics, Statistics};
pub use services::generator::VideoGenerator;
