// Services module
// Pipeline stages and the orchestrator that drives them

pub mod cloud; // Publishing finished videos
pub mod generator; // Orchestrator
pub mod images; // Image engines and placeholder fallback
pub mod script; // Script segmentation
pub mod tts; // Speech synthesis engines, cache and fallback
pub mod video; // Video backend, assembly, merge and enhancement

#[cfg(test)]
mod tests;
