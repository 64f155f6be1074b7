use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub trail: TrailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Minimum confidence for a detection to be kept. `None` runs the
    /// plain tracker without an extra filtering stage.
    pub confidence_threshold: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailConfig {
    /// Positions kept per track; older ones are dropped.
    pub max_history: usize,
    /// Trail color in BGR order.
    pub color: [f64; 3],
    pub thickness: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            max_history: 5,
            color: [0.0, 45.0, 255.0],
            thickness: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// One decoded video frame as packed RGB bytes.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub index: i32,
}
