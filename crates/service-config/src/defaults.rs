//! Default configuration values

/// Fixed location of the model artifact written by the training programs
pub const DEFAULT_MODEL_PATH: &str = "models/my_classifier_model.json";

/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port
pub const DEFAULT_PORT: u16 = 8000;

/// Default upload cap (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default log level directive
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default config file looked up when none is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";

/// Prefix for environment overrides, e.g. `CLASSIFIER_SERVER__PORT`
pub const ENV_PREFIX: &str = "CLASSIFIER";

/// Default label set, index-aligned with the ten model outputs
pub const DEFAULT_LABELS: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];
