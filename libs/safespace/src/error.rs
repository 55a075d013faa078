use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serial port {port} could not be opened: {source}")]
    SerialOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("toml parsing failed: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid bounds for {name}: min_x={min_x} max_x={max_x} min_y={min_y} max_y={max_y}")]
    #[diagnostic(help("bounds must be finite and satisfy min <= max on both axes"))]
    InvalidBounds {
        name: String,
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
    },
    #[error("rotation must be a multiple of 90 degrees, got {0}")]
    InvalidRotation(i64),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("non-finite coordinate ({x}, {y}, {z})")]
    NonFiniteCoordinate { x: f64, y: f64, z: f64 },
}
