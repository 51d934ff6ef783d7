use anyhow::{Context, Result};
use axum::http::HeaderValue;
use biodetect_core::detect::DetectionKind;
use biodetect_core::pipeline::PipelineConfig;
use biodetect_core::presence::{PresenceTracker, ReferenceFrame, ShapePolicy};
use clap::{Args, Parser, Subcommand};
use num_cpus::get as get_cpu_count;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the detection API over HTTP
    Serve(ServeArgs),
    /// Run a single detection on an image file and print the result
    Detect(DetectArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "BIODETECT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "BIODETECT_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Origins allowed to make credentialed cross-origin requests
    #[arg(
        long = "cors-origin",
        env = "BIODETECT_CORS_ORIGINS",
        value_delimiter = ',',
        default_values_t = [
            "http://localhost:8080".to_string(),
            "http://localhost:5173".to_string(),
        ]
    )]
    pub cors_origins: Vec<String>,

    /// Largest accepted request body
    #[arg(long, env = "BIODETECT_MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    #[command(flatten)]
    pub models: ModelArgs,

    #[command(flatten)]
    pub tracker: TrackerArgs,
}

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// One of arm, arm-fingers, eyes, head, people
    #[arg(short, long)]
    pub kind: DetectionKind,

    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Write a copy of the input annotated with the result
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub models: ModelArgs,
}

#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Directory holding the ONNX models
    #[arg(long, env = "BIODETECT_MODELS_DIR", default_value = "models")]
    pub models_dir: PathBuf,

    /// Inference threads per model, capped at the CPU count
    #[arg(short, long, env = "BIODETECT_THREADS")]
    pub threads: Option<usize>,

    #[arg(long, default_value_t = 0.5)]
    pub min_detection_confidence: f32,

    #[arg(long, default_value_t = 2)]
    pub max_hands: usize,
}

impl ModelArgs {
    pub fn pipeline_config(&self) -> PipelineConfig {
        let total_threads = get_cpu_count();
        PipelineConfig {
            models_dir: self.models_dir.clone(),
            threads: self.threads.unwrap_or(total_threads).clamp(1, total_threads),
            min_detection_confidence: self.min_detection_confidence,
            max_hands: self.max_hands,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrackerArgs {
    /// Frame width the people counter measures displacement against
    #[arg(long, default_value_t = 640., value_parser = positive_dimension)]
    pub reference_width: f64,

    #[arg(long, default_value_t = 480., value_parser = positive_dimension)]
    pub reference_height: f64,

    /// Treat a change in landmark count between detections as an error
    #[arg(long)]
    pub strict_landmark_shape: bool,
}

impl TrackerArgs {
    pub fn tracker(&self) -> PresenceTracker {
        let policy = if self.strict_landmark_shape {
            ShapePolicy::Reject
        } else {
            ShapePolicy::Truncate
        };
        PresenceTracker::new(
            ReferenceFrame::new(self.reference_width, self.reference_height),
            policy,
        )
    }
}

/// A reference frame side must be a finite, positive length.
fn positive_dimension(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value > 0. {
        Ok(value)
    } else {
        Err(format!("{s} is not a positive length"))
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<HeaderValue>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                HeaderValue::from_static("http://localhost:8080"),
                HeaderValue::from_static("http://localhost:5173"),
            ],
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServeArgs {
    pub fn server_config(&self) -> Result<ServerConfig> {
        let cors_origins = self
            .cors_origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o.trim()).with_context(|| format!("Invalid CORS origin {o:?}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ServerConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins,
            max_upload_bytes: self.max_upload_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::parse_from(["biodetect", "serve"]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };

        let config = args.server_config().unwrap();
        assert_eq!(config.port, ServerConfig::default().port);
        assert_eq!(config.cors_origins, ServerConfig::default().cors_origins);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(!args.tracker.strict_landmark_shape);
        assert!(args.models.pipeline_config().threads >= 1);
    }

    #[test]
    fn test_detect_kind_parses() {
        let cli = Cli::parse_from(["biodetect", "detect", "--kind", "arm-fingers", "-i", "a.png"]);
        let Command::Detect(args) = cli.command else {
            panic!("expected detect");
        };
        assert_eq!(args.kind, DetectionKind::ArmFingers);

        assert!(Cli::try_parse_from(["biodetect", "detect", "--kind", "legs", "-i", "a.png"]).is_err());
    }

    #[test]
    fn test_reference_frame_must_be_positive() {
        let cli = Cli::parse_from(["biodetect", "serve", "--reference-width", "1280.5"]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.tracker.reference_width, 1280.5);
        assert_eq!(args.tracker.reference_height, 480.);

        for bad in ["0", "-5", "NaN", "inf", "wide"] {
            for flag in ["--reference-width", "--reference-height"] {
                let arg = format!("{flag}={bad}");
                assert!(
                    Cli::try_parse_from(["biodetect", "serve", arg.as_str()]).is_err(),
                    "{arg} accepted"
                );
            }
        }
    }

    #[test]
    fn test_cors_origins_split() {
        let cli = Cli::parse_from([
            "biodetect",
            "serve",
            "--cors-origin",
            "https://a.example,https://b.example",
        ]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.server_config().unwrap().cors_origins.len(), 2);
    }
}
