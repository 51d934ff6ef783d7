#![warn(unused_extern_crates)]
use anyhow::Result;
use biodetect_core::detect::{DetectionKind, Detectors, Report};
use biodetect_core::draw;
use biodetect_core::pipeline::{PipelineConfig, load_estimators};
use biodetect_core::presence::PresenceTracker;
use clap::Parser;
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use num_cpus::get as get_cpu_count;
use std::path::PathBuf;
use tracing::{Level, error, info, span, trace};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use video::{CaptureMode, FrameSink, SinkTarget, open_camera};

mod video;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CmdArgs {
    /// Detector to run on every frame
    #[arg(short, long, default_value = "people")]
    kind: DetectionKind,

    /// Webcam to capture from
    #[arg(long, default_value_t = 0)]
    camera: u32,

    /// Requested capture width
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Requested capture height
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Target frame rate
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Loopback device to write to. Displays in window if unset
    #[arg(short, long)]
    device: Option<String>,

    /// Directory holding the ONNX models
    #[arg(long, default_value = "models")]
    models_dir: PathBuf,

    #[arg(long, default_value_t = 0.5)]
    min_detection_confidence: f32,
}

/// Running total of people seen by the webcam.
#[derive(Debug, Default)]
struct PeopleCounter {
    total: u32,
}

impl PeopleCounter {
    /// Adds the report's count, returning the new total when it grew.
    fn record(&mut self, report: &Report) -> Option<u32> {
        match report {
            Report::People(r) if r.count > 0 => {
                self.total += r.count;
                Some(self.total)
            }
            _ => None,
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_env_filter(filter)
        .init();

    let args = CmdArgs::parse();

    let estimators = load_estimators(&PipelineConfig {
        models_dir: args.models_dir,
        threads: get_cpu_count(),
        min_detection_confidence: args.min_detection_confidence,
        ..PipelineConfig::default()
    })?;
    let mut detectors = Detectors::new(estimators, PresenceTracker::default());
    let mut counter = PeopleCounter::default();

    let mut camera = open_camera(CaptureMode {
        camera: args.camera,
        width: args.width,
        height: args.height,
        fps: args.fps,
    })?;
    let resolution = camera.resolution();
    let mut sink = FrameSink::spawn(
        &SinkTarget::from(args.device),
        resolution.width(),
        resolution.height(),
    )?;

    loop {
        let span = span!(Level::INFO, "frame_loop_iter");
        let _guard = span.enter();

        let frame = match camera.frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to pull frame from webcam: {e:?}");
                break;
            }
        };

        let mut img: RgbImage = frame.decode_image::<RgbFormat>()?;

        match detectors.run(args.kind, &img) {
            Ok(report) => {
                if let Some(total) = counter.record(&report) {
                    info!("People count: {total}");
                }
                draw::annotate(&mut img, &report);
            }
            Err(e) => error!("Failed to process frame: {e:?}"),
        }

        match sink.write_frame(&img) {
            Ok(_) => trace!("Rendered frame."),
            Err(e) => error!("Failed to render frame: {e:?}"),
        }
    }

    camera.stop_stream()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use biodetect_core::detect::people::{PeopleReport, Status};
    use biodetect_core::landmark::LandmarkSet;

    fn people(status: Status, count: u32) -> Report {
        Report::People(PeopleReport {
            status,
            count,
            landmarks: LandmarkSet::default(),
        })
    }

    #[test]
    fn test_counter_only_reports_growth() {
        let mut counter = PeopleCounter::default();

        assert_eq!(counter.record(&people(Status::Success, 1)), Some(1));
        assert_eq!(counter.record(&people(Status::Success, 0)), None);
        assert_eq!(counter.record(&people(Status::NoPoseDetected, 0)), None);
        assert_eq!(counter.record(&people(Status::Success, 1)), Some(2));
        assert_eq!(counter.total, 2);
    }
}
