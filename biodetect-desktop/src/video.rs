use anyhow::{Context, Result, ensure};
use image::{EncodableLayout, RgbImage};
use tracing::{debug, error, info};

use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};

use nokhwa::{
    Camera, nokhwa_initialize,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

/// The one capture mode the demo asks the webcam for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureMode {
    pub camera: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl CaptureMode {
    fn format(&self) -> CameraFormat {
        CameraFormat::new(
            Resolution::new(self.width, self.height),
            FrameFormat::MJPEG,
            self.fps,
        )
    }

    fn requested(&self) -> RequestedFormat<'static> {
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(self.format()))
    }
}

/// Opens the webcam in the mode closest to `mode`. The driver may settle on a
/// different resolution, so callers size their output from the camera.
pub fn open_camera(mode: CaptureMode) -> Result<Camera> {
    nokhwa_initialize(|granted| {
        debug!("Camera access granted: {granted}");
    });

    let mut camera = Camera::new(CameraIndex::Index(mode.camera), mode.requested())
        .with_context(|| format!("Failed to open camera {}", mode.camera))?;
    camera.open_stream()?;
    info!("Capturing {:?}", camera.camera_format());

    Ok(camera)
}

/// Where annotated frames go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    /// An ffplay window.
    Window,
    /// A v4l2 loopback device such as `video9`, fed through ffmpeg.
    Loopback(String),
}

impl From<Option<String>> for SinkTarget {
    fn from(device: Option<String>) -> Self {
        device.map_or(SinkTarget::Window, SinkTarget::Loopback)
    }
}

impl SinkTarget {
    fn command(&self, width: u32, height: u32) -> Command {
        let size = format!("{width}x{height}");
        let mut command = match self {
            SinkTarget::Window => Command::new("ffplay"),
            SinkTarget::Loopback(_) => Command::new("ffmpeg"),
        };
        command.args(["-f", "rawvideo", "-pixel_format", "rgb24", "-video_size", &size]);
        match self {
            SinkTarget::Window => {
                command.args(["-fflags", "nobuffer", "-flags", "low_delay", "-"]);
            }
            SinkTarget::Loopback(device) => {
                command.args(["-i", "-", "-vf", "format=yuv420p", "-f", "v4l2"]);
                command.arg(format!("/dev/{device}"));
            }
        }
        command
    }
}

/// Child process consuming raw rgb24 frames of a fixed size on stdin.
pub struct FrameSink {
    child: Child,
    stdin: ChildStdin,
    width: u32,
    height: u32,
}

impl FrameSink {
    pub fn spawn(target: &SinkTarget, width: u32, height: u32) -> Result<Self> {
        let mut child = target
            .command(width, height)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .context("Failed to start video output, is ffmpeg installed?")?;
        let stdin = child.stdin.take().context("Video output has no stdin")?;

        Ok(Self {
            child,
            stdin,
            width,
            height,
        })
    }

    /// Raw video has no framing, so a frame of another size would garble
    /// every frame after it.
    pub fn write_frame(&mut self, img: &RgbImage) -> Result<()> {
        ensure!(
            img.dimensions() == (self.width, self.height),
            "Frame is {:?}, output expects {}x{}",
            img.dimensions(),
            self.width,
            self.height
        );
        self.stdin.write_all(img.as_bytes())?;
        Ok(())
    }
}

impl Drop for FrameSink {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            error!("Failed to stop output process {e:?}");
        }
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(command: &Command) -> Vec<String> {
        command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_window_sink() {
        let command = SinkTarget::from(None).command(640, 480);

        assert_eq!(command.get_program(), "ffplay");
        let args = args(&command);
        assert!(args.windows(2).any(|w| w == ["-video_size", "640x480"]));
        assert_eq!(args.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn test_loopback_sink() {
        let target = SinkTarget::from(Some("video9".to_string()));
        assert_eq!(target, SinkTarget::Loopback("video9".to_string()));

        let command = target.command(1280, 720);
        assert_eq!(command.get_program(), "ffmpeg");
        let args = args(&command);
        assert!(args.windows(2).any(|w| w == ["-pixel_format", "rgb24"]));
        assert!(args.windows(2).any(|w| w == ["-video_size", "1280x720"]));
        assert_eq!(args.last().map(String::as_str), Some("/dev/video9"));
    }

    #[test]
    fn test_requested_mode() {
        let mode = CaptureMode {
            camera: 0,
            width: 640,
            height: 480,
            fps: 15,
        };

        let format = mode.format();
        assert_eq!(format.resolution(), Resolution::new(640, 480));
        assert_eq!(format.frame_rate(), 15);
        assert_eq!(format.format(), FrameFormat::MJPEG);
    }
}
