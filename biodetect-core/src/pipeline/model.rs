use anyhow::{Context, Result};
use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array;
use ort::execution_providers;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use std::path::Path;
use tracing::{Level, debug, span};

/// Memory layout of the model's image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `[1, height, width, 3]`, as exported from TFLite
    Nhwc,
    /// `[1, 3, height, width]`
    Nchw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputRange {
    ZeroToOne,
    NegOneToOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub file: &'static str,
    pub width: u32,
    pub height: u32,
    pub layout: Layout,
    pub range: OutputRange,
}

/// Registers the execution providers. Call once before loading any model.
pub fn init_runtime() -> Result<()> {
    ort::init()
        .with_name("biodetect")
        .with_execution_providers([execution_providers::XNNPACKExecutionProvider::default().build()])
        .commit()?;

    Ok(())
}

pub struct Model {
    session: Session,
    spec: ModelSpec,
}

impl Model {
    pub fn load(models_dir: &Path, spec: ModelSpec, threads: usize) -> Result<Model> {
        let path = models_dir.join(spec.file);
        debug!("Loading model {path:?}");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(threads.max(1))?
            .commit_from_file(&path)
            .with_context(|| format!("failed to load model {path:?}"))?;

        Ok(Model { session, spec })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Resizes `img` to the model input, runs it and returns every output
    /// flattened, in declaration order.
    pub fn run(&self, img: &RgbImage) -> Result<Vec<Vec<f32>>> {
        let span = span!(Level::DEBUG, "model_run", model = self.spec.file);
        let _guard = span.enter();

        let input = image_to_tensor(img, &self.spec)?;
        let outputs = self.session.run(ort::inputs![input]?)?;

        let mut results = Vec::with_capacity(outputs.len());
        for i in 0..outputs.len() {
            let tensor = outputs[i].try_extract_tensor::<f32>()?;
            results.push(tensor.iter().copied().collect());
        }

        Ok(results)
    }
}

fn image_to_tensor(img: &RgbImage, spec: &ModelSpec) -> Result<Tensor<f32>> {
    let resized = imageops::resize(img, spec.width, spec.height, FilterType::Triangle);
    let (w, h) = (spec.width as usize, spec.height as usize);

    let arr = match spec.layout {
        Layout::Nhwc => Array::from_shape_fn((1, h, w, 3), |(_, y, x, c)| {
            scale_channel(resized.get_pixel(x as u32, y as u32)[c], spec.range)
        }),
        Layout::Nchw => Array::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
            scale_channel(resized.get_pixel(x as u32, y as u32)[c], spec.range)
        }),
    };

    Ok(Tensor::from_array(arr)?)
}

fn scale_channel(v: u8, range: OutputRange) -> f32 {
    match range {
        OutputRange::ZeroToOne => v as f32 / 255.,
        OutputRange::NegOneToOne => v as f32 / 127.5 - 1.,
    }
}

pub fn sigmoid(x: f32) -> f32 {
    if x >= 0. {
        1. / (1. + (-x).exp())
    } else {
        x.exp() / (1. + x.exp())
    }
}

/// Expects at least `n` outputs, each at least `len` long.
pub fn check_outputs(outputs: &[Vec<f32>], model: &str, lens: &[usize]) -> Result<()> {
    if outputs.len() < lens.len() {
        anyhow::bail!(
            "{model}: expected {} outputs, got {}",
            lens.len(),
            outputs.len()
        );
    }

    for (i, (output, &len)) in outputs.iter().zip(lens).enumerate() {
        if output.len() < len {
            anyhow::bail!(
                "{model}: output {i} has {} values, expected at least {len}",
                output.len()
            );
        }
    }

    Ok(())
}
