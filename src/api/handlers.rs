use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
};
use biodetect_core::detect::{DetectionKind, Report};
use image::RgbImage;
use serde_json::{Value, json};
use tracing::debug;

use super::error::{ApiError, ApiResult};
use super::state::AppState;

const FILE_FIELD: &str = "file";

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Biomedical Detection API" }))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn detect(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Report>> {
    let kind: DetectionKind = kind.parse().map_err(|_| ApiError::InvalidKind)?;

    // Anything that is not a multipart form has no file field
    let mut multipart = multipart.map_err(|_| ApiError::MissingField(FILE_FIELD))?;
    let data = read_file(&mut multipart).await?;
    debug!("Received {} byte upload for {kind}", data.len());

    let image = decode(data).await?;
    let report = state.queue.submit(kind, image).await?;
    Ok(Json(report))
}

/// Decodes on the blocking pool so large uploads don't hold up the executor.
async fn decode(data: Bytes) -> ApiResult<RgbImage> {
    tokio::task::spawn_blocking(move || image::load_from_memory(&data).map(|img| img.into_rgb8()))
        .await
        .map_err(|e| ApiError::Processing(e.to_string()))?
        .map_err(|e| ApiError::Processing(e.to_string()))
}

async fn read_file(multipart: &mut Multipart) -> ApiResult<Bytes> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            return Ok(field.bytes().await?);
        }
    }

    Err(ApiError::MissingField(FILE_FIELD))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    #[tokio::test]
    async fn test_decode_large_upload() {
        let mut img = RgbImage::new(1920, 1080);
        img.put_pixel(1919, 1079, Rgb([1, 2, 3]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();

        let decoded = decode(Bytes::from(buf.into_inner())).await.unwrap();

        assert_eq!(decoded.dimensions(), (1920, 1080));
        assert_eq!(decoded.get_pixel(1919, 1079), &Rgb([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_decode_garbage() {
        let err = decode(Bytes::from_static(b"not an image")).await.unwrap_err();
        assert!(matches!(err, ApiError::Processing(_)));
    }
}
