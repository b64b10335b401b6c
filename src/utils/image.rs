use std::fmt;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use opencv::core::{Mat, MatTraitConst, Vec3b, Vector};
use opencv::imgcodecs::{imdecode, IMREAD_COLOR};
use opencv::imgproc::{COLOR_BGR2RGB, cvt_color_def};
use crate::error::DecodeError;

/// RgbFrame is a decoded 8-bit, 3-channel image in red-green-blue order.
pub struct RgbFrame {
    mat: Mat,
}

impl RgbFrame {
    pub(crate) fn from_rgb_mat(mat: Mat) -> Self {
        RgbFrame { mat }
    }

    pub fn width(&self) -> u32 {
        self.mat.cols().max(0) as u32
    }

    pub fn height(&self) -> u32 {
        self.mat.rows().max(0) as u32
    }

    pub fn as_mat(&self) -> &Mat {
        &self.mat
    }

    /// pixel returns the `[r, g, b]` value at column `x`, row `y`.
    pub fn pixel(&self, x: i32, y: i32) -> Result<[u8; 3], opencv::Error> {
        let value = self.mat.at_2d::<Vec3b>(y, x)?;
        Ok([value[0], value[1], value[2]])
    }
}

impl fmt::Debug for RgbFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RgbFrame")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// strip_data_uri_header drops an optional `<scheme>,` prefix from the payload.
///
/// Only the text after the first comma is kept; a payload without a comma is
/// returned unchanged.
pub fn strip_data_uri_header(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, data)) => data,
        None => payload,
    }
}

/// decode_base64_payload returns the raw image bytes carried by a transport payload.
///
/// # Arguments
/// * `payload` - base64 image data, optionally behind a data-URI header
///
/// # Returns
/// * `Result<Vec<u8>, DecodeError>`
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, DecodeError> {
    let data = strip_data_uri_header(payload).trim();
    if data.is_empty() {
        return Err(DecodeError::EmptyPayload)
    }
    let im_bytes = STANDARD.decode(data)?;
    if im_bytes.is_empty() {
        return Err(DecodeError::EmptyPayload)
    }
    Ok(im_bytes)
}

/// convert_bytes_to_rgb_mat decodes an encoded still image into an RGB matrix.
///
/// # Arguments
/// * `im_bytes` - encoded image bytes (png, jpeg, ...)
///
/// # Returns
/// * `Result<Mat, DecodeError>`
pub fn convert_bytes_to_rgb_mat(im_bytes: &[u8]) -> Result<Mat, DecodeError> {
    let img_as_vec = Vector::<u8>::from_slice(im_bytes);

    // imdecode reports corrupt or unknown formats with an empty matrix
    let img_as_arr_bgr = imdecode(&img_as_vec, IMREAD_COLOR)?;
    if img_as_arr_bgr.empty() {
        return Err(DecodeError::UnsupportedImage)
    }

    let mut img_as_arr_rgb = Mat::default();
    cvt_color_def(&img_as_arr_bgr, &mut img_as_arr_rgb, COLOR_BGR2RGB)?;

    Ok(img_as_arr_rgb)
}

/// decode_frame turns a transport payload into an RGB frame ready for landmark detection.
///
/// # Arguments
/// * `payload` - base64 image data, optionally behind a data-URI header
///
/// # Returns
/// * `Result<RgbFrame, DecodeError>`
pub fn decode_frame(payload: &str) -> Result<RgbFrame, DecodeError> {
    let im_bytes = decode_base64_payload(payload)?;
    let rgb = convert_bytes_to_rgb_mat(&im_bytes)?;
    Ok(RgbFrame::from_rgb_mat(rgb))
}
