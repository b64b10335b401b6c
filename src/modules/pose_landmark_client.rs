use std::time::Instant;
use anyhow::{anyhow, Error};
use async_trait::async_trait;
use ndarray::{Array2, Array4};
use opencv::core::{Mat, MatTraitConst, Size, Vec3b};
use opencv::imgproc;
use opencv::imgproc::resize;
use crate::config::config::PoseModelConfig;
use crate::modules::landmark_source::{LandmarkDetection, LandmarkSource};
use crate::triton_client::client::triton::model_infer_request::{InferInputTensor, InferRequestedOutputTensor};
use crate::triton_client::client::triton::{InferTensorContents, ModelInferRequest, ModelInferResponse, ModelMetadataResponse};
use crate::triton_client::client::TritonInferenceClient;
use crate::utils::coordinate::{Keypoint, KeypointSet, PoseLandmark};
use crate::utils::image::RgbFrame;
use crate::utils::utils::{sigmoid, u8_to_f32_vec, u8_to_i32_vec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    Nhwc,
    Nchw,
}

/// InputTensorSpec is the image input of the pose model as reported by its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensorSpec {
    pub name: String,
    pub layout: TensorLayout,
    pub width: usize,
    pub height: usize,
    pub batched: bool,
}

impl InputTensorSpec {
    /// from_metadata reads the first model input.
    ///
    /// Accepted shapes are `[h, w, 3]` and `[3, h, w]`, optionally behind a
    /// batch dimension. Only FP32 inputs with fixed spatial size are supported.
    pub fn from_metadata(metadata: &ModelMetadataResponse) -> Result<Self, Error> {
        let input = match metadata.inputs.first() {
            None => return Err(Error::msg("pose_landmark_client - model metadata has no inputs")),
            Some(input) => input,
        };

        if input.datatype != "FP32" {
            return Err(anyhow!("pose_landmark_client - unsupported input datatype {}", input.datatype))
        }

        let (batched, dims) = match input.shape.len() {
            4 => (true, &input.shape[1..]),
            3 => (false, &input.shape[..]),
            _ => return Err(anyhow!("pose_landmark_client - unsupported input shape {:?}", input.shape)),
        };

        let (layout, height, width) = match dims {
            [h, w, 3] => (TensorLayout::Nhwc, *h, *w),
            [3, h, w] => (TensorLayout::Nchw, *h, *w),
            _ => return Err(anyhow!("pose_landmark_client - input is not a 3-channel image: {:?}", input.shape)),
        };

        if height <= 0 || width <= 0 {
            return Err(anyhow!("pose_landmark_client - dynamic input size is not supported: {:?}", input.shape))
        }

        Ok(InputTensorSpec {
            name: input.name.to_owned(),
            layout,
            width: width as usize,
            height: height as usize,
            batched,
        })
    }

    pub fn shape(&self) -> Vec<i64> {
        let (h, w) = (self.height as i64, self.width as i64);
        let mut shape = match self.layout {
            TensorLayout::Nhwc => vec![h, w, 3],
            TensorLayout::Nchw => vec![3, h, w],
        };
        if self.batched {
            shape.insert(0, 1);
        }
        shape
    }
}

/// Letterbox records how source pixels were scaled into the model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale_x: f64,
    pub scale_y: f64,
}

/// PoseLandmarkClient runs a BlazePose-style landmark model hosted on Triton.
#[derive(Debug, Clone)]
pub struct PoseLandmarkClient {
    triton_infer_client: TritonInferenceClient,
    input: InputTensorSpec,
    pub model_name: String,
    pub model_version: String,
    pub landmarks_output: String,
    pub presence_output: String,
    pub values_per_landmark: usize,
    pub presence_threshold: f32,
    pub presence_is_logit: bool,
    pub mean: f32,
    pub scale: f32,
}

impl PoseLandmarkClient {
    /// new builds the client from the model's metadata and the configured outputs.
    ///
    /// # Arguments
    /// * `triton_infer_client` - shared Triton client
    /// * `triton_model_metadata` - metadata of the pose model
    /// * `config` - output names, thresholds and pixel normalization
    ///
    /// # Returns
    /// * `Result<PoseLandmarkClient, Error>`
    pub fn new(
        triton_infer_client: TritonInferenceClient,
        triton_model_metadata: ModelMetadataResponse,
        config: PoseModelConfig,
    ) -> Result<Self, Error> {
        let input = InputTensorSpec::from_metadata(&triton_model_metadata)?;
        if config.values_per_landmark < 3 {
            return Err(anyhow!("pose_landmark_client - values_per_landmark must be at least 3, got {}", config.values_per_landmark))
        }

        let outputs = &triton_model_metadata.outputs;
        let mut expected = vec![&config.landmarks_output];
        if !config.presence_output.is_empty() {
            expected.push(&config.presence_output);
        }
        for name in expected {
            if !outputs.is_empty() && !outputs.iter().any(|output| &output.name == name) {
                return Err(anyhow!("pose_landmark_client - model {} has no output named {}", config.model_name, name))
            }
        }

        Ok(PoseLandmarkClient {
            triton_infer_client,
            input,
            model_name: config.model_name,
            model_version: config.model_version,
            landmarks_output: config.landmarks_output,
            presence_output: config.presence_output,
            values_per_landmark: config.values_per_landmark,
            presence_threshold: config.presence_threshold,
            presence_is_logit: config.presence_is_logit,
            mean: config.mean,
            scale: config.scale,
        })
    }

    pub fn input(&self) -> &InputTensorSpec {
        &self.input
    }

    /// preprocess letterboxes the frame into the model input and normalizes it.
    ///
    /// The resized image is anchored at the top-left corner; the remainder is
    /// filled with normalized black.
    ///
    /// # Arguments
    /// * `frame` - RGB frame
    ///
    /// # Returns
    /// * `Result<(Array4<f32>, Letterbox), Error>`
    pub fn preprocess(&self, frame: &RgbFrame) -> Result<(Array4<f32>, Letterbox), Error> {
        let img = frame.as_mat();
        let img_w = img.cols();
        let img_h = img.rows();
        if img_w <= 0 || img_h <= 0 {
            return Err(Error::msg("pose_landmark_client - cannot run on an empty frame"))
        }

        let (input_w, input_h) = (self.input.width, self.input.height);
        let ratio = f64::min(input_w as f64 / img_w as f64, input_h as f64 / img_h as f64);
        let new_width = ((img_w as f64 * ratio) as i32).clamp(1, input_w as i32);
        let new_height = ((img_h as f64 * ratio) as i32).clamp(1, input_h as i32);

        let mut img_resized = Mat::default();
        resize(
            img,
            &mut img_resized,
            Size::new(new_width, new_height),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let pad_value = (0.0 - self.mean) * self.scale;
        let mut im_tensor = match self.input.layout {
            TensorLayout::Nhwc => Array4::<f32>::from_elem((1, input_h, input_w, 3), pad_value),
            TensorLayout::Nchw => Array4::<f32>::from_elem((1, 3, input_h, input_w), pad_value),
        };

        for y in 0..new_height as usize {
            for x in 0..new_width as usize {
                let pixel = img_resized.at_2d::<Vec3b>(y as i32, x as i32)?;
                for c in 0..3 {
                    let value = (pixel[c] as f32 - self.mean) * self.scale;
                    match self.input.layout {
                        TensorLayout::Nhwc => im_tensor[[0, y, x, c]] = value,
                        TensorLayout::Nchw => im_tensor[[0, c, y, x]] = value,
                    }
                }
            }
        }

        let letterbox = Letterbox {
            scale_x: new_width as f64 / img_w as f64,
            scale_y: new_height as f64 / img_h as f64,
        };
        Ok((im_tensor, letterbox))
    }

    fn build_request(&self, im_tensor: Array4<f32>) -> ModelInferRequest {
        let mut requested_outputs = vec![InferRequestedOutputTensor {
            name: self.landmarks_output.to_owned(),
            parameters: Default::default(),
        }];
        if !self.presence_output.is_empty() {
            requested_outputs.push(InferRequestedOutputTensor {
                name: self.presence_output.to_owned(),
                parameters: Default::default(),
            });
        }

        let model_input = InferInputTensor {
            name: self.input.name.to_owned(),
            datatype: "FP32".to_string(),
            shape: self.input.shape(),
            parameters: Default::default(),
            contents: Some(InferTensorContents {
                fp32_contents: im_tensor.into_iter().collect(),
                ..Default::default()
            }),
        };

        ModelInferRequest {
            model_name: self.model_name.to_owned(),
            model_version: self.model_version.to_owned(),
            id: "".to_string(),
            parameters: Default::default(),
            inputs: vec![model_input],
            outputs: requested_outputs,
            raw_input_contents: vec![],
        }
    }

    /// postprocess turns the model outputs into image-space keypoints.
    ///
    /// x and y are mapped back through the letterbox; z is divided by the
    /// model input width to give a unitless relative depth.
    ///
    /// # Arguments
    /// * `response` - inference response
    /// * `letterbox` - scaling applied by `preprocess`
    ///
    /// # Returns
    /// * `Result<LandmarkDetection, Error>`
    pub fn postprocess(&self, response: &ModelInferResponse, letterbox: Letterbox) -> Result<LandmarkDetection, Error> {
        if !self.presence_output.is_empty() {
            let presence = read_output(response, &self.presence_output)?;
            let score = match presence.first() {
                None => return Err(anyhow!("pose_landmark_client - output {} is empty", self.presence_output)),
                Some(score) => *score,
            };
            let score = if self.presence_is_logit { sigmoid(score) } else { score };
            // NaN scores count as absent
            if !(score >= self.presence_threshold) {
                tracing::debug!(score, threshold = self.presence_threshold, "pose presence below threshold");
                return Ok(LandmarkDetection::NoSubject)
            }
        }

        let values = read_output(response, &self.landmarks_output)?;
        let vpl = self.values_per_landmark;
        if values.len() % vpl != 0 {
            return Err(anyhow!(
                "pose_landmark_client - output {} has {} values, not a multiple of {}",
                self.landmarks_output,
                values.len(),
                vpl
            ))
        }

        let rows = Array2::from_shape_vec((values.len() / vpl, vpl), values)?;
        let input_width = self.input.width as f64;

        let keypoints: KeypointSet = rows
            .outer_iter()
            .enumerate()
            .filter_map(|(idx, row)| PoseLandmark::from_index(idx).map(|landmark| (landmark, row)))
            .map(|(landmark, row)| {
                let keypoint = Keypoint::new(
                    row[0] as f64 / letterbox.scale_x,
                    row[1] as f64 / letterbox.scale_y,
                    row[2] as f64 / input_width,
                );
                (landmark, keypoint)
            })
            .filter(|(_, keypoint)| keypoint.is_finite())
            .collect();

        Ok(LandmarkDetection::Detected(keypoints))
    }
}

/// read_output returns the values of a named output tensor as f32.
///
/// Raw little-endian contents are preferred; typed contents are the fallback.
fn read_output(response: &ModelInferResponse, name: &str) -> Result<Vec<f32>, Error> {
    let (oidx, output) = match response.outputs.iter().enumerate().find(|(_, output)| output.name == name) {
        None => return Err(anyhow!("pose_landmark_client - response has no output named {}", name)),
        Some(found) => found,
    };

    if let Some(u8_array) = response.raw_output_contents.get(oidx) {
        return match output.datatype.as_str() {
            "FP32" => Ok(u8_to_f32_vec(u8_array)),
            "INT32" => Ok(u8_to_i32_vec(u8_array).iter().map(|&x| x as f32).collect()),
            other => Err(anyhow!("pose_landmark_client - unsupported datatype {} for output {}", other, name)),
        }
    }

    match (&output.contents, output.datatype.as_str()) {
        (Some(contents), "FP32") => Ok(contents.fp32_contents.to_owned()),
        (Some(contents), "INT32") => Ok(contents.int_contents.iter().map(|&x| x as f32).collect()),
        (Some(_), other) => Err(anyhow!("pose_landmark_client - unsupported datatype {} for output {}", other, name)),
        (None, _) => Err(anyhow!("pose_landmark_client - output {} carries no data", name)),
    }
}

#[async_trait]
impl LandmarkSource for PoseLandmarkClient {
    async fn detect(&self, frame: RgbFrame) -> Result<LandmarkDetection, Error> {
        let started = Instant::now();
        // resize and tensor fill are CPU bound and run on the blocking pool
        let client = self.clone();
        let (im_tensor, letterbox) = tokio::task::spawn_blocking(move || client.preprocess(&frame)).await??;

        let model_request = self.build_request(im_tensor);
        let response = self.triton_infer_client.model_infer(model_request).await?;
        let detection = self.postprocess(&response, letterbox)?;

        tracing::debug!(
            model = %self.model_name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            detected = matches!(detection, LandmarkDetection::Detected(_)),
            "pose landmark inference finished"
        );
        Ok(detection)
    }

    async fn ready(&self) -> Result<bool, Error> {
        self.triton_infer_client.model_ready(&self.model_name, &self.model_version).await
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;
    use opencv::core::{CV_8UC3, Mat, Scalar};
    use crate::config::config::PoseModelConfig;
    use crate::modules::landmark_source::LandmarkDetection;
    use crate::modules::pose_landmark_client::{InputTensorSpec, Letterbox, PoseLandmarkClient, TensorLayout};
    use crate::triton_client::client::triton::model_infer_response::InferOutputTensor;
    use crate::triton_client::client::triton::model_metadata_response::TensorMetadata;
    use crate::triton_client::client::triton::{InferTensorContents, ModelInferResponse, ModelMetadataResponse};
    use crate::triton_client::client::TritonInferenceClient;
    use crate::utils::coordinate::PoseLandmark;
    use crate::utils::image::RgbFrame;
    use crate::utils::utils::f32_to_u8_vec;

    pub(crate) fn metadata(shape: Vec<i64>, datatype: &str) -> ModelMetadataResponse {
        ModelMetadataResponse {
            name: "pose_landmark".to_string(),
            inputs: vec![TensorMetadata {
                name: "input_1".to_string(),
                datatype: datatype.to_string(),
                shape,
            }],
            outputs: vec![
                TensorMetadata {
                    name: "Identity".to_string(),
                    datatype: "FP32".to_string(),
                    shape: vec![1, 165],
                },
                TensorMetadata {
                    name: "Identity_1".to_string(),
                    datatype: "FP32".to_string(),
                    shape: vec![1, 1],
                },
            ],
            ..Default::default()
        }
    }

    /// landmark_values lays out 33 landmarks; row i sits at (10 i, 20 + i) with z = 16.
    pub(crate) fn landmark_values() -> Vec<f32> {
        (0..33)
            .flat_map(|i| vec![10.0 * i as f32, 20.0 + i as f32, 16.0, 0.9, 0.9])
            .collect()
    }

    fn output(name: &str, shape: Vec<i64>) -> InferOutputTensor {
        InferOutputTensor {
            name: name.to_string(),
            datatype: "FP32".to_string(),
            shape,
            ..Default::default()
        }
    }

    pub(crate) fn raw_response(landmarks: &[f32], presence: f32) -> ModelInferResponse {
        ModelInferResponse {
            model_name: "pose_landmark".to_string(),
            outputs: vec![output("Identity", vec![1, landmarks.len() as i64]), output("Identity_1", vec![1, 1])],
            raw_output_contents: vec![f32_to_u8_vec(landmarks), f32_to_u8_vec(&[presence])],
            ..Default::default()
        }
    }

    fn client(shape: Vec<i64>, config: PoseModelConfig) -> PoseLandmarkClient {
        let triton = TritonInferenceClient::new("http://127.0.0.1:1", Duration::from_millis(50)).unwrap();
        PoseLandmarkClient::new(triton, metadata(shape, "FP32"), config).unwrap()
    }

    #[test]
    fn test_input_spec_layouts() {
        let nhwc = InputTensorSpec::from_metadata(&metadata(vec![-1, 256, 256, 3], "FP32")).unwrap();
        assert_eq!(nhwc.layout, TensorLayout::Nhwc);
        assert_eq!((nhwc.width, nhwc.height), (256, 256));
        assert!(nhwc.batched);
        assert_eq!(nhwc.shape(), vec![1, 256, 256, 3]);

        let nchw = InputTensorSpec::from_metadata(&metadata(vec![3, 224, 192], "FP32")).unwrap();
        assert_eq!(nchw.layout, TensorLayout::Nchw);
        assert_eq!((nchw.width, nchw.height), (192, 224));
        assert!(!nchw.batched);
        assert_eq!(nchw.shape(), vec![3, 224, 192]);
    }

    #[test]
    fn test_input_spec_rejects_unsupported_inputs() {
        assert!(InputTensorSpec::from_metadata(&metadata(vec![1, 256, 256, 3], "FP16")).is_err());
        assert!(InputTensorSpec::from_metadata(&metadata(vec![1, -1, -1, 3], "FP32")).is_err());
        assert!(InputTensorSpec::from_metadata(&metadata(vec![1, 256, 256, 4], "FP32")).is_err());
        assert!(InputTensorSpec::from_metadata(&ModelMetadataResponse::default()).is_err());
    }

    #[tokio::test]
    async fn test_client_rejects_unknown_output() {
        let triton = TritonInferenceClient::new("http://127.0.0.1:1", Duration::from_millis(50)).unwrap();
        let mut config = PoseModelConfig::new();
        config.landmarks_output = "landmarks".to_string();
        assert!(PoseLandmarkClient::new(triton, metadata(vec![1, 8, 8, 3], "FP32"), config).is_err());
    }

    #[tokio::test]
    async fn test_preprocess_letterboxes_and_normalizes() {
        let client = client(vec![1, 8, 8, 3], PoseModelConfig::new());
        let mat = Mat::new_rows_cols_with_default(2, 4, CV_8UC3, Scalar::new(51.0, 102.0, 255.0, 0.0)).unwrap();
        let frame = RgbFrame::from_rgb_mat(mat);

        let (tensor, letterbox) = client.preprocess(&frame).unwrap();
        assert_eq!(tensor.shape(), &[1, 8, 8, 3]);
        assert_eq!(letterbox, Letterbox { scale_x: 2.0, scale_y: 2.0 });

        assert!((tensor[[0, 0, 0, 0]] - 0.2).abs() < 1e-4);
        assert!((tensor[[0, 3, 7, 1]] - 0.4).abs() < 1e-4);
        assert!((tensor[[0, 3, 7, 2]] - 1.0).abs() < 1e-4);
        // rows below the resized image are padding
        assert_eq!(tensor[[0, 4, 0, 0]], 0.0);
        assert_eq!(tensor[[0, 7, 7, 2]], 0.0);
    }

    #[tokio::test]
    async fn test_preprocess_channel_first() {
        let client = client(vec![1, 3, 4, 4], PoseModelConfig::new());
        let mat = Mat::new_rows_cols_with_default(4, 4, CV_8UC3, Scalar::new(255.0, 0.0, 0.0, 0.0)).unwrap();
        let (tensor, letterbox) = client.preprocess(&RgbFrame::from_rgb_mat(mat)).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 4, 4]);
        assert_eq!(letterbox, Letterbox { scale_x: 1.0, scale_y: 1.0 });
        assert!((tensor[[0, 0, 2, 2]] - 1.0).abs() < 1e-6);
        assert_eq!(tensor[[0, 1, 2, 2]], 0.0);
    }

    #[tokio::test]
    async fn test_postprocess_maps_landmarks_to_image_space() {
        let client = client(vec![1, 8, 8, 3], PoseModelConfig::new());
        let response = raw_response(&landmark_values(), 0.97);

        let detection = client.postprocess(&response, Letterbox { scale_x: 2.0, scale_y: 0.5 }).unwrap();
        let keypoints = match detection {
            LandmarkDetection::Detected(keypoints) => keypoints,
            LandmarkDetection::NoSubject => panic!("expected a detection"),
        };
        assert_eq!(keypoints.len(), 33);

        let nose = keypoints.get(PoseLandmark::Nose).unwrap();
        assert_eq!((nose.x, nose.y, nose.z), (0.0, 40.0, 2.0));

        let left = keypoints.get(PoseLandmark::LeftShoulder).unwrap();
        assert_eq!((left.x, left.y), (55.0, 62.0));

        let right = keypoints.get(PoseLandmark::RightShoulder).unwrap();
        assert_eq!((right.x, right.y), (60.0, 64.0));
    }

    #[tokio::test]
    async fn test_postprocess_low_presence_is_no_subject() {
        let client = client(vec![1, 8, 8, 3], PoseModelConfig::new());
        let response = raw_response(&landmark_values(), 0.2);
        let detection = client.postprocess(&response, Letterbox { scale_x: 1.0, scale_y: 1.0 }).unwrap();
        assert_eq!(detection, LandmarkDetection::NoSubject);
    }

    #[tokio::test]
    async fn test_postprocess_presence_logit() {
        let mut config = PoseModelConfig::new();
        config.presence_is_logit = true;
        let client = client(vec![1, 8, 8, 3], config);

        let absent = raw_response(&landmark_values(), -3.0);
        assert_eq!(
            client.postprocess(&absent, Letterbox { scale_x: 1.0, scale_y: 1.0 }).unwrap(),
            LandmarkDetection::NoSubject
        );

        let present = raw_response(&landmark_values(), 3.0);
        assert!(matches!(
            client.postprocess(&present, Letterbox { scale_x: 1.0, scale_y: 1.0 }).unwrap(),
            LandmarkDetection::Detected(_)
        ));
    }

    #[tokio::test]
    async fn test_postprocess_reads_typed_contents() {
        let client = client(vec![1, 8, 8, 3], PoseModelConfig::new());
        let mut landmarks = output("Identity", vec![1, 165]);
        landmarks.contents = Some(InferTensorContents {
            fp32_contents: landmark_values(),
            ..Default::default()
        });
        let mut presence = output("Identity_1", vec![1, 1]);
        presence.contents = Some(InferTensorContents {
            fp32_contents: vec![0.8],
            ..Default::default()
        });
        let response = ModelInferResponse {
            outputs: vec![presence, landmarks],
            ..Default::default()
        };

        let detection = client.postprocess(&response, Letterbox { scale_x: 1.0, scale_y: 1.0 }).unwrap();
        match detection {
            LandmarkDetection::Detected(keypoints) => {
                assert_eq!(keypoints.get(PoseLandmark::RightShoulder).unwrap().x, 120.0);
            }
            LandmarkDetection::NoSubject => panic!("expected a detection"),
        }
    }

    #[tokio::test]
    async fn test_postprocess_rejects_malformed_outputs() {
        let client = client(vec![1, 8, 8, 3], PoseModelConfig::new());
        let truncated = raw_response(&landmark_values()[..7], 0.9);
        assert!(client.postprocess(&truncated, Letterbox { scale_x: 1.0, scale_y: 1.0 }).is_err());

        let mut missing = raw_response(&landmark_values(), 0.9);
        missing.outputs[0].name = "other".to_string();
        assert!(client.postprocess(&missing, Letterbox { scale_x: 1.0, scale_y: 1.0 }).is_err());
    }
}
