use std::time::Duration;
use anyhow::Error;
use tonic::transport::{Channel, Endpoint};
use crate::triton_client::client::triton::grpc_inference_service_client::GrpcInferenceServiceClient;
use crate::triton_client::client::triton::{
    ModelInferRequest, ModelInferResponse, ModelMetadataRequest, ModelMetadataResponse, ModelReadyRequest,
    ServerLiveRequest,
};

pub mod triton {
    tonic::include_proto!("inference");
}

/// TritonInferenceClient talks to a KServe v2 / Triton inference server over gRPC.
#[derive(Debug, Clone)]
pub struct TritonInferenceClient {
    client: GrpcInferenceServiceClient<Channel>,
}

impl TritonInferenceClient {
    /// new creates a client whose channel connects on first use.
    ///
    /// # Arguments
    /// * `endpoint` - server address, e.g. `http://127.0.0.1:8001`
    /// * `timeout` - deadline applied to connecting and to every request
    ///
    /// # Returns
    /// * `Result<TritonInferenceClient, Error>`
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, Error> {
        let channel = Endpoint::from_shared(endpoint.to_string())?
            .connect_timeout(timeout)
            .timeout(timeout)
            .connect_lazy();

        Ok(TritonInferenceClient {
            client: GrpcInferenceServiceClient::new(channel),
        })
    }

    pub async fn server_live(&self) -> Result<bool, Error> {
        let response = self.client.clone().server_live(ServerLiveRequest {}).await?;
        Ok(response.into_inner().live)
    }

    pub async fn model_ready(&self, model_name: &str, model_version: &str) -> Result<bool, Error> {
        let request = ModelReadyRequest {
            name: model_name.to_string(),
            version: model_version.to_string(),
        };
        let response = self.client.clone().model_ready(request).await?;
        Ok(response.into_inner().ready)
    }

    pub async fn model_metadata(&self, model_name: &str, model_version: &str) -> Result<ModelMetadataResponse, Error> {
        let request = ModelMetadataRequest {
            name: model_name.to_string(),
            version: model_version.to_string(),
        };
        let response = self.client.clone().model_metadata(request).await?;
        Ok(response.into_inner())
    }

    pub async fn model_infer(&self, request: ModelInferRequest) -> Result<ModelInferResponse, Error> {
        let response = self.client.clone().model_infer(request).await?;
        Ok(response.into_inner())
    }
}
