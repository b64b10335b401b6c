use std::time::Duration;
use crate::pipeline::pipeline::PosturePipeline;

/// Shared state handed to every handler; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: PosturePipeline,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(pipeline: PosturePipeline, request_timeout: Duration) -> Self {
        AppState {
            pipeline,
            request_timeout,
        }
    }
}
