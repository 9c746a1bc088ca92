use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model server request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Model server {url} answered {status}: {body}")]
    UnexpectedStatus { url: String, status: u16, body: String },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Inference I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Inference task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
