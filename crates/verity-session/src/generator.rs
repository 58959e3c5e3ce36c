//! Token generator seam
//!
//! The model producing answers sits behind [`TokenGenerator`]. A generator
//! pushes tokens into a channel, checks the cancellation token between
//! tokens, and returns exactly once: `Ok` on completion or an error.

use crate::error::GenerationError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Produces an answer token by token
#[async_trait::async_trait]
pub trait TokenGenerator: Send + Sync {
    /// Generate an answer to `prompt`, sending each token on `tokens`.
    ///
    /// # Errors
    /// - `GenerationError::Cancelled` once `cancel` fires or `tokens` closes
    /// - `GenerationError::Failed` if no answer can be produced
    async fn generate(
        &self,
        prompt: &str,
        tokens: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) -> Result<(), GenerationError>;
}
