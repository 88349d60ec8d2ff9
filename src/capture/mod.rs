/**
 * A message processor that dumps every captured payload as a hex literal
 *
 */
use crate::Context;
use async_trait::async_trait;
use hexlit::HexLiteral;
use slog::info;
use std::net::SocketAddr;
use std::sync::Arc;

/**
 * This trait defines an asynchronous method for processing captured payloads and
 * optionally producing a reply.
 */
#[async_trait]
pub trait MessageProcessor {
    async fn process_message(
        &self,
        input: &[u8],
        client_addr: Option<SocketAddr>,
        output: &mut [u8],
    ) -> Result<usize, Box<dyn std::error::Error>>;
}

/**
 * Logs the payload and, when echo is enabled, copies it to the output buffer.
 */
#[derive(Clone)]
pub(crate) struct CaptureProcessor {
    context: Arc<Context>,
    echo: bool,
}

impl CaptureProcessor {
    /**
     * Creates a new `CaptureProcessor` instance.
     *
     * @param context The tool context containing configuration and logger.
     * @return A new `CaptureProcessor` instance.
     */
    pub fn new(context: &Arc<Context>) -> Self {
        Self {
            context: Arc::clone(context),
            echo: context.config.echo,
        }
    }
}

/**
 * Tag identifying a payload in the logs: the big-endian CRC32 of its bytes, hex encoded.
 */
pub(crate) fn payload_tag(input: &[u8]) -> String {
    hex::encode(crc32fast::hash(input).to_be_bytes())
}

#[async_trait]
impl MessageProcessor for CaptureProcessor {
    /**
     * Logs a captured payload and generates the echo reply, if any.
     *
     * @param input The captured payload.
     * @param client_addr The optional peer address (always present for UDP, may be None for TCP).
     * @param output The buffer to write the echo into.
     * @return A `Result` containing the number of bytes written to the output buffer, or an error.
     */
    async fn process_message(
        &self,
        input: &[u8],
        client_addr: Option<SocketAddr>,
        output: &mut [u8],
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let tag = payload_tag(input);
        let peer = client_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        info!(
            self.context.logger,
            "-->-- [{}] {} bytes from {}",
            tag,
            input.len(),
            peer
        );
        info!(self.context.logger, "-->-- [{}]: {}", tag, HexLiteral(input));

        if !self.echo {
            return Ok(0);
        }
        if output.len() < input.len() {
            return Err(format!(
                "Output buffer too small for echo ({} < {})",
                output.len(),
                input.len()
            )
            .into());
        }
        output[..input.len()].copy_from_slice(input);
        info!(self.context.logger, "--<-- [{}] echoed to {}", tag, peer);
        Ok(input.len())
    }
}
