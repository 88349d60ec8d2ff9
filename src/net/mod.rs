/**
 * Network related functionality
 *
 */
use std::sync::Arc;

use crate::{capture::MessageProcessor, Context};
use slog::{debug, error};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::time::{timeout, Duration};
use tokio::{io::AsyncWriteExt, task::JoinHandle};

/// A TCP capture ends when the peer stays silent this long
const READ_TIMEOUT: Duration = Duration::from_secs(3);

/**
 * Network server that captures payloads arriving over TCP and UDP.
 */
pub(crate) struct NetworkServer<T: MessageProcessor> {
    context: Arc<Context>,
    processor: T,
}

impl<T: MessageProcessor> NetworkServer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /**
     * Initialize a new network server. The context contains global logger
     * and configuration settings, and the message processor decides what
     * happens with every captured payload
     */
    pub fn new(context: &Arc<Context>, message_processor: T) -> Self {
        Self {
            context: Arc::clone(context),
            processor: message_processor,
        }
    }

    /**
     * Sets up a TCP listener on the configured address.
     *
     * The listener is bound before this returns, then a task is spawned that accepts
     * incoming TCP connections and captures each in a separate task.
     *
     * @return A JoinHandle for the spawned listener task, or an error if binding fails
     */
    pub async fn setup_tcp_listener(&self) -> Result<JoinHandle<()>, Box<dyn std::error::Error>> {
        debug!(
            self.context.logger,
            "Enabling TCP listener on {}", self.context.config.tcp_bind_address
        );
        let listener = TcpListener::bind(&self.context.config.tcp_bind_address).await?;
        let context = Arc::clone(&self.context);
        let processor = self.processor.clone();

        let tcp_handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let processor = processor.clone();
                        let context = Arc::clone(&context);
                        tokio::spawn(async move {
                            if let Err(e) =
                                Self::handle_tcp_socket(&context, processor, stream).await
                            {
                                error!(context.logger, "TCP capture error: {}", e);
                            }
                        });
                    }
                    Err(e) => error!(context.logger, "TCP accept error: {}", e),
                }
            }
        });
        Ok(tcp_handle)
    }

    /**
     * Sets up a UDP listener on the configured address.
     *
     * The socket is bound before this returns, then a task is spawned that receives
     * datagrams and hands each one to the message processor.
     *
     * @return A JoinHandle for the spawned listener task, or an error if binding fails
     */
    pub async fn setup_udp_listener(&self) -> Result<JoinHandle<()>, Box<dyn std::error::Error>> {
        debug!(
            self.context.logger,
            "Enabling UDP listener on {}", self.context.config.udp_bind_address
        );
        let udp_socket = UdpSocket::bind(&self.context.config.udp_bind_address).await?;
        let context = Arc::clone(&self.context);
        let processor = self.processor.clone();

        let udp_handle = tokio::spawn(async move {
            if let Err(e) = Self::handle_udp_socket(&context, processor, udp_socket).await {
                error!(context.logger, "UDP capture stopped: {}", e);
            }
        });
        Ok(udp_handle)
    }

    /**
     * Captures one tcp connection
     *
     * Reads until the peer closes its side, `max_message_size` bytes were received or the
     * peer goes silent, then hands the captured bytes to the processor as a single payload.
     *
     * @param context The tool context
     * @param processor The message processor to handle the payload
     * @param stream The TCP connection stream
     * @return Result indicating success or failure
     */
    async fn handle_tcp_socket(
        context: &Arc<Context>,
        processor: T,
        mut stream: TcpStream,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let max_message_size = context.config.max_message_size;
        let mut buffer = vec![0u8; max_message_size];
        let mut received = 0;
        let client_address = stream.peer_addr().ok();

        while received < max_message_size {
            match timeout(READ_TIMEOUT, stream.read(&mut buffer[received..])).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => received += n,
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    debug!(
                        context.logger,
                        "TCP read timed out after {} bytes, capturing what was received", received
                    );
                    break;
                }
            }
        }

        let mut output = vec![0u8; received];
        let count = processor
            .process_message(&buffer[..received], client_address, &mut output)
            .await?;

        if count > 0 {
            stream.write_all(&output[..count]).await?;
        }

        Ok(())
    }

    /**
     * Handles UDP datagrams
     *
     * Every datagram is one payload. Replies produced by the processor are sent back
     * to the originating address. A failed datagram is logged and skipped, only a
     * receive error stops the listener.
     *
     * @param context The tool context
     * @param processor The message processor to handle the payloads
     * @param socket The UDP socket to receive/send on
     * @return Result indicating success or failure
     */
    async fn handle_udp_socket(
        context: &Arc<Context>,
        processor: T,
        socket: UdpSocket,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut buffer = vec![0u8; context.config.max_message_size];
        let mut output = vec![0u8; context.config.max_message_size];

        loop {
            let (n, client_addr) = socket.recv_from(&mut buffer).await?;

            let count = match processor
                .process_message(&buffer[..n], Some(client_addr), &mut output)
                .await
            {
                Ok(count) => count,
                Err(e) => {
                    error!(context.logger, "UDP capture error from {}: {}", client_addr, e);
                    continue;
                }
            };
            if count > 0 {
                if let Err(e) = socket.send_to(&output[..count], client_addr).await {
                    error!(context.logger, "UDP echo to {} failed: {}", client_addr, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureProcessor;
    use async_trait::async_trait;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Rejects the first payload it sees, echoes every later one
    #[derive(Clone)]
    struct RejectFirst {
        rejected: Arc<AtomicBool>,
    }

    #[async_trait]
    impl MessageProcessor for RejectFirst {
        async fn process_message(
            &self,
            input: &[u8],
            _client_addr: Option<SocketAddr>,
            output: &mut [u8],
        ) -> Result<usize, Box<dyn std::error::Error>> {
            if !self.rejected.swap(true, Ordering::SeqCst) {
                return Err("first payload rejected".into());
            }
            output[..input.len()].copy_from_slice(input);
            Ok(input.len())
        }
    }

    #[tokio::test]
    async fn test_udp_echo() {
        let context = crate::test_context(true);
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let processor = CaptureProcessor::new(&context);
        tokio::spawn(async move {
            let _ = NetworkServer::handle_udp_socket(&context, processor, server).await;
        });

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client
            .send_to(&[0xDE, 0xAD, 0xBE, 0xEF], server_addr)
            .await
            .unwrap();
        let mut reply = [0u8; 16];
        let (n, _) = timeout(Duration::from_secs(5), client.recv_from(&mut reply))
            .await
            .expect("no echo received")
            .unwrap();
        assert_eq!(&reply[..n], &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[tokio::test]
    async fn test_udp_listener_survives_failed_datagram() {
        let context = crate::test_context(true);
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();
        let processor = RejectFirst {
            rejected: Arc::new(AtomicBool::new(false)),
        };
        let handle = tokio::spawn(async move {
            let _ = NetworkServer::handle_udp_socket(&context, processor, server).await;
        });

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(&[0x01], server_addr).await.unwrap();
        client.send_to(&[0x02, 0x03], server_addr).await.unwrap();
        let mut reply = [0u8; 16];
        let (n, _) = timeout(Duration::from_secs(5), client.recv_from(&mut reply))
            .await
            .expect("listener stopped after a failed datagram")
            .unwrap();
        assert_eq!(&reply[..n], &[0x02, 0x03]);
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test]
    async fn test_tcp_idle_timeout_captures_partial_payload() {
        let context = crate::test_context(true);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_addr = listener.local_addr().unwrap();
        let processor = CaptureProcessor::new(&context);
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            NetworkServer::handle_tcp_socket(&context, processor, stream)
                .await
                .map_err(|e| e.to_string())
        });

        // no shutdown: only the idle timeout can end this capture
        let mut client = TcpStream::connect(server_addr).await.unwrap();
        client.write_all(&[7, 8]).await.unwrap();
        let mut reply = [0u8; 2];
        timeout(READ_TIMEOUT + Duration::from_secs(3), client.read_exact(&mut reply))
            .await
            .expect("no echo after idle timeout")
            .unwrap();
        assert_eq!(reply, [7, 8]);
        assert_eq!(handle.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_tcp_echo_until_eof() {
        let context = crate::test_context(true);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_addr = listener.local_addr().unwrap();
        let processor = CaptureProcessor::new(&context);
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            NetworkServer::handle_tcp_socket(&context, processor, stream)
                .await
                .map_err(|e| e.to_string())
        });

        let mut client = TcpStream::connect(server_addr).await.unwrap();
        client.write_all(&[0x00, 0x0A, 0xFF]).await.unwrap();
        client.shutdown().await.unwrap();
        let mut reply = Vec::new();
        timeout(Duration::from_secs(5), client.read_to_end(&mut reply))
            .await
            .expect("no echo received")
            .unwrap();
        assert_eq!(reply, vec![0x00, 0x0A, 0xFF]);
        assert_eq!(handle.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_tcp_capture_stops_at_max_message_size() {
        let context = crate::test_context(true);
        let max = context.config.max_message_size;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_addr = listener.local_addr().unwrap();
        let processor = CaptureProcessor::new(&context);
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let _ = NetworkServer::handle_tcp_socket(&context, processor, stream).await;
        });

        // the connection stays open, the echo must arrive before the read timeout
        let mut client = TcpStream::connect(server_addr).await.unwrap();
        client.write_all(&vec![0x5A; max]).await.unwrap();
        let mut reply = vec![0u8; max];
        timeout(Duration::from_secs(2), client.read_exact(&mut reply))
            .await
            .expect("capture did not stop at max_message_size")
            .unwrap();
        assert!(reply.iter().all(|&b| b == 0x5A));
    }
}
