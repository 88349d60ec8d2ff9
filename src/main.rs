use capture::CaptureProcessor;
/**
 * This module defines the main entry point for the hexlit capture tool and the server implementation.
 */
use slog::{info, Logger};
use std::process;
use std::sync::Arc;

mod capture;
mod config;
mod logging;
mod net;

/**
 * Represents the context for the capture tool.
 *
 * Fields:
 * - `config`: The configuration settings.
 * - `logger`: The logger instance.
 */
#[derive(Debug)]
pub(crate) struct Context {
    pub(crate) config: config::Settings,
    pub(crate) logger: Logger,
}

pub struct CaptureServer {
    context: Arc<Context>,
}

impl CaptureServer {
    /**
     * Creates a new `CaptureServer` instance.
     *
     * This function loads the configuration and initializes the logger, and creates
     * a new `CaptureServer` instance with the initialized context.
     *
     * @return An `Arc` containing the new `CaptureServer` instance, or the configuration error.
     */
    pub fn new() -> Result<Arc<Self>, ::config::ConfigError> {
        let cfg = config::Settings::new()?;

        let context = Context {
            logger: logging::init_logger(&cfg),
            config: cfg,
        };

        Ok(Arc::new(Self {
            context: Arc::new(context),
        }))
    }

    /**
     * Run the capture tool.
     *
     * This function sets up the TCP and UDP listeners based on the configuration,
     * and starts capturing. It blocks until terminated or both listeners exit
     *
     * @return A `Result` indicating success or failure.
     */
    pub async fn run(self: Arc<Self>) -> Result<(), Box<dyn std::error::Error>> {
        let mut handles = vec![];

        info!(
            self.context.logger,
            "Starting capture";
            "echo" => self.context.config.echo,
            "max_message_size" => self.context.config.max_message_size
        );

        let processor = CaptureProcessor::new(&self.context);
        let network_server = net::NetworkServer::new(&self.context, processor);

        if !self.context.config.disable_tcp {
            let tcp_handle = network_server.setup_tcp_listener().await?;
            handles.push(tcp_handle);
        }

        if !self.context.config.disable_udp {
            let udp_handle = network_server.setup_udp_listener().await?;
            handles.push(udp_handle);
        }

        if handles.is_empty() {
            return Err("Both TCP and UDP listeners are disabled".into());
        }

        // Join handles
        for handle in handles {
            handle.await?;
        }
        Ok(())
    }
}

/**
 * Settings with small buffers and ephemeral localhost ports, for tests.
 */
#[cfg(test)]
pub(crate) fn test_settings(echo: bool) -> config::Settings {
    use crate::config::environment_type::EnvironmentType;

    config::Settings {
        environment: EnvironmentType::development,
        tcp_bind_address: "127.0.0.1:0".to_string(),
        udp_bind_address: "127.0.0.1:0".to_string(),
        disable_tcp: false,
        disable_udp: false,
        echo,
        max_message_size: 64,
        log_level: slog::Level::Trace,
    }
}

/**
 * Context with a discarding logger, for tests.
 */
#[cfg(test)]
pub(crate) fn test_context(echo: bool) -> Arc<Context> {
    Arc::new(Context {
        config: test_settings(echo),
        logger: logging::discard_logger(),
    })
}

/**
 * The main entry point for the application, it creates
 * the server object and passes control to it.
 */
#[tokio::main]
async fn main() {
    let server = match CaptureServer::new() {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        eprintln!("Capture failed: {}", e);
        process::exit(1);
    }
}
