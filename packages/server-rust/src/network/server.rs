//! The legacy-link TCP server: long-lived framed connections, one task per
//! connection, strict FIFO within a connection.
//!
//! Follows the deferred-startup pattern: `new()` allocates shared state,
//! `start()` binds the listener, `serve()` accepts until the shutdown signal
//! fires, then drains in-flight messages under a bounded deadline.
//!
//! Fault handling per the error taxonomy: framing and socket faults close
//! the connection; a frame whose payload cannot be parsed is dropped with a
//! logged error and the connection stays open.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use crossbar_core::{FrameCodec, IsoMessage, WireError};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use super::config::NetworkConfig;
use super::connection::{ConnectionHandle, ConnectionRegistry};
use super::shutdown::ShutdownController;

/// The pipeline a decoded frame is handed to.
///
/// An error is a per-message fault: the server logs it, drops the frame, and
/// keeps the connection open. Implementations must always produce a
/// well-formed reply for accepted messages.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, frame: IsoMessage) -> Result<IsoMessage, WireError>;
}

/// TCP server for the fixed-field legacy protocol.
pub struct IsoServer {
    config: NetworkConfig,
    handler: Arc<dyn MessageHandler>,
    listener: Option<TcpListener>,
    registry: Arc<ConnectionRegistry>,
    shutdown: Arc<ShutdownController>,
}

impl IsoServer {
    /// Creates a server without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            config,
            handler,
            listener: None,
            registry: Arc::new(ConnectionRegistry::new()),
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Shared connection registry, for the admin surface.
    #[must_use]
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Shared shutdown controller, for the admin surface and background
    /// tasks.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Binds the listener and returns the actual bound port.
    ///
    /// # Errors
    ///
    /// Returns an error when the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let listener = TcpListener::bind(&self.config.listen_addr).await?;
        let port = listener.local_addr()?.port();
        info!(addr = %self.config.listen_addr, port, "legacy link listening");
        self.listener = Some(listener);
        Ok(port)
    }

    /// Accepts connections until `shutdown` resolves, then drains.
    ///
    /// # Errors
    ///
    /// Returns an error on a fatal listener fault.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called first.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send) -> anyhow::Result<()> {
        let listener = self
            .listener
            .expect("start() must be called before serve()");
        self.shutdown.set_ready();

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        let handle = self.registry.register(peer_addr);
                        info!(conn = %handle.id, peer = %peer_addr, "connection accepted");
                        tokio::spawn(run_connection(
                            stream,
                            handle,
                            self.config.clone(),
                            Arc::clone(&self.handler),
                            Arc::clone(&self.registry),
                            Arc::clone(&self.shutdown),
                        ));
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },
            }
        }

        // Stop reading new frames, let in-flight messages finish.
        drop(listener);
        self.shutdown.trigger_shutdown();
        if self.shutdown.wait_for_drain(self.config.drain_timeout).await {
            info!("all in-flight messages drained");
        } else {
            warn!(
                in_flight = self.shutdown.in_flight_count(),
                "drain deadline expired with messages in flight"
            );
        }

        let open = self.registry.drain_all();
        if !open.is_empty() {
            info!(connections = open.len(), "closing remaining connections");
        }
        Ok(())
    }
}

/// One task per connection: read a frame, run the pipeline, write the reply,
/// repeat. The next frame is not read until the previous reply was written,
/// which is what guarantees FIFO within the connection.
async fn run_connection(
    stream: TcpStream,
    handle: Arc<ConnectionHandle>,
    config: NetworkConfig,
    handler: Arc<dyn MessageHandler>,
    registry: Arc<ConnectionRegistry>,
    shutdown: Arc<ShutdownController>,
) {
    let mut shutdown_rx = shutdown.shutdown_receiver();
    let mut framed = Framed::new(stream, FrameCodec::with_max_size(config.max_frame_size));

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                debug!(conn = %handle.id, "connection draining");
                break;
            }
            read = tokio::time::timeout(config.idle_timeout, framed.next()) => {
                match read {
                    Err(_) => {
                        info!(conn = %handle.id, "idle deadline reached, closing");
                        break;
                    }
                    Ok(None) => {
                        debug!(conn = %handle.id, "peer closed connection");
                        break;
                    }
                    Ok(Some(Err(e))) => {
                        // Framing is broken; nothing after this can be trusted.
                        warn!(conn = %handle.id, error = %e, "stream fault, closing connection");
                        break;
                    }
                    Ok(Some(Ok(payload))) => {
                        let _guard = shutdown.in_flight_guard();

                        let frame = match IsoMessage::unpack(&payload) {
                            Ok(frame) => frame,
                            Err(e) => {
                                warn!(conn = %handle.id, error = %e, "parse fault, dropping frame");
                                continue;
                            }
                        };

                        match handler.handle_message(frame).await {
                            Ok(reply) => {
                                if let Err(e) = framed.send(reply.pack()).await {
                                    warn!(conn = %handle.id, error = %e, "reply write failed, closing");
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(conn = %handle.id, error = %e, "message rejected, dropping frame");
                            }
                        }
                    }
                }
            }
        }
    }

    registry.remove(handle.id);
    info!(conn = %handle.id, peer = %handle.peer_addr, "connection closed");
}
