//! Stdio transport.
//!
//! One JSON-RPC frame per line on stdin, one response per line on stdout.
//! Frames are dispatched concurrently, so responses are written in
//! completion order. Logging must stay on stderr in this mode.

use crate::error::{ServerError, ServerResult};
use crate::mcp::{Dispatcher, JsonRpcResponse};
use crate::transport::session::SESSION_BUFFER;
use crate::transport::{Transport, wait_for_signal};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub struct StdioTransport {
    dispatcher: Dispatcher,
}

impl StdioTransport {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

async fn write_responses(mut rx: mpsc::Receiver<JsonRpcResponse>) {
    let mut stdout = tokio::io::stdout();
    while let Some(response) = rx.recv().await {
        let mut line = match serde_json::to_vec(&response) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize response frame");
                continue;
            }
        };
        line.push(b'\n');

        if let Err(e) = stdout.write_all(&line).await {
            warn!(error = %e, "Failed to write to stdout");
            break;
        }
        if let Err(e) = stdout.flush().await {
            warn!(error = %e, "Failed to flush stdout");
            break;
        }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> ServerResult<()> {
        info!("Starting stdio transport");

        let (tx, rx) = mpsc::channel::<JsonRpcResponse>(SESSION_BUFFER);
        let writer = tokio::spawn(write_responses(rx));

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let signal = wait_for_signal();
        tokio::pin!(signal);

        let interrupted = loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let dispatcher = self.dispatcher.clone();
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            if let Some(response) = dispatcher.handle_raw(&line).await {
                                if tx.send(response).await.is_err() {
                                    debug!("Stdout writer gone, response dropped");
                                }
                            }
                        });
                    }
                    Ok(None) => {
                        info!("stdin closed");
                        break false;
                    }
                    Err(e) => {
                        return Err(ServerError::transport(format!(
                            "Failed to read stdin: {}",
                            e
                        )));
                    }
                },
                _ = &mut signal => break true,
            }
        };

        // In-flight handlers hold sender clones; the writer drains until the
        // last one finishes.
        drop(tx);
        if !interrupted {
            if let Err(e) = writer.await {
                warn!(error = %e, "Stdout writer task failed");
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;

    #[test]
    fn test_stdio_transport_creation() {
        let transport = StdioTransport::new(Dispatcher::new(ToolRegistry::new()));
        assert_eq!(transport.name(), "stdio");
    }
}
