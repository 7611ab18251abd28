//! Line-delimited stream adapter.
//!
//! One JSON object per line, UTF-8, newline-terminated: events on the
//! output stream, commands on the input stream. This is the sidecar IPC
//! transport — a desktop shell spawns the host process and reads its
//! stdout while feeding commands into its stdin.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uplink_protocol::{BridgeError, BridgeResult, UIEvent, UiAdapter, UICommand};

pub struct LineStreamAdapter<W> {
    writer: tokio::sync::Mutex<W>,
    command_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<BridgeResult<UICommand>>>,
    reader_task: JoinHandle<()>,
}

impl<W> LineStreamAdapter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Adapter writing events to `writer` and decoding commands from
    /// `reader` on a background task until EOF.
    pub fn new<R>(reader: R, writer: W) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let reader_task = tokio::spawn(read_commands(reader, command_tx));
        Self {
            writer: tokio::sync::Mutex::new(writer),
            command_rx: tokio::sync::Mutex::new(command_rx),
            reader_task,
        }
    }

    /// Write several events with a single flush.
    pub async fn emit_batch(&self, events: &[UIEvent]) -> BridgeResult<()> {
        let mut output = String::new();
        for event in events {
            output.push_str(&event.to_json()?);
            output.push('\n');
        }
        let mut writer = self.writer.lock().await;
        writer
            .write_all(output.as_bytes())
            .await
            .map_err(|error| BridgeError::Transport(error.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|error| BridgeError::Transport(error.to_string()))
    }
}

impl<W> Drop for LineStreamAdapter<W> {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

#[async_trait]
impl<W> UiAdapter for LineStreamAdapter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn emit(&self, event: UIEvent) -> BridgeResult<()> {
        let line = event.to_json()?;
        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|error| BridgeError::Transport(error.to_string()))?;
        writer
            .write_all(b"\n")
            .await
            .map_err(|error| BridgeError::Transport(error.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|error| BridgeError::Transport(error.to_string()))
    }

    async fn recv_command(&self) -> Option<BridgeResult<UICommand>> {
        self.command_rx.lock().await.recv().await
    }
}

async fn read_commands<R>(reader: R, tx: mpsc::UnboundedSender<BridgeResult<UICommand>>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let parsed = UICommand::from_json(&line);
                if tx.send(parsed).is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!("command stream reached EOF");
                break;
            }
            Err(error) => {
                warn!(%error, "command stream read failed");
                break;
            }
        }
    }
}

/// Stdio variant for sidecar integration: events to stdout, commands from
/// stdin.
pub type StdioAdapter = LineStreamAdapter<Stdout>;

impl StdioAdapter {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}
