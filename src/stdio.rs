//! Stdio transport
//!
//! One peer, one line-delimited JSON-RPC stream. Frames are handled strictly
//! one at a time: read, dispatch, write, repeat. A handler that hangs stalls
//! the whole connection.
//!
//! Notifications emitted while a request is being dispatched are written as
//! soon as they are emitted, ahead of that request's response.
//!
//! Frames are read as raw bytes. A line longer than `max_message_size` is
//! skipped up to its newline without being buffered.

use {
    crate::{
        dispatcher::McpDispatcher,
        error::{McpError, McpResult},
        framework::notification::NotificationSink,
        logging::{
            connection_span, log_connection_closed, log_connection_opened, log_message_received,
            McpConnectionId,
        },
        peer::PeerState,
    },
    serde_json::Value,
    std::{io, mem, sync::Arc, time::Instant},
    tokio::{
        io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout},
        sync::{mpsc, watch},
    },
    tracing::{debug, Instrument},
};

/// Stops a running stdio loop.
///
/// Safe to call from any thread, including outside the runtime. The loop
/// stops before reading another frame.
#[derive(Debug, Clone)]
pub struct CloseHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl CloseHandle {
    pub fn close(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.sender.borrow()
    }
}

struct StdioSink {
    sender: mpsc::UnboundedSender<Value>,
}

impl NotificationSink for StdioSink {
    // Single peer: every notification goes to it regardless of target
    fn deliver(&self, _target: Option<&str>, envelope: Value) {
        if self.sender.send(envelope).is_err() {
            debug!("Stdio loop gone, notification dropped");
        }
    }
}

enum Frame {
    Line(Vec<u8>),
    Oversized(usize),
}

/// Splits the input into newline-delimited frames, holding at most
/// `max_len` bytes of any one frame.
///
/// All progress lives in the struct, so a `next_frame` future dropped by
/// `select!` loses nothing.
struct FrameReader<R> {
    reader: R,
    max_len: usize,
    buf: Vec<u8>,
    // Bytes seen so far of a frame that went over the limit
    overflow: Option<usize>,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    fn new(reader: R, max_len: usize) -> Self {
        Self {
            reader,
            max_len,
            buf: Vec::new(),
            overflow: None,
        }
    }

    /// Next frame, or `None` once the input is exhausted
    async fn next_frame(&mut self) -> io::Result<Option<Frame>> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(self.finish_frame());
            }
            let newline = available.iter().position(|byte| *byte == b'\n');
            let chunk = &available[..newline.unwrap_or(available.len())];

            match self.overflow.as_mut() {
                Some(seen) => *seen += chunk.len(),
                None if self.buf.len() + chunk.len() > self.max_len => {
                    self.overflow = Some(self.buf.len() + chunk.len());
                    self.buf = Vec::new();
                }
                None => self.buf.extend_from_slice(chunk),
            }

            let consumed = chunk.len() + usize::from(newline.is_some());
            self.reader.consume(consumed);
            if newline.is_some() {
                if let Some(frame) = self.finish_frame() {
                    return Ok(Some(frame));
                }
            }
        }
    }

    fn finish_frame(&mut self) -> Option<Frame> {
        if let Some(seen) = self.overflow.take() {
            return Some(Frame::Oversized(seen));
        }
        if self.buf.is_empty() {
            return None;
        }
        Some(Frame::Line(mem::take(&mut self.buf)))
    }
}

pub struct StdioTransport<R, W> {
    reader: R,
    writer: W,
    close: CloseHandle,
    shutdown: watch::Receiver<bool>,
}

/// Transport over the process's stdin and stdout
pub fn stdio() -> StdioTransport<BufReader<Stdin>, Stdout> {
    StdioTransport::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        let (sender, shutdown) = watch::channel(false);
        Self {
            reader,
            writer,
            close: CloseHandle {
                sender: Arc::new(sender),
            },
            shutdown,
        }
    }

    pub fn close_handle(&self) -> CloseHandle {
        self.close.clone()
    }

    /// Run until the input ends or [`CloseHandle::close`] is called.
    ///
    /// Attaches itself as the dispatcher's notification sink for the
    /// duration of the loop.
    pub async fn serve<C: Send + Sync + 'static>(self, dispatcher: Arc<McpDispatcher<C>>) -> McpResult<()> {
        let connection_id = McpConnectionId::new();
        let opened = Instant::now();
        log_connection_opened(&connection_id, "stdio");

        let (sender, notifications) = mpsc::unbounded_channel();
        dispatcher
            .notifier()
            .attach(Arc::new(StdioSink { sender }));

        let span = connection_span(&connection_id);
        let result = self
            .run(&dispatcher, notifications)
            .instrument(span)
            .await;

        dispatcher.notifier().detach();
        log_connection_closed(&connection_id, opened.elapsed());
        result
    }

    async fn run<C: Send + Sync + 'static>(
        self,
        dispatcher: &McpDispatcher<C>,
        mut notifications: mpsc::UnboundedReceiver<Value>,
    ) -> McpResult<()> {
        let Self {
            reader,
            mut writer,
            close: _close,
            mut shutdown,
        } = self;
        let peer = PeerState::new(None);
        let max_message_size = dispatcher.config().limits.max_message_size;
        let mut frames = FrameReader::new(reader, max_message_size);

        loop {
            tokio::select! {
                biased;
                _ = async { let _ = shutdown.wait_for(|closed| *closed).await; } => {
                    debug!("Stdio transport closed");
                    return Ok(());
                }
                Some(note) = notifications.recv() => write_frame(&mut writer, &note).await?,
                frame = frames.next_frame() => {
                    let line = match frame? {
                        None => {
                            debug!("Input stream ended");
                            return Ok(());
                        }
                        Some(Frame::Oversized(len)) => {
                            log_message_received("stdio", len);
                            let error = McpError::MessageTooLarge(len, max_message_size);
                            write_frame(&mut writer, &error.to_json_rpc_error(None)).await?;
                            continue;
                        }
                        Some(Frame::Line(line)) => line,
                    };
                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }
                    log_message_received("stdio", line.len());

                    let response = {
                        let dispatch = dispatcher.dispatch_bytes(&line, &peer);
                        tokio::pin!(dispatch);
                        loop {
                            tokio::select! {
                                biased;
                                response = &mut dispatch => break response,
                                Some(note) = notifications.recv() => write_frame(&mut writer, &note).await?,
                            }
                        }
                    };

                    while let Ok(note) = notifications.try_recv() {
                        write_frame(&mut writer, &note).await?;
                    }
                    if let Some(response) = response {
                        write_frame(&mut writer, &response).await?;
                    }
                }
            }
        }
    }
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, frame: &Value) -> McpResult<()> {
    let mut bytes = serde_json::to_vec(frame)?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{echo_dispatcher, test_config};

    #[test]
    fn test_close_handle_is_shared() {
        let transport = StdioTransport::new(BufReader::new(tokio::io::empty()), tokio::io::sink());
        let a = transport.close_handle();
        let b = a.clone();
        assert!(!b.is_closed());
        a.close();
        assert!(b.is_closed());
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_serve_future_is_send() {
        let transport = StdioTransport::new(BufReader::new(tokio::io::empty()), tokio::io::sink());
        let dispatcher = Arc::new(echo_dispatcher(test_config()));
        let serving = transport.serve(dispatcher);
        assert_send(&serving);
    }

    async fn collect_frames(input: &'static [u8], max_len: usize) -> Vec<Frame> {
        let mut reader = FrameReader::new(BufReader::with_capacity(4, input), max_len);
        let mut frames = Vec::new();
        while let Some(frame) = reader.next_frame().await.unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn test_frames_split_on_newlines_across_reads() {
        let frames = collect_frames(b"{\"a\":1}\n\n{\"b\":2}", 64).await;
        let lines: Vec<&[u8]> = frames
            .iter()
            .map(|frame| match frame {
                Frame::Line(line) => line.as_slice(),
                Frame::Oversized(_) => panic!("unexpected oversized frame"),
            })
            .collect();
        assert_eq!(lines, [b"{\"a\":1}".as_slice(), b"{\"b\":2}".as_slice()]);
    }

    #[tokio::test]
    async fn test_oversized_frame_is_skipped_not_buffered() {
        let frames = collect_frames(b"0123456789abcdef\nok\n", 8).await;
        assert!(matches!(frames[0], Frame::Oversized(16)));
        assert!(matches!(&frames[1], Frame::Line(line) if line == b"ok"));
        assert_eq!(frames.len(), 2);
    }

    #[tokio::test]
    async fn test_non_utf8_frame_is_passed_through() {
        let frames = collect_frames(b"{\"x\":\"\xff\"}\n", 64).await;
        assert!(matches!(&frames[0], Frame::Line(line) if line.contains(&0xff)));
    }

    #[tokio::test]
    async fn test_write_frame_is_newline_delimited() {
        let mut out = Vec::new();
        write_frame(&mut out, &serde_json::json!({"a": 1})).await.unwrap();
        assert_eq!(out, b"{\"a\":1}\n");
    }
}
