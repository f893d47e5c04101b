//! CLI channel — stdin/stdout REPL.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse, StatusUpdate};
use crate::error::ChannelError;

/// Typing this ends the session.
pub const QUIT_COMMAND: &str = "/quit";

type Input = Box<dyn AsyncRead + Send + Unpin>;

/// A CLI channel that reads lines from stdin and writes to stdout.
pub struct CliChannel {
    input: std::sync::Mutex<Option<Input>>,
}

impl CliChannel {
    pub fn new() -> Self {
        Self::with_input(tokio::io::stdin())
    }

    /// Read from an arbitrary source instead of stdin.
    pub fn with_input(input: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            input: std::sync::Mutex::new(Some(Box::new(input))),
        }
    }

    fn take_input(&self) -> Option<Input> {
        self.input.lock().ok().and_then(|mut guard| guard.take())
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let input = self.take_input().ok_or_else(|| ChannelError::StartupFailed {
            name: "cli".to_string(),
            reason: "input already consumed".to_string(),
        })?;
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut lines = BufReader::new(input).lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        if line == QUIT_COMMAND {
                            break;
                        }
                        let msg = IncomingMessage::new("cli", "local-user", &line);
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(&self, response: OutgoingResponse) -> Result<(), ChannelError> {
        println!("\n{}\n", response.content);
        Ok(())
    }

    async fn send_status(&self, status: StatusUpdate) -> Result<(), ChannelError> {
        match status {
            StatusUpdate::Thinking(msg) => eprintln!("⏳ {}", msg),
            StatusUpdate::Status(msg) => eprintln!("ℹ️  {}", msg),
            StatusUpdate::Error(msg) => eprintln!("❌ {}", msg),
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        eprintln!("👋 Goodbye!");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn lines_become_messages_until_quit() {
        let channel = CliChannel::with_input(&b"  hello \n\nMy child is Leo, 7\n/quit\nignored\n"[..]);
        let messages: Vec<String> = channel
            .start()
            .await
            .unwrap()
            .map(|m| m.content)
            .collect()
            .await;
        assert_eq!(messages, vec!["hello", "My child is Leo, 7"]);
    }

    #[tokio::test]
    async fn eof_ends_stream() {
        let channel = CliChannel::with_input(&b"only line"[..]);
        let mut stream = channel.start().await.unwrap();
        let first = stream.next().await.unwrap();
        assert_eq!(first.channel, "cli");
        assert_eq!(first.content, "only line");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn start_twice_fails() {
        let channel = CliChannel::with_input(&b""[..]);
        let _stream = channel.start().await.unwrap();
        assert!(matches!(
            channel.start().await,
            Err(ChannelError::StartupFailed { .. })
        ));
    }
}
