//! Interactive terminal channel.
//!
//! Reads one question at a time with rustyline on a dedicated thread and does
//! not prompt again until the answer has been printed.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::sync::mpsc as std_mpsc;

use async_trait::async_trait;
use crossterm::style::Stylize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::{Notify, mpsc};
use tokio_stream::wrappers::ReceiverStream;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse, StatusUpdate};
use crate::error::ChannelError;
use crate::present::Presentation;

const PROMPT: &str = "You> ";

const ABOUT: &str = "Query the Chinook database using natural language. \
Ask a question, and the AI will generate an SQL query and execute it.";

const SAMPLE_QUESTIONS: [&str; 3] = [
    "How many tracks are there?",
    "List all artists and their albums.",
    "What are the top 5 bestselling tracks?",
];

/// Terminal REPL channel.
pub struct ReplChannel {
    export_dir: PathBuf,
    color: bool,
    /// Signals the reader thread that the answer was printed.
    ready: Mutex<Option<std_mpsc::Sender<()>>>,
    /// Notified once the user ends input.
    closed: Arc<Notify>,
}

impl ReplChannel {
    pub fn new(export_dir: PathBuf) -> Self {
        Self {
            export_dir,
            color: true,
            ready: Mutex::new(None),
            closed: Arc::new(Notify::new()),
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Render an answer as terminal text, writing any export to disk.
    pub fn render_response(&self, response: &OutgoingResponse) -> String {
        let mut out = Vec::new();

        for notice in &response.notices {
            out.push(self.paint_error(notice));
        }

        match &response.presentation {
            Some(Presentation::Inline(table)) => out.push(table.to_string()),
            Some(Presentation::Export(artifact)) => match artifact.write_to_dir(&self.export_dir) {
                Ok(path) => out.push(format!(
                    "{} rows × {} columns is too large to show here. Excel file saved to {}",
                    artifact.row_count,
                    artifact.column_count,
                    path.display()
                )),
                Err(e) => out.push(self.paint_error(&format!("Error saving Excel file: {}", e))),
            },
            None => {}
        }

        if !response.content.is_empty() {
            let label = if self.color {
                "AI:".bold().to_string()
            } else {
                "AI:".to_string()
            };
            out.push(format!("{} {}", label, response.content));
        }

        out.join("\n\n")
    }

    /// Resolves after the user types `exit` or closes input.
    ///
    /// Other channels keep the merged stream open, so the binary waits on
    /// this to end the session.
    pub async fn closed(&self) {
        self.closed.notified().await;
    }

    fn paint_error(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    fn paint_dim(&self, text: &str) -> String {
        if self.color {
            text.dark_grey().to_string()
        } else {
            text.to_string()
        }
    }

    fn signal_ready(&self) {
        if let Ok(guard) = self.ready.lock() {
            if let Some(tx) = guard.as_ref() {
                let _ = tx.send(());
            }
        }
    }
}

fn banner(color: bool) -> String {
    let title = if color {
        "Gemini SQL Query Chatbot".bold().to_string()
    } else {
        "Gemini SQL Query Chatbot".to_string()
    };

    let mut lines = vec![title, ABOUT.to_string(), String::new()];
    lines.push("Sample questions:".to_string());
    for (i, q) in SAMPLE_QUESTIONS.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, q));
    }
    lines.push(String::new());
    lines.push("Type 'exit' or press Ctrl-D to quit.".to_string());
    lines.join("\n")
}

/// Blocking read loop run on the REPL thread.
fn read_loop(
    tx: mpsc::Sender<IncomingMessage>,
    ready_rx: std_mpsc::Receiver<()>,
    color: bool,
    closed: Arc<Notify>,
) {
    input_loop(tx, ready_rx, color);
    closed.notify_one();
}

fn input_loop(tx: mpsc::Sender<IncomingMessage>, ready_rx: std_mpsc::Receiver<()>, color: bool) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            tracing::error!("Failed to initialize line editor: {}", e);
            return;
        }
    };

    println!("{}\n", banner(color));

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if matches!(line, "exit" | "quit") {
                    break;
                }
                let _ = rl.add_history_entry(line);

                if tx
                    .blocking_send(IncomingMessage::new("repl", "local", line))
                    .is_err()
                {
                    break;
                }
                // Wait for the answer before prompting again.
                if ready_rx.recv().is_err() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                tracing::error!("Readline error: {}", e);
                break;
            }
        }
    }

    tracing::debug!("REPL input closed");
}

#[async_trait]
impl Channel for ReplChannel {
    fn name(&self) -> &str {
        "repl"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = mpsc::channel(1);
        let (ready_tx, ready_rx) = std_mpsc::channel();

        if let Ok(mut ready) = self.ready.lock() {
            *ready = Some(ready_tx);
        }

        let color = self.color;
        let closed = Arc::clone(&self.closed);
        std::thread::Builder::new()
            .name("repl".to_string())
            .spawn(move || read_loop(tx, ready_rx, color, closed))
            .map_err(|e| ChannelError::StartupFailed {
                name: "repl".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let text = self.render_response(&response);
        if !text.is_empty() {
            println!("{}\n", text);
        }
        self.signal_ready();
        Ok(())
    }

    async fn send_status(
        &self,
        _msg: &IncomingMessage,
        status: StatusUpdate,
    ) -> Result<(), ChannelError> {
        match status {
            StatusUpdate::Thinking(text) => println!("{}", self.paint_dim(&text)),
            StatusUpdate::GeneratedSql(sql) => {
                println!("{}", self.paint_dim(&format!("SQL: {}", sql)))
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        match self.ready.lock() {
            Ok(guard) if guard.is_some() => Ok(()),
            _ => Err(ChannelError::HealthCheckFailed {
                name: "repl".to_string(),
            }),
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        if let Ok(mut ready) = self.ready.lock() {
            *ready = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::present::{ExportArtifact, InlineTable};
    use crate::query::QueryResult;
    use tempfile::tempdir;

    fn count_result() -> QueryResult {
        QueryResult::new(vec!["count".to_string()], vec![vec![Some("3503".to_string())]])
    }

    #[test]
    fn test_render_inline_answer() {
        let channel = ReplChannel::new(PathBuf::from(".")).with_color(false);
        let response = OutgoingResponse {
            content: "There are 3503 tracks.".to_string(),
            sql: Some("SELECT COUNT(*) FROM Track".to_string()),
            presentation: Some(Presentation::Inline(InlineTable::new(&count_result(), 10))),
            notices: vec![],
        };

        let text = channel.render_response(&response);
        assert!(text.contains("| 3503  |"));
        assert!(text.ends_with("AI: There are 3503 tracks."));
    }

    #[test]
    fn test_render_export_writes_file() {
        let dir = tempdir().unwrap();
        let channel = ReplChannel::new(dir.path().to_path_buf()).with_color(false);
        let artifact = ExportArtifact::from_result(&count_result()).unwrap();
        let response = OutgoingResponse {
            content: "Summary".to_string(),
            presentation: Some(Presentation::Export(artifact)),
            ..Default::default()
        };

        let text = channel.render_response(&response);
        assert!(text.contains("Excel file saved to"));
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_render_notices_first() {
        let channel = ReplChannel::new(PathBuf::from(".")).with_color(false);
        let response = OutgoingResponse {
            content: "No results found or error in query execution.".to_string(),
            notices: vec!["Error executing SQL query: syntax error".to_string()],
            ..Default::default()
        };

        let text = channel.render_response(&response);
        assert_eq!(
            text,
            "Error executing SQL query: syntax error\n\nAI: No results found or error in query execution."
        );
    }

    #[test]
    fn test_banner_without_color_is_plain() {
        let text = banner(false);
        assert!(text.starts_with("Gemini SQL Query Chatbot\n"));
        assert!(text.contains("  3. What are the top 5 bestselling tracks?"));
        assert!(!text.contains('\u{1b}'));
    }

    #[tokio::test]
    async fn test_closed_resolves_when_reader_finished_first() {
        let channel = ReplChannel::new(PathBuf::from("."));
        let closed = Arc::clone(&channel.closed);

        // The reader thread can end before anyone waits.
        std::thread::spawn(move || closed.notify_one()).join().unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), channel.closed())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_health_requires_start() {
        let channel = ReplChannel::new(PathBuf::from("."));
        assert!(channel.health_check().await.is_err());
    }
}
