//! Terminal presenter and the interactive read-eval loop.

use std::io::Write;

use image::{DynamicImage, GenericImageView};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::commands::parse_command;
use crate::plugins::vision::VisionModel;
use crate::services::assistant::{Assistant, Flow, Presenter};
use crate::services::prompts;

const PROMPT: &str = "> ";

/// Writes session output as plain text lines.
pub struct TerminalView<W: Write> {
    out: W,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        // A closed stdout is not worth crashing the session over.
        let _ = writeln!(self.out, "{}", text);
        let _ = self.out.flush();
    }

    fn prompt(&mut self) {
        let _ = write!(self.out, "{}", PROMPT);
        let _ = self.out.flush();
    }
}

impl<W: Write> Presenter for TerminalView<W> {
    fn header(&mut self) {
        self.line(&prompts::header_banner());
        self.line("Type 'help' for commands.");
    }

    fn image(&mut self, image: &DynamicImage, origin: &str) {
        let (w, h) = image.dimensions();
        self.line(&format!("[image] {}x{} ({})", w, h, origin));
    }

    fn success(&mut self, message: &str) {
        self.line(&format!("[ok] {}", message));
    }

    fn error(&mut self, message: &str) {
        self.line(&format!("[error] {}", message));
    }

    fn info(&mut self, message: &str) {
        self.line(message);
    }
}

/// Read commands from `input` until `quit` or end of input.
///
/// Each command runs to completion before the next line is read.
pub async fn run_session<M, W, R>(
    assistant: &mut Assistant<M, TerminalView<W>>,
    input: R,
) -> std::io::Result<()>
where
    M: VisionModel,
    W: Write,
    R: AsyncBufRead + Unpin,
{
    assistant.view_mut().header();
    let mut lines = input.lines();

    loop {
        assistant.view_mut().prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_command(&line) {
            Ok(command) => {
                if assistant.handle(command).await == Flow::Quit {
                    break;
                }
            }
            Err(usage) => assistant.view_mut().error(&usage),
        }
    }

    log::info!("Session ended");
    Ok(())
}
