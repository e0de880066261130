use ragchat_types::ThreadId;
use ragchat_ui::render::{
    render_conversation_list, render_status, render_transcript, transcript_delta, THINKING,
};
use ragchat_ui::Shell;
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::command::{parse_input, Command, Input, LineJoiner, Target, HELP};
use crate::error::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Line-oriented front end over a [`Shell`]
///
/// Only transcript lines that were not printed yet are written; a replaced
/// transcript (thread switch, failed load) is printed again from the top.
pub struct Repl<W: Write> {
    shell: Shell,
    out: W,
    joiner: LineJoiner,
    printed: Vec<String>,
    printed_thread: Option<ThreadId>,
    thinking_shown: bool,
}

impl<W: Write> Repl<W> {
    pub fn new(shell: Shell, out: W) -> Self {
        Self {
            shell,
            out,
            joiner: LineJoiner::default(),
            printed: Vec::new(),
            printed_thread: None,
            thinking_shown: false,
        }
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut Shell {
        &mut self.shell
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run until `/quit` or end of input
    ///
    /// At end of input the requests already issued are waited for, so piped
    /// sessions print their answers.
    pub async fn run<R>(&mut self, input: R) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        self.shell.mount();
        self.render()?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if self.handle_line(&line)? == Flow::Quit {
                                break;
                            }
                        }
                        None => {
                            self.shell.settle().await;
                            self.render()?;
                            break;
                        }
                    }
                }
                Some(event) = self.shell.next_event() => {
                    self.shell.handle_event(event);
                }
            }
            self.render()?;
        }

        self.shell.unmount();
        tracing::debug!("Session ended");
        Ok(())
    }

    /// Handle one raw input line
    pub fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        let Some(entry) = self.joiner.push(line) else {
            return Ok(Flow::Continue);
        };

        match parse_input(&entry) {
            Ok(Input::Command(command)) => self.handle_command(command),
            Ok(Input::Message(text)) => {
                self.handle_text(text)?;
                Ok(Flow::Continue)
            }
            Err(err) => {
                writeln!(self.out, "{}", err)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn handle_text(&mut self, text: String) -> io::Result<()> {
        if self.shell.list().pending_delete().is_some() {
            let confirmed = matches!(text.trim().to_lowercase().as_str(), "y" | "yes");
            if confirmed {
                self.shell.confirm_delete();
            } else {
                self.shell.cancel_delete();
                writeln!(self.out, "Delete cancelled")?;
            }
            return Ok(());
        }

        if self.shell.list().rename_draft().is_some() {
            self.shell.edit_rename(text.trim());
            if !self.shell.confirm_rename() {
                writeln!(self.out, "Title cannot be empty (/cancel to keep the current one)")?;
            }
            return Ok(());
        }

        self.shell.set_input(text);
        if !self.shell.chat().can_send() {
            if self.shell.chat().is_thinking() {
                writeln!(self.out, "Still waiting for the previous answer")?;
            }
            return Ok(());
        }
        if let Err(err) = self.shell.submit() {
            tracing::debug!(error = %err, "Submit rejected");
        }
        Ok(())
    }

    fn handle_command(&mut self, command: Command) -> io::Result<Flow> {
        match command {
            Command::Quit => return Ok(Flow::Quit),
            Command::New => self.shell.new_chat(),
            Command::List => self.print_list()?,
            Command::Open(target) => match self.resolve(&target) {
                Ok(thread_id) => self.shell.select_thread(thread_id),
                Err(err) => writeln!(self.out, "{}", err)?,
            },
            Command::Rename { row, title } => match self.resolve(&Target::Row(row)) {
                Ok(thread_id) => {
                    self.shell.start_rename(&thread_id);
                    match title {
                        Some(title) => {
                            self.shell.edit_rename(title);
                            if !self.shell.confirm_rename() {
                                writeln!(self.out, "Title cannot be empty (/cancel to keep the current one)")?;
                            }
                        }
                        None => {
                            let current = self.title_of(&thread_id);
                            writeln!(self.out, "New title for \"{}\" (/cancel to abort):", current)?;
                        }
                    }
                }
                Err(err) => writeln!(self.out, "{}", err)?,
            },
            Command::Delete(row) => match self.resolve(&Target::Row(row)) {
                Ok(thread_id) => {
                    self.shell.request_delete(&thread_id);
                    let title = self.title_of(&thread_id);
                    writeln!(self.out, "Delete \"{}\"? [y/N]", title)?;
                }
                Err(err) => writeln!(self.out, "{}", err)?,
            },
            Command::Cancel => {
                self.shell.cancel_rename();
                self.shell.cancel_delete();
            }
            Command::Status => {
                for line in render_status(self.shell.status(), self.shell.sidebar_open()) {
                    writeln!(self.out, "{}", line)?;
                }
            }
            Command::Sidebar => {
                self.shell.toggle_sidebar();
                self.print_list()?;
            }
            Command::Help => writeln!(self.out, "{}", HELP)?,
        }
        Ok(Flow::Continue)
    }

    fn resolve(&self, target: &Target) -> Result<ThreadId, CommandError> {
        match target {
            Target::Row(row) => row
                .checked_sub(1)
                .and_then(|index| self.shell.list().get(index))
                .map(|c| c.thread_id.clone())
                .ok_or(CommandError::NoSuchRow(*row)),
            Target::Thread(thread_id) => Ok(thread_id.clone()),
        }
    }

    fn title_of(&self, thread_id: &ThreadId) -> String {
        self.shell
            .list()
            .find(thread_id)
            .map(|c| c.display_title().to_string())
            .unwrap_or_else(|| thread_id.to_string())
    }

    fn print_list(&mut self) -> io::Result<()> {
        let lines = render_conversation_list(
            self.shell.list(),
            self.shell.active(),
            self.shell.sidebar_open(),
        );
        for line in lines {
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }

    /// Print notifications and whatever changed in the transcript
    pub fn render(&mut self) -> io::Result<()> {
        for notification in self.shell.take_notifications() {
            let prefix = if notification.is_error() { "!" } else { "i" };
            writeln!(self.out, "{} {}", prefix, notification.message)?;
        }

        let current = render_transcript(self.shell.chat());
        let thread = self.shell.chat().thread_id().cloned();
        let switched = thread != self.printed_thread;
        let (replaced, fresh) = transcript_delta(&self.printed, &current);

        if switched || replaced {
            writeln!(self.out)?;
            if let Some(title) = self.shell.chat().title() {
                writeln!(self.out, "== {} ==", title)?;
            }
            for line in &current {
                writeln!(self.out, "{}", line)?;
            }
        } else {
            for line in fresh {
                writeln!(self.out, "{}", line)?;
            }
        }
        self.printed = current;
        self.printed_thread = thread;

        let thinking = self.shell.chat().is_thinking();
        if thinking && !self.thinking_shown {
            writeln!(self.out, "{}", THINKING)?;
        }
        self.thinking_shown = thinking;

        self.out.flush()
    }
}
