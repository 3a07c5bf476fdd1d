use async_trait::async_trait;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::io::Write;

use crate::error::Result;
use crate::llm::{Answer, RagChain};

pub const PROMPT: &str = "\nEnter your question about the document: ";

/// Something that can be asked a question.
#[async_trait]
pub trait QuestionAnswerer {
    async fn answer(&self, question: &str) -> Result<Answer>;
}

#[async_trait]
impl QuestionAnswerer for RagChain {
    async fn answer(&self, question: &str) -> Result<Answer> {
        self.invoke(question).await
    }
}

/// Blocking source of input lines. `Ok(None)` means the input was closed.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>>;
}

pub struct TerminalInput {
    editor: Editor<(), DefaultHistory>,
}

impl TerminalInput {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            editor: Editor::<(), DefaultHistory>::new()?,
        })
    }
}

impl LineSource for TerminalInput {
    fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                Ok(None)
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                Ok(None)
            }
            Err(ReadlineError::Io(e)) => Err(e),
            Err(err) => Err(std::io::Error::new(std::io::ErrorKind::Other, err.to_string())),
        }
    }
}

/// Question/answer loop. There is no exit command: the loop runs until the
/// input source is interrupted or closed.
pub struct QuestionLoop<A, W> {
    answerer: A,
    output: W,
}

impl<A: QuestionAnswerer, W: Write> QuestionLoop<A, W> {
    pub fn new(answerer: A, output: W) -> Self {
        Self { answerer, output }
    }

    /// Returns the number of questions asked, answered or not.
    pub async fn run<L: LineSource>(&mut self, input: &mut L) -> std::io::Result<usize> {
        let mut asked = 0;
        while let Some(line) = input.read_line(PROMPT)? {
            let question = line.trim_end_matches(['\r', '\n']);
            asked += 1;
            match self.answerer.answer(question).await {
                Ok(answer) => writeln!(self.output, "\nAnswer: {}", answer.text)?,
                Err(e) => {
                    log::debug!("Query failed: {:?}", e);
                    writeln!(self.output, "{}", format!("An error occurred: {}", e).as_str().red())?
                }
            }
            self.output.flush()?;
        }
        Ok(asked)
    }
}
