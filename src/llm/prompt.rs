//! Prompt template with `{context}` and `{question}` slots.
//!
//! Literal braces are written `{{` and `}}`. Templates are parsed once so
//! user text substituted into one slot is never scanned for placeholders.

use crate::error::{RagError, Result};

pub const DEFAULT_TEMPLATE: &str = "Answer the question based on the following context:

Context:
{context}

Question: {question}

Answer: Let me help you with that based on the information provided.";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Context,
    Question,
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl Default for PromptTemplate {
    /// The parsed form of [`DEFAULT_TEMPLATE`].
    fn default() -> Self {
        Self {
            segments: vec![
                Segment::Literal("Answer the question based on the following context:\n\nContext:\n".to_string()),
                Segment::Context,
                Segment::Literal("\n\nQuestion: ".to_string()),
                Segment::Question,
                Segment::Literal(
                    "\n\nAnswer: Let me help you with that based on the information provided.".to_string(),
                ),
            ],
        }
    }
}

impl PromptTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(RagError::Configuration(
                            "Prompt template has an unclosed '{'".to_string(),
                        ));
                    }
                    let slot = match name.trim() {
                        "context" => Segment::Context,
                        "question" => Segment::Question,
                        other => {
                            return Err(RagError::Configuration(format!(
                                "Unknown prompt placeholder: {{{}}}",
                                other
                            )))
                        }
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(slot);
                }
                '}' => {
                    return Err(RagError::Configuration(
                        "Prompt template has an unmatched '}'".to_string(),
                    ))
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        for (slot, name) in [(Segment::Context, "context"), (Segment::Question, "question")] {
            if !segments.contains(&slot) {
                return Err(RagError::Configuration(format!(
                    "Prompt template must contain {{{}}}",
                    name
                )));
            }
        }

        Ok(Self { segments })
    }

    pub fn format(&self, context: &str, question: &str) -> String {
        let mut prompt = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => prompt.push_str(text),
                Segment::Context => prompt.push_str(context),
                Segment::Question => prompt.push_str(question),
            }
        }
        prompt
    }
}
