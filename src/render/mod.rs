//! Plain-terminal rendering of conversation turns.

use crate::conversation::{ConversationLog, Role, Turn};

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};

/// Render assistant markdown as readable terminal text.
///
/// Headings are underlined, list items get bullets or numbers, code blocks
/// are indented and links keep their target in parentheses.
pub fn to_terminal(markdown: &str) -> String {
    let mut out = String::new();
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut heading: Option<(HeadingLevel, usize)> = None;
    let mut in_code = false;
    let mut link_target: Option<String> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                heading = Some((level, out.len()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, start)) = heading.take() {
                    let width = out[start..].chars().count();
                    let rule = if level == HeadingLevel::H1 { '=' } else { '-' };
                    out.push('\n');
                    out.extend(std::iter::repeat(rule).take(width));
                }
                out.push_str("\n\n");
            }
            Event::End(TagEnd::Paragraph) => {
                out.push_str(if lists.is_empty() { "\n\n" } else { "\n" });
            }
            Event::Start(Tag::List(start)) => lists.push(start),
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                let depth = lists.len().saturating_sub(1);
                out.push_str(&"  ".repeat(depth));
                match lists.last_mut() {
                    Some(Some(n)) => {
                        out.push_str(&format!("{n}. "));
                        *n += 1;
                    }
                    _ => out.push_str("• "),
                }
            }
            Event::End(TagEnd::Item) => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        out.push_str(&format!("    [{lang}]\n"));
                    }
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code = false;
                out.push('\n');
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                link_target = Some(dest_url.to_string());
            }
            Event::End(TagEnd::Link) => {
                if let Some(url) = link_target.take() {
                    out.push_str(&format!(" ({url})"));
                }
            }
            Event::Text(text) => {
                if in_code {
                    for line in text.lines() {
                        out.push_str("    ");
                        out.push_str(line);
                        out.push('\n');
                    }
                } else {
                    out.push_str(&text);
                }
            }
            Event::Code(code) => {
                out.push('`');
                out.push_str(&code);
                out.push('`');
            }
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => out.push_str("────────\n\n"),
            _ => {}
        }
    }

    out.trim_end().to_string()
}

/// Render one turn with a speaker label.
pub fn turn(turn: &Turn) -> String {
    match turn.role() {
        Role::User => {
            let mut line = format!("You: {}", turn.text());
            if turn.image().is_some() {
                line.push_str(" [image]");
            }
            line
        }
        Role::Assistant if turn.is_pending() => "Assistant: Thinking...".to_string(),
        Role::Assistant => format!("Assistant: {}", to_terminal(&turn.text())),
        Role::System => String::new(),
    }
}

/// Render all visible turns of a conversation.
pub fn transcript(log: &ConversationLog) -> String {
    log.visible_turns()
        .iter()
        .map(turn)
        .collect::<Vec<_>>()
        .join("\n\n")
}
