// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MarkdownV2 escaping for provider replies.
//!
//! Outside code spans every reserved character is escaped. Inside inline
//! code or fenced blocks only `` ` `` and `\` need escaping, and Telegram
//! renders the span verbatim.

const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escapes `text` for `ParseMode::MarkdownV2`.
///
/// Code spans are only honoured when closed; an unmatched backtick is
/// escaped like any other reserved character.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut rest = text;

    while !rest.is_empty() {
        let fence = if rest.starts_with("```") { "```" } else { "`" };
        if rest.starts_with('`') {
            if let Some(end) = rest[fence.len()..].find(fence) {
                let body = &rest[fence.len()..fence.len() + end];
                out.push_str(fence);
                push_code(&mut out, body);
                out.push_str(fence);
                rest = &rest[fence.len() * 2 + end..];
                continue;
            }
        }

        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            if RESERVED.contains(&ch) || ch == '\\' {
                out.push('\\');
            }
            out.push(ch);
        }
        rest = chars.as_str();
    }
    out
}

fn push_code(out: &mut String, body: &str) {
    for ch in body.chars() {
        if ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
}
