//! Hiding the model's reasoning segment.
//!
//! Reasoning models wrap their chain of thought in `<think> … </think>`
//! before the final answer.

pub const THINK_END: &str = "</think>";

/// Text to show for `reply` under the given toggle.
///
/// With `show_thinking` on, the reply is returned as is. With it off and an
/// end marker present, only the text after the last end marker is kept,
/// trimmed. A reply without an end marker is never altered.
pub fn visible(reply: &str, show_thinking: bool) -> &str {
    if show_thinking {
        return reply;
    }
    match reply.rsplit_once(THINK_END) {
        Some((_, answer)) => answer.trim(),
        None => reply,
    }
}
