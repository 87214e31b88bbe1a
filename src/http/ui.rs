//! The chat page served at `/`.
//!
//! A single static document; all state lives on the server and is fetched
//! through `/api/sessions`. The bot name is substituted in at request time.

use axum::{extract::State, response::Html};

use super::AppState;
use crate::documents::table::escape_html;

const PAGE_HTML: &str = include_str!("page.html");
const BOT_NAME_SLOT: &str = "{{bot_name}}";

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /: the chat page.
pub(super) async fn root(State(state): State<AppState>) -> Html<String> {
    Html(render(&state.bot_name))
}

fn render(bot_name: &str) -> String {
    PAGE_HTML.replace(BOT_NAME_SLOT, &escape_html(bot_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_name_is_escaped_into_every_slot() {
        let page = render("R&D <bot>");
        assert!(!page.contains(BOT_NAME_SLOT));
        assert!(page.contains("R&amp;D &lt;bot&gt;"));
        assert!(!page.contains("<bot>"));
    }

    #[test]
    fn attached_document_is_drawn_from_session_state() {
        // A reloaded tab only has the session view, so the file name and
        // its remove control must come from `session.document`.
        assert!(PAGE_HTML.contains("const doc = session.document;"));
        assert!(PAGE_HTML.contains("File uploaded: ${doc.name}"));
        assert!(PAGE_HTML.contains(r#"remove.id = "remove-document";"#));
        assert!(PAGE_HTML.contains(r#"api("DELETE", `/api/sessions/${session.session_id}/document`)"#));

        let render = &PAGE_HTML[PAGE_HTML.find("function render()").unwrap()..];
        let render = &render[..render.find("function renderDocument()").unwrap()];
        assert!(render.contains("renderDocument();"));
    }
}
