//! Browser glue: DOM anchors, the bootstrap document and document-level
//! event listeners.

use std::fmt;

use comments_core::AnchorNode;
use shared_types::CommentsBootstrap;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{window, Document, Element, Event, HtmlElement};

/// Id of the `<script type="application/json">` tag holding the bootstrap document
pub const BOOTSTRAP_ELEMENT_ID: &str = "comments-data";

/// Attribute marking the element a field comment floats beside
pub const CONTENTPATH_ATTRIBUTE: &str = "data-contentpath";

/// Attribute on host buttons that start a comment on the named content path
pub const ADD_COMMENT_ATTRIBUTE: &str = "data-comment-add";

fn document() -> Option<Document> {
    window().and_then(|w| w.document())
}

// ============================================================================
// Anchors
// ============================================================================

/// A page element a comment is positioned against.
#[derive(Clone)]
pub struct DomAnchor {
    element: Element,
}

impl DomAnchor {
    pub fn new(element: Element) -> Self {
        Self { element }
    }

    /// Anchor for the field rendering `contentpath`, if it is on the page.
    pub fn for_content_path(contentpath: &str) -> Option<Self> {
        let selector = format!("[{CONTENTPATH_ATTRIBUTE}=\"{contentpath}\"]");
        document()?
            .query_selector(&selector)
            .ok()
            .flatten()
            .map(Self::new)
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl fmt::Debug for DomAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomAnchor")
            .field("tag", &self.element.tag_name())
            .field("id", &self.element.id())
            .finish()
    }
}

impl AnchorNode for DomAnchor {
    fn document_top(&self) -> f64 {
        let scroll_top = document()
            .and_then(|d| d.document_element())
            .map(|root| f64::from(root.scroll_top()))
            .unwrap_or(0.0);
        self.element.get_bounding_client_rect().top() + scroll_top
    }

    fn tab(&self) -> Option<String> {
        self.element
            .closest("[role=\"tabpanel\"]")
            .ok()
            .flatten()
            .map(|panel| panel.id())
            .filter(|id| !id.is_empty())
    }

    fn is_mounted(&self) -> bool {
        self.element.is_connected()
    }
}

// ============================================================================
// Bootstrap
// ============================================================================

/// Parse the bootstrap document embedded in the host page.
pub fn read_bootstrap() -> Result<CommentsBootstrap, String> {
    let element = document()
        .and_then(|d| d.get_element_by_id(BOOTSTRAP_ELEMENT_ID))
        .ok_or_else(|| format!("#{BOOTSTRAP_ELEMENT_ID} not found"))?;
    let text = element.text_content().unwrap_or_default();
    parse_bootstrap(&text)
}

pub fn parse_bootstrap(text: &str) -> Result<CommentsBootstrap, String> {
    serde_json::from_str(text).map_err(|e| format!("Invalid comments bootstrap: {e}"))
}

/// Read a query string parameter from the current location.
pub fn query_param(name: &str) -> Option<String> {
    let search = window()?.location().search().ok()?;
    web_sys::UrlSearchParams::new_with_str(&search)
        .ok()?
        .get(name)
}

/// The remote comment id named by the focus parameter, if it parses.
pub fn focused_remote_id(param: &str) -> Option<u64> {
    query_param(param).and_then(|value| parse_remote_id(&value))
}

pub fn parse_remote_id(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}

// ============================================================================
// Events
// ============================================================================

/// A document event listener, removed again when dropped.
pub struct DocumentListener {
    event: String,
    closure: Closure<dyn FnMut(Event)>,
}

impl DocumentListener {
    pub fn new(event: &str, handler: impl FnMut(Event) + 'static) -> Option<Self> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        match document()?.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
            Ok(()) => Some(Self {
                event: event.to_string(),
                closure,
            }),
            Err(e) => {
                dioxus_logger::tracing::error!("Failed to listen for {}: {:?}", event, e);
                None
            }
        }
    }
}

impl Drop for DocumentListener {
    fn drop(&mut self) {
        if let Some(document) = document() {
            let _ = document.remove_event_listener_with_callback(
                &self.event,
                self.closure.as_ref().unchecked_ref(),
            );
        }
    }
}

/// Bring a card into view and put the cursor in its form, if it has one.
pub fn focus_card(card: &Element) {
    card.scroll_into_view();
    let target = card
        .query_selector("textarea")
        .ok()
        .flatten()
        .unwrap_or_else(|| card.clone());
    if let Ok(target) = target.dyn_into::<HtmlElement>() {
        if let Err(e) = target.focus() {
            dioxus_logger::tracing::warn!("Failed to focus comment: {:?}", e);
        }
    }
}

/// The content path named by the add-comment button an event came from.
pub fn add_comment_target(event: &Event) -> Option<(String, Element)> {
    let target = event.target()?.dyn_into::<Element>().ok()?;
    let button = target
        .closest(&format!("[{ADD_COMMENT_ATTRIBUTE}]"))
        .ok()
        .flatten()?;
    let contentpath = button.get_attribute(ADD_COMMENT_ATTRIBUTE)?;
    let anchor = DomAnchor::for_content_path(&contentpath)
        .map(|anchor| anchor.element)
        .unwrap_or(button);
    Some((contentpath, anchor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote_id() {
        assert_eq!(parse_remote_id("42"), Some(42));
        assert_eq!(parse_remote_id(" 7 "), Some(7));
        assert_eq!(parse_remote_id("abc"), None);
        assert_eq!(parse_remote_id(""), None);
    }

    #[test]
    fn test_parse_bootstrap_reports_errors() {
        let bootstrap = parse_bootstrap(r#"{"user": 3, "authors": {}, "comments": []}"#).unwrap();
        assert_eq!(bootstrap.user, Some(3));
        assert!(parse_bootstrap("<html>").unwrap_err().contains("Invalid comments bootstrap"));
    }
}
