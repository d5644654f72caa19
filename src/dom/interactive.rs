//! Heuristic interactivity classification.
//!
//! The authoritative verdict is an ordered list of rules; the first rule that
//! returns a verdict wins. Rules only look at [`ElementFacts`], which are
//! gathered once per element from the host.

use crate::dom::geometry::GeometryCache;
use crate::dom::host::{DocumentHost, NodeHandle};
use crate::dom::visibility::is_element_visible;
use indexmap::IndexMap;

/// Tags that always get their attributes captured
const CANDIDATE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea", "details", "summary", "label", "option"];

const INTERACTIVE_TAGS: &[&str] = &[
    "a", "button", "input", "select", "textarea", "details", "summary", "label", "option", "optgroup", "fieldset",
    "legend",
];

const DISTINCT_TAGS: &[&str] = &["a", "button", "input", "select", "textarea", "summary", "details", "label", "option"];

const INTERACTIVE_CURSORS: &[&str] = &[
    "pointer", "move", "text", "grab", "grabbing", "cell", "copy", "alias", "all-scroll", "col-resize",
    "context-menu", "crosshair", "e-resize", "ew-resize", "help", "n-resize", "ne-resize", "nesw-resize",
    "ns-resize", "nw-resize", "nwse-resize", "row-resize", "s-resize", "se-resize", "sw-resize", "vertical-text",
    "w-resize", "zoom-in", "zoom-out",
];

const NON_INTERACTIVE_CURSORS: &[&str] = &["not-allowed", "no-drop", "wait", "progress", "initial", "inherit"];

/// Widget roles. Menu containers (`menu`, `menubar`) are not targets themselves.
const INTERACTIVE_ROLES: &[&str] = &[
    "button", "menuitem", "menuitemradio", "menuitemcheckbox", "radio", "checkbox", "tab", "switch", "slider",
    "spinbutton", "combobox", "searchbox", "textbox", "listbox", "option", "scrollbar",
];

const DISTINCT_ROLES: &[&str] = &[
    "button", "link", "menuitem", "menuitemradio", "menuitemcheckbox", "radio", "checkbox", "tab", "switch",
    "slider", "spinbutton", "combobox", "searchbox", "textbox", "option",
];

/// Roles whose containers stay eligible even when something paints over them
pub const MENU_CONTAINER_ROLES: &[&str] = &["menu", "menubar", "listbox"];

const CLICK_HANDLER_ATTRIBUTES: &[&str] = &["onclick", "onmousedown", "onmouseup", "ondblclick"];

const CLICK_EVENTS: &[&str] = &["click", "mousedown", "mouseup", "dblclick"];

const INTERACTION_EVENTS: &[&str] = &[
    "click", "mousedown", "mouseup", "dblclick", "keydown", "keyup", "submit", "change", "input", "focus", "blur",
];

const DISTINCT_EVENT_ATTRIBUTES: &[&str] = &[
    "onmousedown", "onmouseup", "onkeydown", "onkeyup", "onsubmit", "onchange", "oninput", "onfocus", "onblur",
];

const TEST_ID_ATTRIBUTES: &[&str] = &["data-testid", "data-cy", "data-test"];

const INTERACTIVE_CLASS_TOKENS: &[&str] = &["btn", "clickable", "menu", "item", "entry", "link"];

const CONTAINER_CLASSES: &[&str] = &["menu", "dropdown", "list", "toolbar"];

/// What the classifier knows about one element
#[derive(Debug, Clone)]
pub struct ElementFacts<'a> {
    pub tag: &'a str,
    pub attributes: &'a IndexMap<String, String>,
    pub cursor: Option<String>,
    pub content_editable: bool,
    /// `None` when the host cannot introspect listeners
    pub listeners: Option<Vec<String>>,
}

impl<'a> ElementFacts<'a> {
    /// Gather facts for an element node; `None` for non-elements
    pub fn gather<H: DocumentHost + ?Sized>(geo: &mut GeometryCache<'a, H>, node: NodeHandle) -> Option<Self> {
        let host = geo.host();
        let tag = host.tag_name(node)?;
        let attributes = host.attributes(node)?;
        Some(Self {
            tag,
            attributes,
            cursor: geo.computed_style(node).map(|style| style.cursor),
            content_editable: host.is_content_editable(node),
            listeners: host.event_listeners(node),
        })
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    fn role(&self) -> Option<&str> {
        self.attr("role")
    }

    fn cursor_in(&self, set: &[&str]) -> bool {
        self.cursor.as_deref().is_some_and(|cursor| set.contains(&cursor))
    }

    fn has_class(&self, class_name: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class_name))
    }

    fn is_editable(&self) -> bool {
        self.content_editable || self.attr("contenteditable") == Some("true")
    }

    fn has_listener_for(&self, events: &[&str]) -> bool {
        self.listeners
            .as_ref()
            .is_some_and(|listeners| listeners.iter().any(|l| events.contains(&l.as_str())))
    }

    fn is_disabled(&self) -> bool {
        ["disabled", "readonly", "inert"].iter().any(|name| self.has_attr(name))
    }
}

/// One step of the interactivity decision
pub struct Rule {
    pub name: &'static str,
    pub verdict: fn(&ElementFacts<'_>) -> Option<bool>,
}

/// Ordered rules; the first `Some` wins, no verdict means not interactive
pub const INTERACTIVE_RULES: &[Rule] = &[
    Rule { name: "interactive-cursor", verdict: cursor_rule },
    Rule { name: "interactive-tag", verdict: tag_rule },
    Rule { name: "content-editable", verdict: editable_rule },
    Rule { name: "widget-class", verdict: widget_class_rule },
    Rule { name: "widget-role", verdict: role_rule },
    Rule { name: "event-handler", verdict: handler_rule },
];

fn cursor_rule(facts: &ElementFacts<'_>) -> Option<bool> {
    (facts.tag != "html" && facts.cursor_in(INTERACTIVE_CURSORS)).then_some(true)
}

fn tag_rule(facts: &ElementFacts<'_>) -> Option<bool> {
    if !INTERACTIVE_TAGS.contains(&facts.tag) {
        return None;
    }
    Some(!facts.cursor_in(NON_INTERACTIVE_CURSORS) && !facts.is_disabled())
}

fn editable_rule(facts: &ElementFacts<'_>) -> Option<bool> {
    facts.is_editable().then_some(true)
}

fn widget_class_rule(facts: &ElementFacts<'_>) -> Option<bool> {
    let looks_like_widget = facts.has_class("button")
        || facts.has_class("dropdown-toggle")
        || facts.attr("data-index").is_some_and(|v| !v.is_empty())
        || facts.attr("data-toggle") == Some("dropdown")
        || facts.attr("aria-haspopup") == Some("true");
    looks_like_widget.then_some(true)
}

fn role_rule(facts: &ElementFacts<'_>) -> Option<bool> {
    let has_role = INTERACTIVE_ROLES.contains(&facts.tag)
        || facts.role().is_some_and(|r| INTERACTIVE_ROLES.contains(&r))
        || facts.attr("aria-role").is_some_and(|r| INTERACTIVE_ROLES.contains(&r));
    has_role.then_some(true)
}

fn handler_rule(facts: &ElementFacts<'_>) -> Option<bool> {
    let inline = CLICK_HANDLER_ATTRIBUTES.iter().any(|attr| facts.has_attr(attr));
    let attached = facts.has_listener_for(INTERACTION_EVENTS);
    (inline || attached).then_some(true)
}

/// Cheap pre-filter deciding whether attributes are worth capturing
pub fn is_interactive_candidate(facts: &ElementFacts<'_>) -> bool {
    CANDIDATE_TAGS.contains(&facts.tag)
        || facts.has_attr("onclick")
        || facts.has_attr("role")
        || facts.has_attr("tabindex")
        || facts.attributes.keys().any(|k| k.starts_with("aria-"))
        || facts.has_attr("data-action")
        || facts.attr("contenteditable") == Some("true")
}

/// Name of the rule that decided, if any rule produced a verdict
pub fn interactive_verdict(facts: &ElementFacts<'_>) -> Option<(&'static str, bool)> {
    INTERACTIVE_RULES
        .iter()
        .find_map(|rule| (rule.verdict)(facts).map(|verdict| (rule.name, verdict)))
}

/// The authoritative "is this operable" verdict
pub fn is_interactive_element(facts: &ElementFacts<'_>) -> bool {
    interactive_verdict(facts).is_some_and(|(_, verdict)| verdict)
}

/// Whether a nested interactive element triggers something other than its highlighted ancestor
pub fn is_element_distinct_interaction<H: DocumentHost + ?Sized>(
    geo: &mut GeometryCache<'_, H>,
    node: NodeHandle,
    facts: &ElementFacts<'_>,
) -> bool {
    if facts.tag == "iframe" || DISTINCT_TAGS.contains(&facts.tag) {
        return true;
    }
    if facts.role().is_some_and(|r| DISTINCT_ROLES.contains(&r)) {
        return true;
    }
    if facts.is_editable() {
        return true;
    }
    if TEST_ID_ATTRIBUTES.iter().any(|attr| facts.has_attr(attr)) {
        return true;
    }
    if facts.has_attr("onclick") || facts.has_listener_for(INTERACTION_EVENTS) {
        return true;
    }
    if DISTINCT_EVENT_ATTRIBUTES.iter().any(|attr| facts.has_attr(attr)) {
        return true;
    }
    is_heuristically_interactive(geo, node, facts)
}

/// Visible wrapper inside a known interactive container that looks clickable
pub fn is_heuristically_interactive<H: DocumentHost + ?Sized>(
    geo: &mut GeometryCache<'_, H>,
    node: NodeHandle,
    facts: &ElementFacts<'_>,
) -> bool {
    if !is_element_visible(geo, node) {
        return false;
    }
    let host = geo.host();

    let has_interactive_attributes = facts.has_attr("role") || facts.has_attr("tabindex") || facts.has_attr("onclick");
    let has_interactive_class = facts.attr("class").is_some_and(|classes| {
        classes
            .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .any(|token| INTERACTIVE_CLASS_TOKENS.iter().any(|t| token.eq_ignore_ascii_case(t)))
    });
    if !(has_interactive_attributes || has_interactive_class || is_interactive_element(facts)) {
        return false;
    }

    let parent_is_body = host
        .parent_element(node)
        .is_some_and(|parent| Some(parent) == host.body());
    if parent_is_body {
        return false;
    }

    let in_known_container = std::iter::successors(Some(node), |&n| host.parent_element(n)).any(|n| {
        let tag = host.tag_name(n);
        let has_container_class = host
            .attribute(n, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| CONTAINER_CLASSES.contains(&c)));
        tag == Some("button") || tag == Some("a") || host.attribute(n, "role") == Some("button") || has_container_class
    });
    if !in_known_container {
        return false;
    }

    host.element_children(node)
        .into_iter()
        .any(|child| is_element_visible(geo, child))
}
