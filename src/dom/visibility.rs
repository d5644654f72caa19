//! Rendering, viewport and occlusion checks.
//!
//! All rects from the host are relative to the viewport of the node's own
//! frame; callers pass the accumulated iframe offset so tests run against the
//! top-level window.

use crate::dom::element::{BoundingBox, ViewportInfo};
use crate::dom::geometry::GeometryCache;
use crate::dom::host::{DocumentHost, HitScope, NodeHandle};
use crate::dom::options::ViewportExpansion;
use log::debug;

/// Inset from the corners of the tested fragment for the occlusion hit tests
pub const TOP_CHECK_MARGIN: f64 = 5.0;

/// The window elements are tested against, in top-level viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportWindow {
    pub width: f64,
    pub height: f64,
    pub expansion: ViewportExpansion,
}

impl ViewportWindow {
    pub fn new(viewport: ViewportInfo, expansion: ViewportExpansion) -> Self {
        Self { width: viewport.width, height: viewport.height, expansion }
    }

    pub fn is_unbounded(&self) -> bool {
        self.expansion.is_unbounded()
    }

    /// Whether `rect` is not entirely outside the expanded window
    pub fn overlaps(&self, rect: &BoundingBox) -> bool {
        let Some(margin) = self.expansion.margin() else { return true };
        !(rect.bottom() < -margin
            || rect.y > self.height + margin
            || rect.right() < -margin
            || rect.x > self.width + margin)
    }
}

/// Non-zero rendered size, not `visibility: hidden`, not `display: none`
pub fn is_element_visible<H: DocumentHost + ?Sized>(geo: &mut GeometryCache<'_, H>, node: NodeHandle) -> bool {
    let Some(rect) = geo.bounding_rect(node) else { return false };
    if !rect.is_visible() {
        return false;
    }
    geo.computed_style(node)
        .is_none_or(|style| style.visibility != "hidden" && style.display != "none")
}

/// At least one non-empty fragment (or the bounding box, if there are none) overlaps the window
pub fn is_in_expanded_viewport<H: DocumentHost + ?Sized>(
    geo: &mut GeometryCache<'_, H>,
    node: NodeHandle,
    window: &ViewportWindow,
    offset: (f64, f64),
) -> bool {
    if window.is_unbounded() {
        return true;
    }

    let rects = geo.client_rects(node).unwrap_or_default();
    if rects.is_empty() {
        return match geo.bounding_rect(node) {
            Some(rect) if rect.is_visible() => window.overlaps(&rect.offset(offset.0, offset.1)),
            _ => false,
        };
    }

    rects
        .iter()
        .filter(|rect| rect.is_visible())
        .any(|rect| window.overlaps(&rect.offset(offset.0, offset.1)))
}

/// Cheap pre-check run before an element's subtree is built.
///
/// Only zero-sized, non-fixed elements lying outside the window are rejected;
/// fixed and sticky elements paint away from their layout position.
pub fn is_clearly_outside_viewport<H: DocumentHost + ?Sized>(
    geo: &mut GeometryCache<'_, H>,
    node: NodeHandle,
    window: &ViewportWindow,
    offset: (f64, f64),
) -> bool {
    if window.is_unbounded() {
        return false;
    }
    let Some(rect) = geo.bounding_rect(node) else { return true };
    let fixed_or_sticky = geo.computed_style(node).is_some_and(|s| s.is_fixed_or_sticky());
    let has_size = rect.width > 0.0 || rect.height > 0.0;

    !fixed_or_sticky && !has_size && !window.overlaps(&rect.offset(offset.0, offset.1))
}

/// Whether the element is the topmost thing painted where it sits.
///
/// Elements in iframe documents are always topmost; elements in shadow trees
/// are hit-tested at their center within that tree; everything else is
/// hit tested at the center and two inset corners of its middle fragment and
/// passes if any point lands on it or a descendant. Hit-test failures pass.
pub fn is_top_element<H: DocumentHost + ?Sized>(
    geo: &mut GeometryCache<'_, H>,
    node: NodeHandle,
    window: &ViewportWindow,
    in_frame: bool,
    offset: (f64, f64),
) -> bool {
    if window.is_unbounded() {
        return true;
    }

    let rects = geo.client_rects(node).unwrap_or_default();
    if rects.is_empty() {
        return false;
    }
    let in_view = rects
        .iter()
        .any(|rect| rect.is_visible() && window.overlaps(&rect.offset(offset.0, offset.1)));
    if !in_view {
        return false;
    }
    if in_frame {
        return true;
    }

    let host = geo.host();
    let middle = rects[rects.len() / 2];

    if let Some(root) = host.containing_shadow_root(node) {
        let (x, y) = middle.center();
        return hit_lands_on(host, HitScope::ShadowRoot(root), node, x, y);
    }

    let points = [
        middle.center(),
        (middle.x + TOP_CHECK_MARGIN, middle.y + TOP_CHECK_MARGIN),
        (middle.right() - TOP_CHECK_MARGIN, middle.bottom() - TOP_CHECK_MARGIN),
    ];
    points
        .iter()
        .any(|&(x, y)| hit_lands_on(host, HitScope::Document, node, x, y))
}

fn hit_lands_on<H: DocumentHost + ?Sized>(host: &H, scope: HitScope, node: NodeHandle, x: f64, y: f64) -> bool {
    match host.element_from_point(scope, x, y) {
        Ok(Some(hit)) => host.contains(node, hit),
        Ok(None) => false,
        Err(e) => {
            debug!("hit test for node {} failed, treating as topmost: {}", node, e);
            true
        }
    }
}

/// `checkVisibility({ checkOpacity, checkVisibilityCSS })` over the element and its ancestors
pub fn check_visibility<H: DocumentHost + ?Sized>(geo: &mut GeometryCache<'_, H>, element: NodeHandle) -> bool {
    let host = geo.host();
    if let Some(style) = geo.computed_style(element) {
        if style.visibility == "hidden" || style.visibility == "collapse" {
            return false;
        }
    }

    let mut current = Some(element);
    while let Some(node) = current {
        if host.is_element(node) {
            if let Some(style) = geo.computed_style(node) {
                if style.display == "none" || style.opacity <= 0.0 {
                    return false;
                }
            }
        }
        current = host.parent(node);
    }
    true
}

/// Visibility of a text run: rendered fragments in view and a visible parent element.
///
/// Text placed directly in a shadow root has no parent element and is judged by its fragments alone.
pub fn is_text_node_visible<H: DocumentHost + ?Sized>(
    geo: &mut GeometryCache<'_, H>,
    text: NodeHandle,
    window: &ViewportWindow,
    offset: (f64, f64),
) -> bool {
    let parent = geo.host().parent_element(text);
    let rects = geo.client_rects(text).unwrap_or_default();

    let in_view = if window.is_unbounded() {
        parent.is_some() || rects.iter().any(BoundingBox::is_visible)
    } else {
        rects
            .iter()
            .any(|rect| rect.is_visible() && window.overlaps(&rect.offset(offset.0, offset.1)))
    };
    in_view && parent.is_none_or(|parent| check_visibility(geo, parent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::page::Page;

    fn window(expansion: ViewportExpansion) -> ViewportWindow {
        ViewportWindow { width: 800.0, height: 600.0, expansion }
    }

    fn page_with_button() -> (Page, NodeHandle) {
        let mut page = Page::new(800.0, 600.0);
        let body = page.body_handle();
        let button = page.append_element(body, "button");
        page.set_rect(button, BoundingBox::new(10.0, 10.0, 100.0, 30.0));
        (page, button)
    }

    #[test]
    fn test_window_overlap_with_margin() {
        let below = BoundingBox::new(0.0, 700.0, 10.0, 10.0);
        assert!(!window(ViewportExpansion::Pixels(0)).overlaps(&below));
        assert!(window(ViewportExpansion::Pixels(100)).overlaps(&below));
        assert!(window(ViewportExpansion::Unbounded).overlaps(&below));
    }

    #[test]
    fn test_element_visibility() {
        let (mut page, button) = page_with_button();
        assert!(is_element_visible(&mut GeometryCache::new(&page), button));

        page.style_mut(button).visibility = "hidden".to_string();
        assert!(!is_element_visible(&mut GeometryCache::new(&page), button));

        page.style_mut(button).visibility = "visible".to_string();
        page.set_rect(button, BoundingBox::new(10.0, 10.0, 0.0, 30.0));
        assert!(!is_element_visible(&mut GeometryCache::new(&page), button));
    }

    #[test]
    fn test_in_viewport_skips_empty_fragments() {
        let (mut page, button) = page_with_button();
        page.set_client_rects(
            button,
            vec![BoundingBox::new(10.0, 10.0, 0.0, 0.0), BoundingBox::new(10.0, 900.0, 50.0, 20.0)],
        );
        let mut geo = GeometryCache::new(&page);
        assert!(!is_in_expanded_viewport(&mut geo, button, &window(ViewportExpansion::Pixels(0)), (0.0, 0.0)));
        assert!(is_in_expanded_viewport(&mut geo, button, &window(ViewportExpansion::Pixels(400)), (0.0, 0.0)));
        assert!(is_in_expanded_viewport(&mut geo, button, &window(ViewportExpansion::Unbounded), (0.0, 0.0)));
    }

    #[test]
    fn test_frame_offset_moves_element_out_of_view() {
        let (page, button) = page_with_button();
        let mut geo = GeometryCache::new(&page);
        let w = window(ViewportExpansion::Pixels(0));
        assert!(is_in_expanded_viewport(&mut geo, button, &w, (0.0, 0.0)));
        assert!(!is_in_expanded_viewport(&mut geo, button, &w, (0.0, 2000.0)));
    }

    #[test]
    fn test_occluded_element_is_not_top() {
        let (mut page, button) = page_with_button();
        let body = page.body_handle();
        let modal = page.append_element(body, "div");
        page.set_rect(modal, BoundingBox::new(0.0, 0.0, 800.0, 600.0));

        let w = window(ViewportExpansion::Pixels(0));
        assert!(!is_top_element(&mut GeometryCache::new(&page), button, &w, false, (0.0, 0.0)));
        assert!(is_top_element(&mut GeometryCache::new(&page), button, &w, true, (0.0, 0.0)));
        assert!(is_top_element(
            &mut GeometryCache::new(&page),
            button,
            &window(ViewportExpansion::Unbounded),
            false,
            (0.0, 0.0)
        ));
    }

    #[test]
    fn test_partially_covered_element_is_top() {
        let (mut page, button) = page_with_button();
        let body = page.body_handle();
        // tooltip covering the center and top-left points but not the bottom-right one
        let tooltip = page.append_element(body, "div");
        page.set_rect(tooltip, BoundingBox::new(0.0, 0.0, 80.0, 30.0));

        let w = window(ViewportExpansion::Pixels(0));
        assert!(is_top_element(&mut GeometryCache::new(&page), button, &w, false, (0.0, 0.0)));
    }

    #[test]
    fn test_descendant_hit_counts_as_top() {
        let (mut page, button) = page_with_button();
        let icon = page.append_element(button, "span");
        page.set_rect(icon, BoundingBox::new(10.0, 10.0, 100.0, 30.0));

        let w = window(ViewportExpansion::Pixels(0));
        assert!(is_top_element(&mut GeometryCache::new(&page), button, &w, false, (0.0, 0.0)));
    }

    #[test]
    fn test_coarse_rejection() {
        let mut page = Page::new(800.0, 600.0);
        let body = page.body_handle();
        let offscreen = page.append_element(body, "div");
        page.set_rect(offscreen, BoundingBox::new(0.0, 5000.0, 0.0, 0.0));
        let w = window(ViewportExpansion::Pixels(0));

        assert!(is_clearly_outside_viewport(&mut GeometryCache::new(&page), offscreen, &w, (0.0, 0.0)));

        page.style_mut(offscreen).position = "fixed".to_string();
        assert!(!is_clearly_outside_viewport(&mut GeometryCache::new(&page), offscreen, &w, (0.0, 0.0)));

        page.style_mut(offscreen).position = "static".to_string();
        page.set_rect(offscreen, BoundingBox::new(0.0, 5000.0, 10.0, 10.0));
        assert!(!is_clearly_outside_viewport(&mut GeometryCache::new(&page), offscreen, &w, (0.0, 0.0)));
    }

    #[test]
    fn test_text_visibility_follows_ancestors() {
        let mut page = Page::new(800.0, 600.0);
        let body = page.body_handle();
        let wrapper = page.append_element(body, "div");
        let span = page.append_element(wrapper, "span");
        let text = page.append_text(span, "hello");
        page.set_rect(text, BoundingBox::new(0.0, 0.0, 40.0, 12.0));

        let w = window(ViewportExpansion::Pixels(0));
        assert!(is_text_node_visible(&mut GeometryCache::new(&page), text, &w, (0.0, 0.0)));

        page.style_mut(wrapper).opacity = 0.0;
        assert!(!is_text_node_visible(&mut GeometryCache::new(&page), text, &w, (0.0, 0.0)));

        page.style_mut(wrapper).opacity = 1.0;
        page.style_mut(wrapper).display = "none".to_string();
        assert!(!is_text_node_visible(&mut GeometryCache::new(&page), text, &w, (0.0, 0.0)));
        assert!(!is_text_node_visible(
            &mut GeometryCache::new(&page),
            text,
            &window(ViewportExpansion::Unbounded),
            (0.0, 0.0)
        ));
    }

    #[test]
    fn test_text_outside_viewport_is_not_visible() {
        let mut page = Page::new(800.0, 600.0);
        let body = page.body_handle();
        let text = page.append_text(body, "far away");
        page.set_rect(text, BoundingBox::new(0.0, 3000.0, 40.0, 12.0));

        assert!(!is_text_node_visible(
            &mut GeometryCache::new(&page),
            text,
            &window(ViewportExpansion::Pixels(0)),
            (0.0, 0.0)
        ));
        assert!(is_text_node_visible(
            &mut GeometryCache::new(&page),
            text,
            &window(ViewportExpansion::Unbounded),
            (0.0, 0.0)
        ));
    }

    #[test]
    fn test_shadow_root_text_is_judged_by_its_fragments() {
        let mut page = Page::new(800.0, 600.0);
        let body = page.body_handle();
        let widget = page.append_element(body, "x-greeting");
        let root = page.attach_shadow_root(widget);
        let text = page.append_text(root, "Hello from shadow");
        let w = window(ViewportExpansion::Pixels(0));

        assert!(!is_text_node_visible(&mut GeometryCache::new(&page), text, &w, (0.0, 0.0)));

        page.set_rect(text, BoundingBox::new(0.0, 0.0, 120.0, 16.0));
        assert!(is_text_node_visible(&mut GeometryCache::new(&page), text, &w, (0.0, 0.0)));

        page.set_rect(text, BoundingBox::new(0.0, 2000.0, 120.0, 16.0));
        assert!(!is_text_node_visible(&mut GeometryCache::new(&page), text, &w, (0.0, 0.0)));
        assert!(is_text_node_visible(
            &mut GeometryCache::new(&page),
            text,
            &window(ViewportExpansion::Unbounded),
            (0.0, 0.0)
        ));
    }
}
