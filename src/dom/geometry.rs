use crate::dom::element::BoundingBox;
use crate::dom::host::{ComputedStyle, DocumentHost, NodeHandle};
use std::collections::HashMap;

/// Per-traversal memo of layout and style queries.
///
/// Created fresh for each snapshot and dropped with it; never reuse one across
/// snapshots, the page may have re-laid out in between.
pub struct GeometryCache<'h, H: DocumentHost + ?Sized> {
    host: &'h H,
    bounding_rects: HashMap<NodeHandle, Option<BoundingBox>>,
    client_rects: HashMap<NodeHandle, Option<Vec<BoundingBox>>>,
    styles: HashMap<NodeHandle, Option<ComputedStyle>>,
    hits: usize,
    misses: usize,
}

impl<'h, H: DocumentHost + ?Sized> GeometryCache<'h, H> {
    pub fn new(host: &'h H) -> Self {
        Self {
            host,
            bounding_rects: HashMap::new(),
            client_rects: HashMap::new(),
            styles: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn host(&self) -> &'h H {
        self.host
    }

    pub fn bounding_rect(&mut self, node: NodeHandle) -> Option<BoundingBox> {
        if let Some(rect) = self.bounding_rects.get(&node) {
            self.hits += 1;
            return *rect;
        }
        self.misses += 1;
        let rect = self.host.bounding_rect(node);
        self.bounding_rects.insert(node, rect);
        rect
    }

    pub fn client_rects(&mut self, node: NodeHandle) -> Option<Vec<BoundingBox>> {
        if let Some(rects) = self.client_rects.get(&node) {
            self.hits += 1;
            return rects.clone();
        }
        self.misses += 1;
        let rects = self.host.client_rects(node);
        self.client_rects.insert(node, rects.clone());
        rects
    }

    pub fn computed_style(&mut self, node: NodeHandle) -> Option<ComputedStyle> {
        if let Some(style) = self.styles.get(&node) {
            self.hits += 1;
            return style.clone();
        }
        self.misses += 1;
        let style = self.host.computed_style(node);
        self.styles.insert(node, style.clone());
        style
    }

    /// `(hits, misses)` over the cache's lifetime
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::element::ViewportInfo;
    use crate::dom::host::{FrameContent, HitScope, HitTestError, HostNode};
    use crate::dom::page::Page;
    use std::cell::Cell;

    /// Page wrapper counting layout queries that reach the host
    struct CountingHost {
        page: Page,
        queries: Cell<usize>,
    }

    impl DocumentHost for CountingHost {
        fn body(&self) -> Option<NodeHandle> {
            self.page.body()
        }
        fn viewport(&self) -> ViewportInfo {
            self.page.viewport()
        }
        fn node(&self, node: NodeHandle) -> Option<HostNode<'_>> {
            self.page.node(node)
        }
        fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
            self.page.parent(node)
        }
        fn children(&self, node: NodeHandle) -> &[NodeHandle] {
            self.page.children(node)
        }
        fn shadow_root(&self, node: NodeHandle) -> Option<NodeHandle> {
            self.page.shadow_root(node)
        }
        fn frame_content(&self, node: NodeHandle) -> Option<&FrameContent> {
            self.page.frame_content(node)
        }
        fn bounding_rect(&self, node: NodeHandle) -> Option<BoundingBox> {
            self.queries.set(self.queries.get() + 1);
            self.page.bounding_rect(node)
        }
        fn client_rects(&self, node: NodeHandle) -> Option<Vec<BoundingBox>> {
            self.queries.set(self.queries.get() + 1);
            self.page.client_rects(node)
        }
        fn computed_style(&self, node: NodeHandle) -> Option<ComputedStyle> {
            self.queries.set(self.queries.get() + 1);
            self.page.computed_style(node)
        }
        fn is_content_editable(&self, node: NodeHandle) -> bool {
            self.page.is_content_editable(node)
        }
        fn event_listeners(&self, node: NodeHandle) -> Option<Vec<String>> {
            self.page.event_listeners(node)
        }
        fn element_from_point(&self, scope: HitScope, x: f64, y: f64) -> Result<Option<NodeHandle>, HitTestError> {
            self.page.element_from_point(scope, x, y)
        }
    }

    #[test]
    fn test_queries_are_memoized() {
        let mut page = Page::new(800.0, 600.0);
        let body = page.body_handle();
        let div = page.append_element(body, "div");
        page.set_rect(div, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        let host = CountingHost { page, queries: Cell::new(0) };

        let mut cache = GeometryCache::new(&host);
        for _ in 0..3 {
            assert_eq!(cache.bounding_rect(div), Some(BoundingBox::new(1.0, 2.0, 3.0, 4.0)));
            assert_eq!(cache.client_rects(div).map(|r| r.len()), Some(1));
            assert_eq!(cache.computed_style(div).map(|s| s.display), Some("block".to_string()));
        }

        assert_eq!(host.queries.get(), 3);
        assert_eq!(cache.stats(), (6, 3));
    }

    #[test]
    fn test_missing_queries_are_memoized_too() {
        let page = Page::new(800.0, 600.0);
        let host = CountingHost { page, queries: Cell::new(0) };
        let mut cache = GeometryCache::new(&host);

        assert_eq!(cache.computed_style(999), None);
        assert_eq!(cache.computed_style(999), None);
        assert_eq!(host.queries.get(), 1);
    }

    #[test]
    fn test_fresh_cache_sees_new_layout() {
        let mut page = Page::new(800.0, 600.0);
        let body = page.body_handle();
        let div = page.append_element(body, "div");
        page.set_rect(div, BoundingBox::new(0.0, 0.0, 10.0, 10.0));

        let before = GeometryCache::new(&page).bounding_rect(div);
        page.set_rect(div, BoundingBox::new(0.0, 0.0, 20.0, 20.0));
        let after = GeometryCache::new(&page).bounding_rect(div);

        assert_ne!(before, after);
    }
}
