use crate::{browser::config::{ConnectionOptions, LaunchOptions},
            browser::overlay,
            dom::{self, DomTree, Page, SnapshotOptions},
            error::{BrowserError, Result}};
use headless_chrome::{Browser, Element, Tab};
use std::{ffi::OsStr, sync::Arc, time::Duration};

/// Browser session that manages a Chrome/Chromium instance
pub struct BrowserSession {
    /// The underlying headless_chrome Browser instance
    browser: Browser,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Ignore default arguments to prevent detection by anti-bot services
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));

        // Keep the session alive for an hour (default is 30 seconds)
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));
        launch_opts.path = options.chrome_path;
        launch_opts.user_data_dir = options.user_data_dir;
        launch_opts.sandbox = options.sandbox;

        let browser = Browser::new(launch_opts).map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        browser.new_tab().map_err(|e| BrowserError::LaunchFailed(format!("Failed to create tab: {}", e)))?;

        Ok(Self { browser })
    }

    /// Connect to an existing browser instance via WebSocket
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        let browser = Browser::connect_with_timeout(options.ws_url, Duration::from_millis(options.timeout))
            .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;

        Ok(Self { browser })
    }

    /// Get the active tab
    pub fn tab(&self) -> Result<Arc<Tab>> {
        self.get_active_tab()
    }

    /// Get all tabs
    pub fn get_tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();

        Ok(tabs)
    }

    /// Get the currently active tab by checking the document visibility and focus state
    pub fn get_active_tab(&self) -> Result<Arc<Tab>> {
        let tabs = self.get_tabs()?;

        // First pass: visible and focused
        for tab in &tabs {
            match tab.evaluate("document.visibilityState === 'visible' && document.hasFocus()", false) {
                Ok(remote_object) => {
                    if remote_object.value.and_then(|v| v.as_bool()).unwrap_or(false) {
                        return Ok(tab.clone());
                    }
                }
                Err(e) => {
                    log::debug!("Failed to check tab status: {}", e);
                    continue;
                }
            }
        }

        // Second pass: visible only
        for tab in &tabs {
            if let Ok(remote_object) = tab.evaluate("document.visibilityState === 'visible'", false) {
                if remote_object.value.and_then(|v| v.as_bool()).unwrap_or(false) {
                    return Ok(tab.clone());
                }
            }
        }

        // Headless tabs may report neither; fall back to the first one
        tabs.first()
            .cloned()
            .ok_or_else(|| BrowserError::TabOperationFailed("No active tab found".to_string()))
    }

    /// Get the underlying Browser instance
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Navigate to a URL using the active tab
    pub fn navigate(&self, url: &str) -> Result<()> {
        self.tab()?
            .navigate_to(url)
            .map_err(|e| BrowserError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e)))?;

        Ok(())
    }

    /// Wait for navigation to complete
    pub fn wait_for_navigation(&self) -> Result<()> {
        self.tab()?
            .wait_until_navigated()
            .map_err(|e| BrowserError::NavigationFailed(format!("Navigation timeout: {}", e)))?;

        Ok(())
    }

    /// Capture the active tab's document without indexing it
    pub fn capture_page(&self) -> Result<Page> {
        dom::capture_page(&self.tab()?)
    }

    /// Snapshot the active tab, drawing overlays for the highlights it requests.
    ///
    /// Overlays from a previous snapshot are removed first so they never
    /// occlude the page being measured.
    pub fn snapshot(&self, options: &SnapshotOptions) -> Result<DomTree> {
        let tab = self.tab()?;
        overlay::remove_highlights(&tab)?;

        let tree = dom::extract_dom(&tab, options)?;
        log::info!(
            "Snapshot of {} has {} elements, {} indexed",
            tab.get_url(),
            tree.count_elements(),
            tree.count_interactive()
        );

        overlay::draw_highlights(&tab, tree.highlights())?;
        Ok(tree)
    }

    /// Find an element by CSS selector using the provided tab
    pub fn find_element<'a>(&self, tab: &'a Arc<Tab>, css_selector: &str) -> Result<Element<'a>> {
        tab.find_element(css_selector)
            .map_err(|e| BrowserError::ElementNotFound(format!("Element '{}' not found: {}", css_selector, e)))
    }

    /// Resolve a highlight index of `tree` to a live element, by CSS selector then by xpath
    pub fn element_for_index<'a>(&self, tab: &'a Arc<Tab>, tree: &DomTree, index: usize) -> Result<Element<'a>> {
        let selector = tree.document_selector(index)?;

        match self.find_element(tab, selector.best_selector()) {
            Ok(element) => Ok(element),
            Err(css_err) => {
                let xpath = selector.xpath.map(|x| format!("/{}", x)).unwrap_or_default();
                log::debug!("CSS lookup for index {} failed ({}), trying xpath {}", index, css_err, xpath);
                tab.find_element_by_xpath(&xpath).map_err(|e| {
                    BrowserError::ElementNotFound(format!("Element with index {} not found: {}", index, e))
                })
            }
        }
    }

    /// Remove overlays left by a previous snapshot; a no-op when there are none
    pub fn remove_highlights(&self) -> Result<()> {
        let tab = self.tab()?;
        overlay::remove_highlights(&tab)
    }

    /// Close the browser
    pub fn close(&self) -> Result<()> {
        // headless_chrome has no explicit close; the process exits when Browser is dropped
        let tabs = self.get_tabs()?;
        for tab in tabs {
            let _ = tab.close(false);
        }
        Ok(())
    }
}
