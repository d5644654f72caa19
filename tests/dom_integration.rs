use page_snapshot::{BrowserError, BrowserSession, LaunchOptions, SnapshotOptions, ViewportExpansion};

fn data_url(html: &str) -> String {
    format!("data:text/html,{}", urlencoding::encode(html))
}

fn open(html: &str) -> BrowserSession {
    let session = BrowserSession::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");
    session.navigate(&data_url(html)).expect("Failed to navigate");
    session.wait_for_navigation().expect("Navigation failed");
    session
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_dom_extraction() {
    let session = open("<html><body><button id='test-btn'>Click me</button><a href='#'>Link</a></body></html>");

    let dom = session.snapshot(&SnapshotOptions::default()).expect("Failed to snapshot");

    assert_eq!(dom.root().tag_name, "body");
    assert_eq!(dom.count_interactive(), 2);
    assert_eq!(dom.element_by_index(0).and_then(|e| e.id()), Some("test-btn"));

    let json = dom.to_json().expect("Failed to convert to JSON");
    assert!(json.contains("test-btn"));
}

#[test]
#[ignore]
fn test_snapshot_is_deterministic() {
    let session = open("<body><nav><a href='/a'>A</a><a href='/b'>B</a></nav><input name='q'><select><option>x</option></select></body>");
    let options = SnapshotOptions::new().highlight_elements(false);

    let first = session.snapshot(&options).expect("Failed to snapshot");
    let second = session.snapshot(&options).expect("Failed to snapshot");

    assert_eq!(first.interactive_indices(), second.interactive_indices());
    for index in first.interactive_indices() {
        assert_eq!(first.element_by_index(index).map(|e| &e.xpath), second.element_by_index(index).map(|e| &e.xpath));
    }
}

#[test]
#[ignore]
fn test_unbounded_expansion_reaches_below_the_fold() {
    let session = open("<body><div style='height:5000px'></div><button id='far'>Far</button></body>");

    let bounded = session.snapshot(&SnapshotOptions::default()).expect("Failed to snapshot");
    assert_eq!(bounded.count_interactive(), 0);

    let unbounded = session
        .snapshot(&SnapshotOptions::new().viewport_expansion(ViewportExpansion::Unbounded))
        .expect("Failed to snapshot");
    assert_eq!(unbounded.element_by_index(0).and_then(|e| e.id()), Some("far"));
}

#[test]
#[ignore]
fn test_same_origin_iframe_is_indexed() {
    let session = open("<body><iframe srcdoc=\"<button id='inner'>In</button>\"></iframe></body>");
    std::thread::sleep(std::time::Duration::from_millis(300));

    let dom = session.snapshot(&SnapshotOptions::default()).expect("Failed to snapshot");
    assert!(dom.walk().any(|(_, node)| node.as_element().and_then(|e| e.id()) == Some("inner")));
}

#[test]
#[ignore]
fn test_element_for_index_resolves_live_element() {
    let session = open("<body><div><button id='a'>Go</button><span>label</span></div></body>");
    let dom = session.snapshot(&SnapshotOptions::default()).expect("Failed to snapshot");

    let tab = session.tab().expect("No tab");
    let element = session.element_for_index(&tab, &dom, 0).expect("Failed to resolve index 0");
    element.click().expect("Failed to click");
}

#[test]
#[ignore]
fn test_record_and_locate_across_reload() {
    let html = "<body><form><input name='q'><button type='submit' id='go'>Search</button></form></body>";
    let session = open(html);

    let before = session.snapshot(&SnapshotOptions::default()).expect("Failed to snapshot");
    let index = before
        .interactive_indices()
        .into_iter()
        .find(|&i| before.element_by_index(i).and_then(|e| e.id()) == Some("go"))
        .expect("button indexed");
    let record = before.history_element(index).expect("record");

    session.navigate(&data_url(html)).expect("Failed to navigate");
    session.wait_for_navigation().expect("Navigation failed");

    let after = session.snapshot(&SnapshotOptions::default()).expect("Failed to snapshot");
    let found = after.find_history_element(&record).expect("element re-found");
    assert_eq!(after.element(found).and_then(|e| e.id()), Some("go"));
}

#[test]
#[ignore]
fn test_capture_sees_attached_listeners() {
    let session = open(
        "<body><div id='tile' style='width:80px;height:40px'>Tile</div>\
         <script>document.getElementById('tile').addEventListener('click', () => {})</script></body>",
    );

    let page = session.capture_page().expect("Failed to capture");
    assert!(page.listener_introspection);

    let dom = session.snapshot(&SnapshotOptions::default()).expect("Failed to snapshot");
    assert_eq!(dom.element_by_index(0).and_then(|e| e.id()), Some("tile"));
}

#[test]
#[ignore]
fn test_scrolled_out_list_items_are_not_indexed() {
    let session = open(
        "<body><div role='listbox' style='overflow:auto;width:300px;height:100px'>\
         <button id='first'>First</button><div style='height:300px'></div>\
         <button id='clipped'>Clipped</button></div></body>",
    );

    let dom = session.snapshot(&SnapshotOptions::default()).expect("Failed to snapshot");
    let ids: Vec<_> = dom
        .interactive_indices()
        .into_iter()
        .filter_map(|i| dom.element_by_index(i).and_then(|e| e.id()).map(str::to_string))
        .collect();
    assert!(ids.contains(&"first".to_string()));
    assert!(!ids.contains(&"clipped".to_string()));
}

#[test]
#[ignore]
fn test_framed_element_is_not_resolved_through_top_document() {
    let session = open("<body><button name='go'>Top</button><iframe srcdoc=\"<button name='go'>In</button>\"></iframe></body>");
    std::thread::sleep(std::time::Duration::from_millis(300));

    let dom = session.snapshot(&SnapshotOptions::default()).expect("Failed to snapshot");
    let tab = session.tab().expect("No tab");
    assert!(session.element_for_index(&tab, &dom, 0).is_ok());
    assert!(matches!(session.element_for_index(&tab, &dom, 1), Err(BrowserError::ElementNotFound(_))));
}
