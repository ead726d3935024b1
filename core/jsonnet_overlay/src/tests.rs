use super::*;
use jsonnet_ast::Location;

fn uri(name: &str) -> Url {
    Url::parse(&format!("file:///tmp/{name}")).unwrap()
}

/// Parse callback that accepts any text containing no `!`.
fn lenient(text: &str, _last: Option<&TextEdit>) -> (usize, bool) {
    (text.len(), !text.contains('!'))
}

fn loc(line: u32, column: u32) -> Location {
    Location::new(line, column)
}

#[test]
fn replace_then_delta_then_noop() {
    let overlay: Overlay<usize> = Overlay::new();
    let u = uri("a.jsonnet");

    overlay.replace(&u, 1, "abc".to_string(), lenient, |_| {});
    overlay.update(
        &u,
        2,
        vec![TextEdit::insert(loc(1, 4), "d")],
        lenient,
        |_| {},
    );
    overlay.update(&u, 3, vec![], lenient, |_| {});

    let current = overlay.current(&u).unwrap();
    assert_eq!(&*current.contents, "abcd");
    assert_eq!(current.version, 3);

    let parsed = overlay.parsed(&u).unwrap();
    assert_eq!(&*parsed.contents, "abcd");
    assert_eq!(parsed.version, 3);
}

#[test]
fn parse_failure_keeps_previous_parsed() {
    let overlay: Overlay<usize> = Overlay::new();
    let u = uri("b.jsonnet");

    overlay.replace(&u, 1, "ok".to_string(), lenient, |_| {});
    overlay.update(
        &u,
        2,
        vec![TextEdit::insert(loc(1, 3), "!")],
        lenient,
        |_| {},
    );

    let current = overlay.current(&u).unwrap();
    assert_eq!(&*current.contents, "ok!");
    assert_eq!(current.version, 2);

    let parsed = overlay.parsed(&u).unwrap();
    assert_eq!(&*parsed.contents, "ok");
    assert_eq!(parsed.version, 1);
    assert!(parsed.version <= current.version);
}

#[test]
fn close_drops_entries() {
    let overlay: Overlay<usize> = Overlay::new();
    let u = uri("c.jsonnet");

    overlay.replace(&u, 1, "x".to_string(), lenient, |_| {});
    assert!(overlay.current(&u).is_some());

    overlay.close(&u);
    assert!(overlay.current(&u).is_none());
    assert!(overlay.parsed(&u).is_none());
}

#[test]
fn reads_of_unknown_uri_are_none() {
    let overlay: Overlay<usize> = Overlay::new();
    assert!(overlay.current(&uri("nope.jsonnet")).is_none());
    assert!(overlay.parsed(&uri("nope.jsonnet")).is_none());
}

#[test]
fn delta_without_entry_drops_the_file() {
    let overlay: Overlay<usize> = Overlay::new();
    let u = uri("d.jsonnet");

    overlay.update(
        &u,
        1,
        vec![TextEdit::insert(loc(1, 1), "x")],
        lenient,
        |_| {},
    );
    assert!(overlay.current(&u).is_none());

    // a full replace recovers
    overlay.replace(&u, 2, "fresh".to_string(), lenient, |_| {});
    assert_eq!(&*overlay.current(&u).unwrap().contents, "fresh");
}

#[test]
fn version_gap_drops_the_file() {
    let overlay: Overlay<usize> = Overlay::new();
    let u = uri("e.jsonnet");

    overlay.replace(&u, 1, "abc".to_string(), lenient, |_| {});
    overlay.update(
        &u,
        5,
        vec![TextEdit::insert(loc(1, 1), "x")],
        lenient,
        |_| {},
    );
    assert!(overlay.current(&u).is_none());
}

#[test]
fn callback_sees_the_batch_result() {
    let overlay: Overlay<usize> = Overlay::new();
    let u = uri("f.jsonnet");

    let mut seen = None;
    overlay.replace(&u, 1, "hello".to_string(), lenient, |res| {
        seen = Some((
            res.current.as_ref().unwrap().version,
            res.parsed.as_ref().unwrap().version,
        ));
    });
    assert_eq!(seen, Some((1, 1)));
}

#[test]
fn folding_edits_in_version_order_matches_current_text() {
    let overlay: Overlay<usize> = Overlay::new();
    let u = uri("g.jsonnet");

    overlay.replace(&u, 1, "a".to_string(), lenient, |_| {});
    for (version, ch) in [(2, "b"), (3, "c"), (4, "d")] {
        let col = version as u32; // text grows one char per version
        overlay.update(
            &u,
            version,
            vec![TextEdit::insert(loc(1, col), ch)],
            lenient,
            |_| {},
        );
    }
    let current = overlay.current(&u).unwrap();
    assert_eq!(&*current.contents, "abcd");
    assert_eq!(current.version, 4);
}

#[test]
fn last_edit_reaches_the_parser() {
    let overlay: Overlay<usize> = Overlay::new();
    let u = uri("h.jsonnet");

    overlay.replace(&u, 1, "ab".to_string(), lenient, |_| {});

    let last_seen = std::sync::Arc::new(parking_lot::Mutex::new(None));
    let sink = last_seen.clone();
    overlay.update(
        &u,
        2,
        vec![TextEdit::insert(loc(1, 3), "c")],
        move |text, last| {
            *sink.lock() = last.map(|e| (e.range.begin, e.new_text.clone()));
            (text.len(), true)
        },
        |_| {},
    );
    assert_eq!(*last_seen.lock(), Some((loc(1, 3), "c".to_string())));
}

#[test]
fn concurrent_updates_to_distinct_uris() {
    use std::sync::Arc as StdArc;
    let overlay: StdArc<Overlay<usize>> = StdArc::new(Overlay::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let overlay = overlay.clone();
            std::thread::spawn(move || {
                let u = uri(&format!("t{i}.jsonnet"));
                overlay.replace(&u, 1, format!("doc {i}"), lenient, |_| {});
                overlay.update(
                    &u,
                    2,
                    vec![TextEdit::insert(loc(1, 1), "x")],
                    lenient,
                    |_| {},
                );
                assert_eq!(&*overlay.current(&u).unwrap().contents, format!("xdoc {i}"));
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}
