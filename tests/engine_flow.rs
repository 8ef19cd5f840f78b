use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use lectern::{
    Chunk,
    Corpus,
    EngineConfig,
    EngineEvent,
    EngineObserver,
    EngineStatus,
    ResultsPage,
    SearchEngine,
    Work,
};
use serde_json::json;
use tokio::sync::mpsc::{self, UnboundedReceiver};

fn write_corpus(dir: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let doc = json!({
        "title": "Psalms",
        "works": [
            {"file": "psalms.txt", "title": "Psalms", "category": "poetry", "chunkCount": 3, "wordCount": 14}
        ],
        "chunks": [
            {"id": 1, "file": "psalms.txt", "text": "The Lord is my shepherd", "searchText": "the lord is my shepherd", "chapter": 23},
            {"id": 2, "file": "psalms.txt", "text": "I shall not want", "searchText": "i shall not want", "chapter": 23},
            {"id": 3, "file": "psalms.txt", "text": "He leadeth me beside the still waters", "searchText": "he leadeth me beside the still waters", "chapter": 23}
        ]
    });
    let path = dir.join("psalms.json");
    std::fs::write(&path, serde_json::to_vec(&doc)?)?;
    Ok(path.to_string_lossy().into_owned())
}

fn drain(rx: &mut UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn pages(events: &[EngineEvent]) -> Vec<&ResultsPage> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Results(page) => Some(page),
            _ => None,
        })
        .collect()
}

fn numbered(count: i64) -> Corpus {
    let chunks = (0..count)
        .map(|i| Chunk::new(i, "big.txt", format!("line {i} of the record")))
        .collect();
    Corpus::from_parts(vec![Work::new("big.txt", "Big")], chunks)
        .expect("numbered corpus is valid")
}

#[tokio::test]
async fn load_from_file_reports_loading_transitions()
-> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let location = write_corpus(dir.path())?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = SearchEngine::new(EngineConfig::default(), tx);
    let corpus = engine.load_corpus(&location).await?;

    assert_eq!(corpus.chunks().len(), 3);
    assert_eq!(engine.status(), EngineStatus::Ready);
    assert_eq!(engine.categories(), vec!["poetry"]);

    let events = drain(&mut rx);
    assert!(matches!(events[0], EngineEvent::Loading(true)));
    assert!(matches!(events[1], EngineEvent::Loading(false)));
    assert_eq!(events.len(), 2);
    Ok(())
}

#[tokio::test]
async fn failed_load_keeps_previous_corpus()
-> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let location = write_corpus(dir.path())?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = SearchEngine::new(EngineConfig::default(), tx);
    engine.load_corpus(&location).await?;
    drain(&mut rx);

    let missing = dir.path().join("missing.json");
    let err = engine
        .load_corpus(&missing.to_string_lossy())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("missing.json"));

    let events = drain(&mut rx);
    assert!(matches!(events[0], EngineEvent::Loading(true)));
    assert!(matches!(&events[1], EngineEvent::Error(msg) if msg.contains("missing.json")));
    assert!(matches!(events[2], EngineEvent::Loading(false)));

    assert_eq!(engine.info().and_then(|i| i.title), Some("Psalms".into()));
    engine.search_now("waters");
    assert_eq!(engine.current_page().map(|p| p.total), Some(1));
    Ok(())
}

#[tokio::test]
async fn malformed_document_is_a_load_error()
-> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.json");
    std::fs::write(&path, b"{\"chunks\": [")?;

    let engine = SearchEngine::new(EngineConfig::default(), ());
    let err = engine
        .load_corpus(&path.to_string_lossy())
        .await
        .unwrap_err();
    assert!(matches!(err, lectern::Error::Load(_)));
    assert_eq!(engine.status(), EngineStatus::Empty);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rapid_searches_deliver_only_the_last() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let config =
        EngineConfig::default().with_debounce(Duration::from_millis(150));
    let engine = SearchEngine::new(config, tx);
    engine.install_corpus(numbered(20));

    engine.search("l");
    tokio::time::sleep(Duration::from_millis(40)).await;
    engine.search("li");
    tokio::time::sleep(Duration::from_millis(40)).await;
    engine.search("line 1");
    assert_eq!(engine.status(), EngineStatus::Searching);
    assert!(pages(&drain(&mut rx)).is_empty());

    tokio::time::sleep(Duration::from_millis(300)).await;

    let events = drain(&mut rx);
    let delivered = pages(&events);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].query, "line 1");
    // "line 1" also matches "line 10".."line 19".
    assert_eq!(delivered[0].total, 11);
    assert_eq!(engine.status(), EngineStatus::Results);
}

#[tokio::test(start_paused = true)]
async fn immediate_search_supersedes_pending_one() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = SearchEngine::new(EngineConfig::default(), tx);
    engine.install_corpus(numbered(5));

    engine.search("record");
    engine.search_now("line 3");
    tokio::time::sleep(Duration::from_secs(1)).await;

    let events = drain(&mut rx);
    let delivered = pages(&events);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].query, "line 3");
}

#[test]
fn ten_thousand_chunks_paginate_into_two_hundred_pages() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = SearchEngine::new(EngineConfig::default(), tx);
    engine.install_corpus(numbered(10_000));

    engine.search_now("record");
    let first = engine.current_page().expect("page delivered");
    assert_eq!(first.total, 10_000);
    assert_eq!(first.total_pages, 200);
    assert_eq!(first.results.len(), 50);

    engine.go_to_page(199);
    let last = engine.current_page().expect("page delivered");
    assert_eq!(last.page, 199);
    assert_eq!(last.results.len(), 50);
    assert_eq!(last.results[0].chunk.id.to_string(), "9950");

    engine.go_to_page(200);
    assert_eq!(engine.current_page().map(|p| p.page), Some(199));

    assert_eq!(pages(&drain(&mut rx)).len(), 3);
}

/// Pages compared without their timing.
fn untimed(page: Option<ResultsPage>) -> Option<ResultsPage> {
    page.map(|mut p| {
        p.elapsed = Duration::ZERO;
        p
    })
}

#[test]
fn repeated_search_is_idempotent() {
    let engine = SearchEngine::new(
        EngineConfig::default().with_page_size(4).expect("valid size"),
        (),
    );
    engine.install_corpus(numbered(20));

    // "1" scores once more for each extra digit: "line 11" ranks first.
    engine.search_now("line 1 -15");
    let first = untimed(engine.current_page()).expect("page delivered");
    assert_eq!(first.total, 10);
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.results[0].chunk.id.to_string(), "11");
    assert_eq!(first.results[0].score, 15);
    assert!(first.results[0].score > first.results[3].score);
    engine.go_to_page(2);
    let last = untimed(engine.current_page());

    engine.search_now("line 1 -15");
    assert_eq!(untimed(engine.current_page()), Some(first));
    engine.go_to_page(2);
    assert_eq!(untimed(engine.current_page()), last);
}

#[test]
fn search_text_is_untouched_by_searching() {
    let corpus = Corpus::from_parts(
        vec![
            Work::new("a.txt", "A").with_category("x"),
            Work::new("b.txt", "B").with_category("y"),
        ],
        vec![
            Chunk::new(1, "a.txt", "Alpha BETA gamma"),
            Chunk::new(2, "b.txt", "beta Delta"),
            Chunk::new(3, "a.txt", "Gamma \"quoted\" EPSILON"),
        ],
    )
    .expect("valid corpus");

    let engine = SearchEngine::new(EngineConfig::default(), ());
    let installed = engine.install_corpus(corpus);
    let before = installed.chunks().to_vec();

    engine.search_now("BETA");
    engine.set_filter(lectern::Filter::Category, Some("x"));
    engine.search_now("\"gamma\" -delta");
    engine.set_filter(lectern::Filter::Work, Some("b.txt"));
    engine.search_now("");
    engine.next_page();

    let after = engine.corpus().expect("corpus loaded");
    assert_eq!(after.chunks(), before.as_slice());
    assert_eq!(before[0].search_text, "alpha beta gamma");
}

#[test]
fn go_to_page_round_trip_restores_the_page() {
    let engine = SearchEngine::new(
        EngineConfig::default().with_page_size(6).expect("valid size"),
        (),
    );
    engine.install_corpus(numbered(40));
    engine.search_now("record");

    for p in [0, 3, 6] {
        engine.go_to_page(p);
        let there = untimed(engine.current_page());
        engine.go_to_page(0);
        engine.go_to_page(p);
        assert_eq!(untimed(engine.current_page()), there);
    }
}

#[derive(Default)]
struct SlowOnOld {
    delivered: Mutex<Vec<String>>,
}

impl EngineObserver for SlowOnOld {
    fn on_results(&self, page: &ResultsPage) {
        if page.query == "old" {
            std::thread::sleep(Duration::from_millis(300));
        }
        self.delivered.lock().unwrap().push(page.query.clone());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_delivery_never_lands_after_a_newer_search() {
    let observer = Arc::new(SlowOnOld::default());
    let config =
        EngineConfig::default().with_debounce(Duration::from_millis(10));
    let engine = SearchEngine::new(config, observer.clone());
    engine.install_corpus(numbered(10));

    engine.search("old");
    // The debounced search is now inside its slow delivery.
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.search_now("new");

    tokio::time::sleep(Duration::from_millis(600)).await;
    let delivered = observer.delivered.lock().unwrap().clone();
    assert_eq!(delivered, vec!["old", "new"]);
    assert_eq!(engine.search_term(), "new");
    assert_eq!(engine.current_page().map(|p| p.query), Some("new".into()));
}

#[test]
fn next_then_prev_returns_to_the_same_page() {
    let engine = SearchEngine::new(
        EngineConfig::default().with_page_size(7).expect("valid size"),
        (),
    );
    engine.install_corpus(numbered(30));
    engine.search_now("line");
    engine.go_to_page(2);

    let before = engine.current_page().expect("page delivered");
    engine.next_page();
    engine.prev_page();
    let after = engine.current_page().expect("page delivered");

    assert_eq!(before.page, after.page);
    assert_eq!(before.results, after.results);
}

#[test]
fn deep_link_round_trips_through_parse() {
    let engine = SearchEngine::new(EngineConfig::default(), ());
    engine.install_corpus(numbered(3));
    engine.search_now("of the");

    let chunk = engine.chunk_by_id("2").expect("chunk 2 exists");
    let fragment = engine.deep_link(&chunk);
    let link = lectern::deep_link::DeepLink::parse(&fragment)
        .expect("fragment has an id");

    assert_eq!(link.id, "2");
    assert_eq!(link.query.as_deref(), Some("of the"));
    assert_eq!(engine.chunk_by_id(&link.id), Some(chunk));
}
