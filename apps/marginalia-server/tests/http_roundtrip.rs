//! End-to-end flows: annotation stores talking to a live server over HTTP

use std::net::SocketAddr;

use uuid::Uuid;

use marginalia_server::annotations::{Anchor, ContentBlock, ReviewNote, SuggestionStatus};
use marginalia_server::client::{ApiError, ContentApi, HttpContentApi};
use marginalia_server::config::Config;
use marginalia_server::markup::{NodeKind, RenderedTree};
use marginalia_server::routes;
use marginalia_server::selection::{Boundary, RawSelection, ScreenRect};
use marginalia_server::service::ContentService;
use marginalia_server::state::AppState;
use marginalia_server::store::{AnnotationStore, Panel};

const CONTENT: &str = "<p>Hello <em>big</em> world, again</p>";

struct Server {
    addr: SocketAddr,
    block_id: Uuid,
    editor: Uuid,
}

impl Server {
    fn api(&self, user: Option<Uuid>) -> HttpContentApi {
        HttpContentApi::new(&format!("http://{}/api/v1", self.addr), user)
    }

    fn store(&self, user: Option<Uuid>) -> AnnotationStore<HttpContentApi> {
        AnnotationStore::new(self.api(user), user)
    }
}

async fn spawn_server() -> Server {
    let editor = Uuid::new_v4();
    let block = ContentBlock::new("greeting", CONTENT);
    let block_id = block.id;
    let service = ContentService::new(vec![block], [editor]);
    let app = routes::app(AppState::new(Config::default(), service));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Server {
        addr,
        block_id,
        editor,
    }
}

/// Drag across `needle` inside the text leaf that contains it
fn select(tree: &RenderedTree, needle: &str) -> RawSelection {
    let node = tree.find_text(needle).unwrap();
    let leaf_text = match tree.kind(node) {
        Some(NodeKind::Text(t)) => t.clone(),
        _ => panic!("not a text node"),
    };

    let byte = leaf_text.find(needle).unwrap();
    let start = leaf_text[..byte].chars().count();
    RawSelection {
        anchor: Boundary { node, offset: start },
        focus: Boundary {
            node,
            offset: start + needle.chars().count(),
        },
        text: needle.to_string(),
        rect: ScreenRect::new(10.0, 40.0, 80.0, 18.0),
    }
}

#[tokio::test]
async fn test_reader_comment_is_shared() {
    let server = spawn_server().await;
    let reader = Uuid::new_v4();

    let mut store = server.store(Some(reader));
    store.load().await.unwrap();
    assert!(!store.can_edit());

    let tree = RenderedTree::parse(CONTENT);
    let selection = store
        .capture_selection(&tree, server.block_id, &select(&tree, "again"))
        .cloned()
        .unwrap();
    assert_eq!((selection.start_offset, selection.end_offset), (17, 22));
    store.open_composer(Panel::Comment).unwrap();

    let comment = store
        .create_comment(selection.anchor(), "Could we drop this word?")
        .await
        .unwrap();
    assert_eq!(comment.selected_text, "again");
    assert_eq!(store.panel(), Panel::Closed);
    assert!(store.selection().is_none());

    let rendered = store.render_block(server.block_id).unwrap();
    assert!(rendered.html.contains(&format!("data-annotation-id=\"{}\"", comment.id)));

    let mut other = server.store(Some(Uuid::new_v4()));
    other.load().await.unwrap();
    let block = other.block(server.block_id).unwrap();
    assert_eq!(block.comments.len(), 1);
    assert_eq!(block.comments[0].body, "Could we drop this word?");
}

#[tokio::test]
async fn test_accepted_suggestion_rewrites_content() {
    let server = spawn_server().await;
    let author = Uuid::new_v4();

    let mut reader = server.store(Some(author));
    reader.load().await.unwrap();
    let comment = reader
        .create_comment(Anchor::new(server.block_id, 17, 22), "Repetitive")
        .await
        .unwrap();
    let suggestion = reader
        .create_suggestion(Anchor::new(server.block_id, 6, 9), "huge")
        .await
        .unwrap();
    assert_eq!(suggestion.original_text, "big");
    assert_eq!(suggestion.status, SuggestionStatus::Pending);

    let mut editor = server.store(Some(server.editor));
    editor.load().await.unwrap();
    assert!(editor.can_edit());

    let accepted = editor
        .accept_suggestion(suggestion.id, Some("Better".to_string()))
        .await
        .unwrap();
    assert_eq!(accepted.status, SuggestionStatus::Accepted);
    assert_eq!(accepted.review_note.as_deref(), Some("Better"));

    let block = editor.block(server.block_id).unwrap();
    assert_eq!(block.content, "<p>Hello <em>huge</em> world, again</p>");

    let moved = block.comments.iter().find(|c| c.id == comment.id).unwrap();
    assert_eq!((moved.start_offset, moved.end_offset), (18, 23));
    assert_eq!(block.text_at(18, 23).as_deref(), Some("again"));
    assert!(moved.is_live());
}

#[tokio::test]
async fn test_rejected_suggestion_leaves_content() {
    let server = spawn_server().await;

    let mut author = server.store(Some(Uuid::new_v4()));
    author.load().await.unwrap();
    let suggestion = author
        .create_suggestion(Anchor::new(server.block_id, 0, 5), "Howdy")
        .await
        .unwrap();

    let mut editor = server.store(Some(server.editor));
    editor.load().await.unwrap();
    let rejected = editor.reject_suggestion(suggestion.id, None).await.unwrap();
    assert_eq!(rejected.status, SuggestionStatus::Rejected);

    editor.load().await.unwrap();
    assert_eq!(editor.block(server.block_id).unwrap().content, CONTENT);
}

#[tokio::test]
async fn test_service_errors_reach_the_client() {
    let server = spawn_server().await;
    let author = Uuid::new_v4();
    let api = server.api(Some(author));

    let mut store = server.store(Some(author));
    store.load().await.unwrap();
    let suggestion = store
        .create_suggestion(Anchor::new(server.block_id, 0, 5), "Howdy")
        .await
        .unwrap();

    let err = api
        .accept_suggestion(suggestion.id, &ReviewNote::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(err.to_string(), "edit authority required");

    let overlapping = store
        .create_suggestion(Anchor::new(server.block_id, 2, 8), "y bi")
        .await
        .unwrap_err();
    assert!(store.error().is_some());
    assert!(overlapping.to_string().contains("overlaps"));

    let missing = api.delete_comment(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(missing, ApiError::Http { status: 404, .. }));
}
