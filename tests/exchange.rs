use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use palaver::{
    ChatError, ChatSession, CompletionClient, HistoryStore, OpenAiClient, Submission, Turn,
};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

struct CapturedRequest {
    head: String,
    body: serde_json::Value,
}

/// Answer exactly one HTTP request with `status` and `body`, returning what was sent.
async fn serve_once(
    status: &'static str,
    body: &'static str,
) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });

    (format!("http://{addr}/v1"), handle)
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before the request was complete");
        buf.extend_from_slice(&chunk[..n]);

        let Some(split) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..split]).to_string();
        let length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);

        let body_start = split + 4;
        if buf.len() >= body_start + length {
            let body = serde_json::from_slice(&buf[body_start..body_start + length]).unwrap();
            return CapturedRequest { head, body };
        }
    }
}

fn client(base_url: String) -> OpenAiClient {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    OpenAiClient::with_http_client(http, base_url, "sk-test")
}

const HI_THERE: &str =
    r#"{"id":"1","choices":[{"index":0,"message":{"role":"assistant","content":"Hi there"},"finish_reason":"stop"}]}"#;

#[tokio::test]
async fn successful_exchange_appends_reply_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let (base_url, server) = serve_once("200 OK", HI_THERE).await;
    let client = client(base_url);
    let mut session = ChatSession::load(HistoryStore::new(dir.path()), true);

    let submission = session.exchange("Hello", &client).await;

    assert_eq!(submission, Submission::Accepted(vec![Turn::user("Hello")]));
    let expected = vec![Turn::user("Hello"), Turn::assistant("Hi there")];
    assert_eq!(session.turns(), expected.as_slice());
    assert!(!session.is_busy());
    assert_eq!(session.last_error(), None);
    assert_eq!(HistoryStore::new(dir.path()).load(), expected);

    let request = server.await.unwrap();
    assert!(request.head.starts_with("POST /v1/chat/completions"));
    assert!(
        request
            .head
            .lines()
            .any(|line| line.eq_ignore_ascii_case("authorization: Bearer sk-test"))
    );
    assert_eq!(request.body["model"], "gpt-3.5-turbo");
    assert_eq!(request.body["max_tokens"], 500);
    assert_eq!(
        request.body["messages"],
        serde_json::json!([{"role": "user", "content": "Hello"}])
    );
}

#[tokio::test]
async fn provider_error_leaves_unanswered_turn() {
    let dir = tempfile::tempdir().unwrap();
    let (base_url, server) = serve_once(
        "429 Too Many Requests",
        r#"{"error":{"message":"rate limited","type":"requests","code":null}}"#,
    )
    .await;
    let client = client(base_url);
    let mut session = ChatSession::load(HistoryStore::new(dir.path()), true);

    session.exchange("Hello", &client).await;

    assert_eq!(session.turns(), &[Turn::user("Hello")]);
    assert!(!session.is_busy());
    assert_eq!(session.last_error(), Some("rate limited"));
    assert_eq!(HistoryStore::new(dir.path()).load(), vec![Turn::user("Hello")]);
    server.await.unwrap();
}

#[tokio::test]
async fn full_history_is_sent_on_every_call() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = ChatSession::load(HistoryStore::new(dir.path()), true);

    let (base_url, first) = serve_once("200 OK", HI_THERE).await;
    session.exchange("Hello", &client(base_url)).await;
    first.await.unwrap();

    let (base_url, second) = serve_once("200 OK", HI_THERE).await;
    session.exchange("And again", &client(base_url)).await;
    let request = second.await.unwrap();

    assert_eq!(
        request.body["messages"],
        serde_json::json!([
            {"role": "user", "content": "Hello"},
            {"role": "assistant", "content": "Hi there"},
            {"role": "user", "content": "And again"},
        ])
    );
    assert_eq!(session.turns().len(), 4);
}

#[tokio::test]
async fn unreachable_endpoint_reports_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let client = client(format!("http://{addr}/v1"));
    let mut session = ChatSession::load(HistoryStore::new(dir.path()), true);

    session.exchange("Hello", &client).await;

    assert_eq!(session.turns(), &[Turn::user("Hello")]);
    assert!(!session.is_busy());
    assert!(!session.last_error().unwrap_or_default().is_empty());
}

#[derive(Default)]
struct CountingClient {
    calls: AtomicUsize,
}

#[async_trait]
impl CompletionClient for CountingClient {
    async fn complete(&self, _history: &[Turn]) -> Result<String, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("Hi there".to_string())
    }
}

#[tokio::test]
async fn missing_credential_never_calls_the_client() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(CountingClient::default());
    let mut session = ChatSession::load(HistoryStore::new(dir.path()), false);

    let submission = session.exchange("Hello", client.as_ref()).await;

    assert_eq!(submission, Submission::Rejected);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    assert!(session.turns().is_empty());
    assert!(!session.is_busy());
    assert!(session.last_error().is_some());
}

#[tokio::test]
async fn empty_input_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let client = CountingClient::default();
    let mut session = ChatSession::load(HistoryStore::new(dir.path()), true);

    assert_eq!(session.exchange("", &client).await, Submission::Ignored);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    assert!(session.turns().is_empty());
    assert!(!session.is_busy());
    assert_eq!(session.last_error(), None);
    assert!(!HistoryStore::new(dir.path()).path().exists());
}

#[test]
fn invalid_slot_starts_an_empty_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path());
    std::fs::write(store.path(), "not json at all").unwrap();

    let session = ChatSession::load(store, true);
    assert!(session.turns().is_empty());
    assert_eq!(session.last_error(), None);
}

#[tokio::test]
async fn cleared_history_stays_empty_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    let client = CountingClient::default();
    let mut session = ChatSession::load(HistoryStore::new(dir.path()), true);
    session.exchange("Hello", &client).await;
    assert_eq!(session.turns().len(), 2);

    session.clear();

    let reloaded = ChatSession::load(HistoryStore::new(dir.path()), true);
    assert!(reloaded.turns().is_empty());
}
