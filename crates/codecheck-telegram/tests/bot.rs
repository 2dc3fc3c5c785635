//! Message dispatch against an in-process fake of the Bot API.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use codecheck_core::{CodecheckError, ReportConfig, TelegramConfig, UploadKind};
use codecheck_lint::LintOptions;
use codecheck_review::{ReviewPipeline, SuggestionModel};
use codecheck_telegram::bot::{failure_reply, processed_reply, FALLBACK_REPLY, START_REPLY};
use codecheck_telegram::types::Message;
use codecheck_telegram::{Bot, TelegramClient};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const TOKEN: &str = "42:secret";

struct StubModel;

impl SuggestionModel for StubModel {
    fn name(&self) -> &str {
        "stub"
    }

    async fn suggest(&self, _code: &str) -> Result<String, CodecheckError> {
        Ok("Consider adding docstrings.".to_string())
    }
}

/// One request the fake server received: the Bot API method (or
/// `download` for file fetches) and the raw body.
#[derive(Debug, Clone)]
struct Call {
    method: String,
    body: Vec<u8>,
}

impl Call {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    files: HashMap<String, Vec<u8>>,
    updates: VecDeque<Value>,
}

#[derive(Clone)]
struct FakeApi {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
}

impl FakeApi {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(State::default()));
        let server_state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(serve(stream, Arc::clone(&server_state)));
            }
        });
        Self { addr, state }
    }

    /// Serve `bytes` under `documents/{file_id}`.
    fn add_file(&self, file_id: &str, bytes: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(format!("documents/{file_id}"), bytes.to_vec());
    }

    fn queue_updates(&self, updates: Value) {
        self.state.lock().unwrap().updates.push_back(updates);
    }

    fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    fn methods(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }

    fn bot(&self) -> Bot<StubModel> {
        let config = TelegramConfig {
            api_base: format!("http://{}", self.addr),
            poll_timeout_secs: 0,
            retry_delay_secs: 0,
            ..TelegramConfig::default()
        };
        let client = TelegramClient::new(TOKEN, &config).unwrap();
        let pipeline = ReviewPipeline::new(StubModel, LintOptions::default(), ReportConfig::default());
        Bot::new(client, pipeline, config)
    }
}

async fn serve(mut stream: TcpStream, state: Arc<Mutex<State>>) {
    let Some((path, body)) = read_request(&mut stream).await else {
        return;
    };

    let (method, response) = {
        let mut state = state.lock().unwrap();
        let (method, response) = respond(&mut state, &path, &body);
        state.calls.push(Call {
            method: method.clone(),
            body,
        });
        (method, response)
    };

    let content_type = if method == "download" {
        "application/octet-stream"
    } else {
        "application/json"
    };
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.len()
    );
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(&response).await;
    let _ = stream.shutdown().await;
}

fn respond(state: &mut State, path: &str, body: &[u8]) -> (String, Vec<u8>) {
    let file_prefix = format!("/file/bot{TOKEN}/");
    if let Some(file_path) = path.strip_prefix(&file_prefix) {
        let bytes = state.files.get(file_path).cloned().unwrap_or_default();
        return ("download".to_string(), bytes);
    }

    let method = path.rsplit('/').next().unwrap_or_default().to_string();
    let reply = match method.as_str() {
        "getUpdates" => json!({
            "ok": true,
            "result": state.updates.pop_front().unwrap_or_else(|| json!([])),
        }),
        "getFile" => {
            let request: Value = serde_json::from_slice(body).unwrap_or_default();
            let file_id = request["file_id"].as_str().unwrap_or_default().to_string();
            let file_path = format!("documents/{file_id}");
            if state.files.contains_key(&file_path) {
                json!({ "ok": true, "result": { "file_id": file_id, "file_path": file_path } })
            } else {
                json!({ "ok": false, "error_code": 400, "description": "Bad Request: invalid file_id" })
            }
        }
        _ => json!({ "ok": true, "result": { "message_id": 100 } }),
    };
    (method, reply.to_string().into_bytes())
}

async fn read_request(stream: &mut TcpStream) -> Option<(String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let path = String::from_utf8_lossy(&buf[..header_end])
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();
    let mut body = buf[header_end..].to_vec();

    let content_length = head.lines().find_map(|line| {
        line.strip_prefix("content-length:")
            .and_then(|v| v.trim().parse::<usize>().ok())
    });
    if let Some(len) = content_length {
        while body.len() < len {
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body.truncate(len);
    } else if head.contains("transfer-encoding: chunked") {
        while !body.ends_with(b"0\r\n\r\n") {
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body = dechunk(&body);
    }
    Some((path, body))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn dechunk(mut raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(line_end) = find(raw, b"\r\n") {
        let size_text = String::from_utf8_lossy(&raw[..line_end]);
        let size = usize::from_str_radix(size_text.trim(), 16).unwrap_or(0);
        if size == 0 {
            break;
        }
        let start = line_end + 2;
        let end = (start + size).min(raw.len());
        out.extend_from_slice(&raw[start..end]);
        raw = &raw[(end + 2).min(raw.len())..];
    }
    out
}

fn text_message(message_id: i64, text: &str) -> Value {
    json!({ "message_id": message_id, "chat": { "id": 42 }, "text": text })
}

fn document_message(file_id: &str, file_name: &str) -> Message {
    serde_json::from_value(json!({
        "message_id": 7,
        "chat": { "id": 42 },
        "document": { "file_id": file_id, "file_name": file_name }
    }))
    .unwrap()
}

#[tokio::test]
async fn document_gets_reply_then_report() {
    let api = FakeApi::start().await;
    api.add_file("main.py", b"x=1\n");

    api.bot()
        .handle_message(&document_message("main.py", "main.py"))
        .await
        .unwrap();

    assert_eq!(
        api.methods(),
        vec!["getFile", "download", "sendMessage", "sendDocument"]
    );
    let calls = api.calls();

    let reply = calls[2].json();
    assert_eq!(reply["chat_id"], 42);
    assert_eq!(reply["text"], processed_reply(UploadKind::File));
    assert_eq!(reply["reply_parameters"]["message_id"], 7);

    let document = calls[3].text();
    assert!(document.contains("filename=\"report.txt\""));
    assert!(document.contains("name=\"chat_id\""));
    assert!(document.contains(
        "Found 1 PEP8 issues:\n1       E225 missing whitespace around operator\n\n\
         Model Suggestions:\nConsider adding docstrings."
    ));
}

#[tokio::test]
async fn archive_upload_is_named_as_archive() {
    let api = FakeApi::start().await;
    api.add_file("bad.zip", b"this is not a zip");

    api.bot()
        .handle_message(&document_message("bad.zip", "project.zip"))
        .await
        .unwrap();

    assert_eq!(api.methods(), vec!["getFile", "download", "sendMessage"]);
    let reply = api.calls()[2].json();
    assert_eq!(reply["text"], failure_reply(UploadKind::Archive));
}

#[tokio::test]
async fn unavailable_file_gets_failure_reply_only() {
    let api = FakeApi::start().await;

    api.bot()
        .handle_message(&document_message("gone.py", "gone.py"))
        .await
        .unwrap();

    assert_eq!(api.methods(), vec!["getFile", "sendMessage"]);
    let reply = api.calls()[1].json();
    assert_eq!(reply["text"], failure_reply(UploadKind::File));
    assert_eq!(reply["reply_parameters"]["message_id"], 7);
}

#[tokio::test]
async fn start_and_fallback_replies() {
    let api = FakeApi::start().await;
    let bot = api.bot();

    for (id, text) in [(1, "/start"), (2, "what is this?")] {
        let message: Message = serde_json::from_value(text_message(id, text)).unwrap();
        bot.handle_message(&message).await.unwrap();
    }

    assert_eq!(api.methods(), vec!["sendMessage", "sendMessage"]);
    let calls = api.calls();
    assert_eq!(calls[0].json()["text"], START_REPLY);
    assert_eq!(calls[0].json()["reply_parameters"]["message_id"], 1);
    assert_eq!(calls[1].json()["text"], FALLBACK_REPLY);
}

#[tokio::test]
async fn polling_acknowledges_handled_updates() {
    let api = FakeApi::start().await;
    api.queue_updates(json!([
        { "update_id": 5, "message": text_message(1, "/start") },
        { "update_id": 6, "message": text_message(2, "hello") },
    ]));

    let watcher = api.clone();
    let shutdown = async move {
        loop {
            let polls = watcher
                .methods()
                .iter()
                .filter(|m| m.as_str() == "getUpdates")
                .count();
            if polls >= 2 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(10), api.bot().run_until(shutdown))
        .await
        .unwrap();

    let calls = api.calls();
    assert_eq!(
        calls.iter().take(4).map(|c| c.method.as_str()).collect::<Vec<_>>(),
        vec!["getUpdates", "sendMessage", "sendMessage", "getUpdates"]
    );
    assert_eq!(calls[0].json()["offset"], 0);
    assert_eq!(calls[1].json()["text"], START_REPLY);
    assert_eq!(calls[2].json()["text"], FALLBACK_REPLY);
    assert_eq!(calls[3].json()["offset"], 7);
}
