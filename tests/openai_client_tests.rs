//! OpenAI chat and Assistants clients against a mock HTTP server.

use ecoclaim::error::EcoError;
use ecoclaim::provider::assistants::OpenAiAssistantsClient;
use ecoclaim::provider::openai::OpenAiChatProvider;
use ecoclaim::provider::{ChatProvider, JobService};
use ecoclaim::types::*;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_provider(server: &MockServer) -> OpenAiChatProvider {
    OpenAiChatProvider::new("gpt-3.5-turbo", "test-key".to_string(), Some(server.uri()))
}

fn assistants(server: &MockServer) -> OpenAiAssistantsClient {
    OpenAiAssistantsClient::new("test-key".to_string(), Some(server.uri()))
}

#[tokio::test]
async fn stream_chat_yields_fragments_in_order() {
    let server = MockServer::start().await;
    let sse = [
        r#"data: {"choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#,
        r#"data: {"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#,
        r#"data: {"choices":[{"delta":{"content":"lo"},"finish_reason":null}]}"#,
        r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        "data: [DONE]",
    ]
    .map(|line| format!("{line}\n\n"))
    .concat();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo",
            "stream": true,
            "messages": [{"role": "user", "content": "hi"}]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse),
        )
        .expect(1)
        .mount(&server)
        .await;

    let stream = chat_provider(&server)
        .stream_chat(&[ConversationMessage::user("hi")])
        .await
        .unwrap();
    let deltas: Vec<TextStreamDelta> = stream.map(|d| d.unwrap()).collect().await;

    let text: String = deltas
        .iter()
        .filter(|d| d.event_type == StreamEventType::TextDelta)
        .map(|d| d.text.as_str())
        .collect();
    assert_eq!(text, "Hello");
    let last = deltas.last().unwrap();
    assert_eq!(last.event_type, StreamEventType::Done);
    assert_eq!(last.finish_reason, Some(FinishReason::Stop));
}

/// Serve one chunked `text/event-stream` response, flushing each chunk separately.
async fn chunked_sse_server(chunks: Vec<Vec<u8>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                if n == 0 {
                    return;
                }
                continue;
            };
            let head = String::from_utf8_lossy(&request[..head_end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= head_end + 4 + body_len || n == 0 {
                break;
            }
        }

        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n")
            .await
            .unwrap();
        for chunk in chunks {
            socket
                .write_all(format!("{:x}\r\n", chunk.len()).as_bytes())
                .await
                .unwrap();
            socket.write_all(&chunk).await.unwrap();
            socket.write_all(b"\r\n").await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        socket.write_all(b"0\r\n\r\n").await.unwrap();
        socket.flush().await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn stream_chat_keeps_characters_split_across_chunks() {
    let body = [
        r#"data: {"choices":[{"delta":{"content":"café"},"finish_reason":null}]}"#,
        r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        "data: [DONE]",
    ]
    .map(|line| format!("{line}\n\n"))
    .concat()
    .into_bytes();
    let split = body.iter().position(|&b| b == 0xC3).unwrap() + 1;
    let base_url = chunked_sse_server(vec![body[..split].to_vec(), body[split..].to_vec()]).await;

    let provider = OpenAiChatProvider::new("gpt-3.5-turbo", "test-key".to_string(), Some(base_url));
    let stream = provider
        .stream_chat(&[ConversationMessage::user("coffee?")])
        .await
        .unwrap();
    let deltas: Vec<TextStreamDelta> = stream.map(|d| d.unwrap()).collect().await;

    let text: String = deltas
        .iter()
        .filter(|d| d.event_type == StreamEventType::TextDelta)
        .map(|d| d.text.as_str())
        .collect();
    assert_eq!(text, "café");
    assert_eq!(deltas.last().unwrap().finish_reason, Some(FinishReason::Stop));
}

#[tokio::test]
async fn stream_chat_maps_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided"}
        })))
        .mount(&server)
        .await;

    let err = match chat_provider(&server).stream_chat(&[ConversationMessage::user("hi")]).await {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    };
    assert!(matches!(err, EcoError::Authentication(msg) if msg.contains("Incorrect API key")));
}

#[tokio::test]
async fn complete_json_requests_json_object_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo-1106",
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {"role": "assistant", "content": "{\"initialAirport\":\"LHR\"}"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let value = chat_provider(&server)
        .complete_json("gpt-3.5-turbo-1106", &[ConversationMessage::user("from LHR")])
        .await
        .unwrap();
    assert_eq!(value, json!({"initialAirport": "LHR"}));
}

#[tokio::test]
async fn assistants_thread_and_run_lifecycle() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/threads"))
        .and(header("openai-beta", "assistants=v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_1", "object": "thread"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/messages"))
        .and(body_partial_json(json!({"role": "user", "content": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "msg_1", "object": "thread.message"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/runs"))
        .and(body_partial_json(json!({"assistant_id": "asst_1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "run_1", "status": "queued"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {"tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "updateTravelForm", "arguments": "{\"flightClass\":\"first\"}"}
                }]}
            }
        })))
        .mount(&server)
        .await;

    let client = assistants(&server);
    let thread = client.create_thread().await.unwrap();
    assert_eq!(thread, ThreadId::new("thread_1"));
    client.append_message(&thread, "hello").await.unwrap();
    let run = client.create_run(&thread, "asst_1").await.unwrap();
    assert_eq!(run.status, RunStatus::Queued);

    let snapshot = client.retrieve_run(&thread, &run.id).await.unwrap();
    assert_eq!(
        snapshot.status,
        RunStatus::RequiresAction {
            actions: vec![ToolInvocation {
                invocation_id: "call_1".into(),
                tool_name: "updateTravelForm".into(),
                raw_arguments: "{\"flightClass\":\"first\"}".into(),
            }]
        }
    );
}

#[tokio::test]
async fn submit_tool_outputs_sends_one_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/runs/run_1/submit_tool_outputs"))
        .and(body_partial_json(json!({
            "tool_outputs": [
                {"tool_call_id": "call_a", "output": "{\"total\":1.05}"},
                {"tool_call_id": "call_b", "output": "{\"error\":\"Failure\",\"kind\":\"unknown_tool\",\"message\":\"Unknown tool: x\"}"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "run_1", "status": "in_progress"})))
        .expect(1)
        .mount(&server)
        .await;

    let outputs = vec![
        ToolOutput::success("call_a", &json!({"total": 1.05})),
        ToolOutput::failure("call_b", "unknown_tool", "Unknown tool: x"),
    ];
    let snapshot = assistants(&server)
        .submit_tool_outputs(&ThreadId::new("thread_1"), &RunId::new("run_1"), &outputs)
        .await
        .unwrap();
    assert_eq!(snapshot.status, RunStatus::InProgress);
}

#[tokio::test]
async fn list_messages_filters_by_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .and(query_param("run_id", "run_1"))
        .and(query_param("order", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"id": "msg_2", "role": "assistant", "created_at": 20,
                 "content": [{"type": "text", "text": {"value": "Answer", "annotations": []}}]},
                {"id": "msg_1", "role": "user", "created_at": 10,
                 "content": [{"type": "text", "text": {"value": "Question", "annotations": []}}]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let messages = assistants(&server)
        .list_messages(&ThreadId::new("thread_1"), Some(&RunId::new("run_1")))
        .await
        .unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::Assistant);
    assert_eq!(messages[0].content, "Answer");
    assert_eq!(messages[1].created_at.timestamp(), 10);
}

#[tokio::test]
async fn failed_run_and_rate_limits_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/runs/run_failed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_failed",
            "status": "failed",
            "last_error": {"code": "server_error", "message": "boom"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/runs/run_limited"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached"}
        })))
        .mount(&server)
        .await;

    let client = assistants(&server);
    let thread = ThreadId::new("thread_1");

    let failed = client.retrieve_run(&thread, &RunId::new("run_failed")).await.unwrap();
    assert_eq!(
        failed.status,
        RunStatus::Failed {
            reason: Some("server_error: boom".into())
        }
    );

    let err = client
        .retrieve_run(&thread, &RunId::new("run_limited"))
        .await
        .unwrap_err();
    assert!(matches!(err, EcoError::RateLimited { .. }));
}
