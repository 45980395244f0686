//! Newline-delimited JSON-RPC over an async reader/writer pair.
//!
//! This is the framing MCP uses on stdio: one JSON object per line, no embedded
//! newlines. The channel is strictly request/response from the client's point of
//! view; anything the server sends while a request is pending is handled inline.

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt as _;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt as _;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

use crate::protocol::jsonrpc::Incoming;
use crate::protocol::jsonrpc::METHOD_NOT_FOUND;
use crate::protocol::jsonrpc::Notification;
use crate::protocol::jsonrpc::Request;
use crate::protocol::jsonrpc::RequestId;
use crate::protocol::jsonrpc::Response;
use crate::protocol::jsonrpc::RpcError;
use crate::protocol::mcp::METHOD_PING;

pub struct JsonRpcChannel<R, W> {
    reader: R,
    writer: W,
    next_id: i64,
    line: String,
}

impl<R, W> JsonRpcChannel<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            next_id: 0,
            line: String::new(),
        }
    }

    /// Send a request and wait for its response.
    #[instrument(skip(self, params))]
    pub async fn request<T: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T> {
        self.next_id += 1;
        let id = RequestId::Number(self.next_id);
        self.send(&Request::new(method, params, id.clone())).await?;

        loop {
            match self.receive().await? {
                Incoming::Response(response) if response.id == id => {
                    if let Some(error) = response.error {
                        bail!("{} failed: {} (code {})", method, error.message, error.code);
                    }
                    let result = response.result.unwrap_or(Value::Null);
                    return serde_json::from_value(result)
                        .with_context(|| format!("Unexpected {} result", method));
                }
                Incoming::Response(response) => {
                    debug!(id = ?response.id, "ignoring response to unknown request");
                }
                Incoming::Request(request) => self.answer(request).await?,
                Incoming::Notification(notification) => {
                    debug!(
                        method = %notification.method,
                        params = ?notification.params,
                        "server notification"
                    );
                }
            }
        }
    }

    /// Send a notification. No response is expected.
    pub async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<()> {
        self.send(&Notification::new(method, params)).await
    }

    /// Reply to a request the server sent us. Only `ping` is supported.
    async fn answer(&mut self, request: Request) -> Result<()> {
        let response = if request.method == METHOD_PING {
            Response::success(request.id, json!({}))
        } else {
            debug!(method = %request.method, "rejecting server request");
            Response::error(
                request.id,
                RpcError::new(
                    METHOD_NOT_FOUND,
                    format!("Method not found: {}", request.method),
                ),
            )
        };
        self.send(&response).await
    }

    async fn send(&mut self, message: &impl Serialize) -> Result<()> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .context("Failed to write to MCP server")?;
        self.writer
            .flush()
            .await
            .context("Failed to write to MCP server")?;
        Ok(())
    }

    /// Read the next well-formed message, skipping blank and unparseable lines.
    async fn receive(&mut self) -> Result<Incoming> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .await
                .context("Failed to read from MCP server")?;
            if read == 0 {
                bail!("MCP server closed the connection");
            }

            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }
            match Incoming::parse(line) {
                Ok(message) => return Ok(message),
                Err(error) => {
                    warn!(line, error = %error.message, "skipping malformed server output")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::AsyncBufReadExt as _;
    use tokio::io::AsyncWriteExt as _;
    use tokio::io::BufReader;
    use tokio::io::DuplexStream;
    use tokio::io::ReadHalf;
    use tokio::io::WriteHalf;

    use super::*;

    type TestChannel = JsonRpcChannel<BufReader<ReadHalf<DuplexStream>>, WriteHalf<DuplexStream>>;

    /// Run a scripted server: `script` maps each received message to the lines
    /// written back. Returns every message the server received.
    fn scripted_server<F>(script: F) -> (TestChannel, tokio::task::JoinHandle<Vec<Value>>)
    where
        F: Fn(&Value) -> Vec<String> + Send + 'static,
    {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client);
        let channel = JsonRpcChannel::new(BufReader::new(client_read), client_write);

        let handle = tokio::spawn(async move {
            let (server_read, mut server_write) = tokio::io::split(server);
            let mut lines = BufReader::new(server_read).lines();
            let mut received = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                let message: Value = serde_json::from_str(&line).unwrap();
                for reply in script(&message) {
                    server_write.write_all(reply.as_bytes()).await.unwrap();
                    server_write.write_all(b"\n").await.unwrap();
                }
                received.push(message);
            }
            received
        });

        (channel, handle)
    }

    #[tokio::test]
    async fn test_request_returns_result() {
        let (mut channel, server) = scripted_server(|message| {
            vec![
                json!({"jsonrpc": "2.0", "id": message["id"], "result": {"answer": 42}})
                    .to_string(),
            ]
        });

        let result: Value = channel.request("answer", Some(json!({"q": 1}))).await.unwrap();
        assert_eq!(result, json!({"answer": 42}));

        drop(channel);
        let received = server.await.unwrap();
        assert_eq!(
            received,
            vec![json!({"jsonrpc": "2.0", "method": "answer", "params": {"q": 1}, "id": 1})]
        );
    }

    #[tokio::test]
    async fn test_request_error_response() {
        let (mut channel, _server) = scripted_server(|message| {
            vec![json!({
                "jsonrpc": "2.0",
                "id": message["id"],
                "error": {"code": -32602, "message": "bad params"}
            })
            .to_string()]
        });

        let err = channel.request::<Value>("tools/call", None).await.unwrap_err();
        assert_eq!(err.to_string(), "tools/call failed: bad params (code -32602)");
    }

    #[tokio::test]
    async fn test_interleaved_server_messages_are_handled() {
        let (mut channel, server) = scripted_server(|message| {
            if message.get("method").is_none() {
                // Our answers to the server's requests.
                return vec![];
            }
            vec![
                String::new(),
                "GitHub MCP Server running on stdio".to_string(),
                json!({
                    "jsonrpc": "2.0",
                    "method": "notifications/message",
                    "params": {"level": "info"}
                })
                .to_string(),
                json!({"jsonrpc": "2.0", "id": "srv-1", "method": "ping"}).to_string(),
                json!({"jsonrpc": "2.0", "id": "srv-2", "method": "sampling/createMessage"})
                    .to_string(),
                json!({"jsonrpc": "2.0", "id": 99, "result": {}}).to_string(),
                json!({"jsonrpc": "2.0", "id": message["id"], "result": "done"}).to_string(),
            ]
        });

        let result: String = channel.request("work", None).await.unwrap();
        assert_eq!(result, "done");

        drop(channel);
        let received = server.await.unwrap();
        assert_eq!(received.len(), 3);
        assert_eq!(received[1], json!({"jsonrpc": "2.0", "result": {}, "id": "srv-1"}));
        assert_eq!(received[2]["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(received[2]["id"], "srv-2");
    }

    #[tokio::test]
    async fn test_ids_increase_and_notifications_have_none() {
        let (mut channel, server) = scripted_server(|message| match message.get("id") {
            Some(id) => vec![json!({"jsonrpc": "2.0", "id": id, "result": null}).to_string()],
            None => vec![],
        });

        channel.request::<Value>("a", None).await.unwrap();
        channel.notify("b", None).await.unwrap();
        channel.request::<Value>("c", None).await.unwrap();

        drop(channel);
        let received = server.await.unwrap();
        assert_eq!(received[0]["id"], 1);
        assert!(received[1].get("id").is_none());
        assert_eq!(received[2]["id"], 2);
    }

    #[tokio::test]
    async fn test_closed_connection_is_an_error() {
        let (client, server) = tokio::io::duplex(1024);
        drop(server);
        let (read, write) = tokio::io::split(client);
        let mut channel = JsonRpcChannel::new(BufReader::new(read), write);

        assert!(channel.request::<Value>("initialize", None).await.is_err());
    }
}
