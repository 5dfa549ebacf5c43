//! Stdio tool server.
//!
//! Reads one JSON-RPC message per line and writes one response per line.
//! Notifications get no response. The loop ends when input closes.

use std::io::{self, BufRead, Write};

use serde_json::Value;

use super::protocol::{
    CallToolParams, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    MCPInitializeResult,
};
use super::tools::{tool_definitions, Toolbox};
use crate::llm::CompletionProvider;

/// Error type for the serve loop.
#[derive(Debug, thiserror::Error)]
pub enum MCPServerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// MCP server exposing the toolbox.
pub struct MCPServer<P> {
    toolbox: Toolbox<P>,
}

impl<P: CompletionProvider> MCPServer<P> {
    pub fn new(toolbox: Toolbox<P>) -> Self {
        Self { toolbox }
    }

    /// Serve on the process's stdin and stdout.
    pub fn serve_stdio(&self) -> Result<(), MCPServerError> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.serve(stdin.lock(), stdout.lock())
    }

    /// Serve until `reader` is exhausted.
    pub fn serve<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> Result<(), MCPServerError> {
        tracing::info!("MCP server ready");

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            tracing::debug!("MCP <- {}", line.trim());

            if let Some(response) = self.handle_line(&line) {
                let json = serde_json::to_string(&response)?;
                tracing::debug!("MCP -> {json}");
                writeln!(writer, "{json}")?;
                writer.flush()?;
            }
        }

        tracing::info!("MCP input closed");
        Ok(())
    }

    /// Handle one raw line; `None` for notifications.
    pub fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    None,
                    JsonRpcError::new(JsonRpcError::PARSE_ERROR, format!("Parse error: {e}")),
                ))
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    None,
                    JsonRpcError::new(JsonRpcError::INVALID_REQUEST, format!("Invalid request: {e}")),
                ))
            }
        };

        self.handle(request)
    }

    /// Dispatch a parsed request.
    pub fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "Notification");
            return None;
        }

        let id = request.id.clone();
        let result = match request.method.as_str() {
            "initialize" => serde_json::to_value(MCPInitializeResult::default())
                .map_err(|e| JsonRpcError::new(JsonRpcError::INVALID_REQUEST, e.to_string())),
            "ping" => Ok(Value::Object(serde_json::Map::new())),
            "tools/list" => serde_json::to_value(ListToolsResult { tools: tool_definitions() })
                .map_err(|e| JsonRpcError::new(JsonRpcError::INVALID_REQUEST, e.to_string())),
            "tools/call" => self.call_tool(request.params),
            other => Err(JsonRpcError::new(
                JsonRpcError::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::new(JsonRpcError::INVALID_PARAMS, "Missing params"))
            .and_then(|p| {
                serde_json::from_value(p)
                    .map_err(|e| JsonRpcError::new(JsonRpcError::INVALID_PARAMS, e.to_string()))
            })?;

        let result = self.toolbox.call(&params.name, &params.arguments);
        serde_json::to_value(result)
            .map_err(|e| JsonRpcError::new(JsonRpcError::INVALID_PARAMS, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::core::LlmConfig;
    use crate::llm::testing::ScriptedProvider;

    fn server() -> MCPServer<ScriptedProvider> {
        MCPServer::new(Toolbox::new(ScriptedProvider::failing(), LlmConfig::default()))
    }

    fn exchange(input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        server().serve(input.as_bytes(), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_handshake_and_list() {
        let input = [
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": "two", "method": "tools/list"}),
        ]
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n");

        let responses = exchange(&input);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "tt");
        assert_eq!(responses[1]["id"], "two");
        assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 3);
        assert!(responses[1]["result"]["tools"][0]["inputSchema"].is_object());
    }

    #[test]
    fn test_parse_error_keeps_serving() {
        let input = format!("{{not json\n\n{}\n", json!({"jsonrpc": "2.0", "id": 5, "method": "ping"}));
        let responses = exchange(&input);

        assert_eq!(responses.len(), 2);
        assert!(responses[0]["id"].is_null());
        assert_eq!(responses[0]["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert_eq!(responses[1]["id"], 5);
        assert!(responses[1]["result"].is_object());
    }

    #[test]
    fn test_unknown_method() {
        let response = server()
            .handle(JsonRpcRequest::new(9, "resources/list", None))
            .unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[test]
    fn test_tools_call_error_is_result() {
        let response = server()
            .handle(JsonRpcRequest::new(3, "tools/call", Some(json!({"name": "missing_tool"}))))
            .unwrap();

        assert!(response.is_success());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"].as_str().unwrap().contains("missing_tool"));
    }

    #[test]
    fn test_tools_call_without_params() {
        let response = server().handle(JsonRpcRequest::new(4, "tools/call", None)).unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }
}
