//! Minimal MCP server: newline-delimited JSON-RPC 2.0 over stdio with a
//! registry of named tools.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use crate::error::ToolError;

pub type ToolHandler = Box<dyn Fn(Value) -> Result<Value, ToolError>>;

const METHOD_NOT_FOUND: i64 = -32601;

pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub handler: ToolHandler,
}

pub struct McpServer {
    name: String,
    version: String,
    tools: BTreeMap<String, Tool>,
}

impl McpServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            tools: BTreeMap::new(),
        }
    }

    pub fn register_tool(
        &mut self,
        name: &str,
        description: &str,
        input_schema: Value,
        handler: ToolHandler,
    ) {
        self.tools.insert(
            name.to_string(),
            Tool {
                name: name.to_string(),
                description: description.to_string(),
                input_schema,
                handler,
            },
        );
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn run_stdio(&self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.serve(stdin.lock(), stdout.lock())
    }

    pub fn serve<R: BufRead, W: Write>(&self, input: R, mut output: W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let request: Value = match serde_json::from_str(trimmed) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(error = %err, "ignoring invalid json line");
                    continue;
                }
            };
            if let Some(response) = self.handle_request(request) {
                let serialized = match serde_json::to_string(&response) {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::error!(error = %err, "failed to serialize response");
                        continue;
                    }
                };
                output.write_all(serialized.as_bytes())?;
                output.write_all(b"\n")?;
                output.flush()?;
            }
        }
        tracing::info!(server = %self.name, "stdin closed");
        Ok(())
    }

    /// Notifications (requests without an id) get no response.
    pub fn handle_request(&self, request: Value) -> Option<Value> {
        let id = request.get("id").cloned()?;
        let method = request
            .get("method")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        match method {
            "initialize" => Some(ok(
                id,
                json!({
                    "serverInfo": {
                        "name": self.name,
                        "version": self.version,
                    },
                    "capabilities": {
                        "tools": { "list": true, "call": true }
                    }
                }),
            )),
            "tools/list" => {
                let tools: Vec<Value> = self
                    .tools
                    .values()
                    .map(|tool| {
                        json!({
                            "name": tool.name,
                            "description": tool.description,
                            "inputSchema": tool.input_schema,
                        })
                    })
                    .collect();
                Some(ok(id, json!({ "tools": tools })))
            }
            "tools/call" => {
                let params = request.get("params").cloned().unwrap_or_else(|| json!({}));
                let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
                let args = params
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| json!({}));
                let Some(tool) = self.tools.get(name) else {
                    return Some(err(id, METHOD_NOT_FOUND, format!("Tool not found: {name}")));
                };
                tracing::debug!(tool = name, "tool call");
                match (tool.handler)(args) {
                    Ok(result) => Some(ok(id, result)),
                    Err(error) => {
                        tracing::warn!(tool = name, error = %error, "tool call failed");
                        Some(err(id, error.code(), error.to_string()))
                    }
                }
            }
            "ping" => Some(ok(id, json!({}))),
            _ => Some(err(id, METHOD_NOT_FOUND, format!("Method not found: {method}"))),
        }
    }
}

fn ok(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

fn err(id: Value, code: i64, message: String) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message,
        }
    })
}

/// Wraps a payload as MCP text content.
pub fn text_result(data: Value) -> Value {
    let text = match data.as_str() {
        Some(text) => text.to_string(),
        None => serde_json::to_string_pretty(&data).unwrap_or_else(|_| "{}".to_string()),
    };
    json!({
        "content": [
            { "type": "text", "text": text }
        ],
        "structuredContent": data
    })
}
