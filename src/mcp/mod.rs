//! MCP (Model Context Protocol) tool server.
//!
//! Serves the `tt` tools over stdio so an assistant host can plan work,
//! generate BMAD documents and validate them without shelling out.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            Assistant host                │
//! └──────────────────────────────────────────┘
//!              │ JSON-RPC lines (stdio)
//!              ▼
//! ┌──────────────────────────────────────────┐
//! │  MCPServer                               │
//! │  • initialize / ping / tools/list        │
//! │  • tools/call ──► Toolbox                │
//! └──────────────────────────────────────────┘
//!              │
//!      ┌───────┼──────────────┐
//!      ▼       ▼              ▼
//!  plan_parser bmad_generator bmad_validator
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use titanium::core::Config;
//! use titanium::llm::LlmChain;
//! use titanium::mcp::{MCPServer, Toolbox};
//!
//! let config = Config::load()?;
//! let chain = LlmChain::from_config(&config.llm);
//! MCPServer::new(Toolbox::new(chain, config.llm)).serve_stdio()?;
//! ```

mod protocol;
mod server;
mod tools;

pub use protocol::{
    CallToolParams, CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    MCPInitializeResult, MCPServerCapabilities, MCPServerInfo, MCPTool, MCPToolInputSchema,
    RequestId, ToolContent, PROTOCOL_VERSION,
};
pub use server::{MCPServer, MCPServerError};
pub use tools::{tool_definitions, ToolError, Toolbox};
