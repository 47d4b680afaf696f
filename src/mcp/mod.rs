/// MCP protocol implementation
///
/// This module handles the Model Context Protocol communication,
/// including JSON-RPC parsing, tool routing and the timer tick.

pub mod protocol;
pub mod server;

pub use server::McpServer;
