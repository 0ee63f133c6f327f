//! MCP capability types: content, tools, resources, prompts, sampling.

pub mod content;
pub mod prompt;
pub mod resource;
pub mod sampling;
pub mod tool;

pub use content::{
    AudioContent, BlobContent, Content, ContentKind, ImageContent, LinkContent, TextContent,
};
pub use prompt::{
    GetPromptResult, MessageTemplate, Prompt, PromptArgument, PromptMessage, Role,
};
pub use resource::{Resource, ResourceOutput, ResourceTemplate};
pub use sampling::{
    CreateMessageRequest, CreateMessageResult, ModelPreferences, SamplingMessage, StopReason,
};
pub use tool::{CallToolResult, Tool, ToolOutput};
