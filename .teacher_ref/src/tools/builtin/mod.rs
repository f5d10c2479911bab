//! Built-in tools that come with the agent.

mod browser;
mod echo;
mod ecommerce;
pub mod extension_tools;
mod file;
mod http;
mod job;
mod json;
mod marketplace;
mod memory;
mod restaurant;
pub mod routine;
mod session_tools;
pub(crate) mod shell;
mod taskrabbit;
mod time;

pub use browser::{BrowserAction, BrowserManager, BrowserSession, BrowserTool};
pub use echo::EchoTool;
pub use ecommerce::EcommerceTool;
pub use extension_tools::{
    ToolActivateTool, ToolAuthTool, ToolInstallTool, ToolListTool, ToolRemoveTool, ToolSearchTool,
};
pub use file::{ApplyPatchTool, ListDirTool, ReadFileTool, WriteFileTool};
pub use http::HttpTool;
pub use job::{CancelJobTool, CreateJobTool, JobStatusTool, ListJobsTool};
pub use json::JsonTool;
pub use marketplace::MarketplaceTool;
pub use memory::{
    MemoryConnectTool, MemoryProfileTool, MemoryReadTool, MemorySearchTool, MemorySpacesTool,
    MemoryTreeTool, MemoryWriteTool,
};
pub use restaurant::RestaurantTool;
pub use routine::{
    RoutineCreateTool, RoutineDeleteTool, RoutineHistoryTool, RoutineListTool, RoutineUpdateTool,
};
pub use session_tools::{SessionHistoryTool, SessionListTool, SessionSendTool};
pub use shell::ShellTool;
pub use taskrabbit::TaskRabbitTool;
pub use time::TimeTool;
