//! Tool registry, executor, and builtin tools

mod apps;
mod executor;
mod files;
mod network;
mod registry;
mod system;
mod web;

pub use apps::{OpenApplicationTool, OpenFileTool, OpenUrlTool};
pub use executor::{ExecutorConfig, ToolExecutor, ToolResult};
pub use files::FindFilesTool;
pub use network::{CheckInternetTool, NetworkInfoTool, WifiInfoTool};
pub use registry::{ParamKind, ParamSpec, Tool, ToolRegistry};
pub use system::{CurrentTimeTool, SystemInfoTool};
pub use web::{SearchProvider, WebSearchTool};
