pub mod config;
pub mod error;
pub mod memory;
pub mod registry;
pub mod tools;
pub mod traits;

pub use config::*;
pub use error::{Result, ToolError};
pub use memory::{EventStore, MemoryEvent};
pub use registry::ToolRegistry;
pub use tools::{
    DocsTool, Finding, MemoryTool, ScanTool, SearchHit, SearchTool, UiGrade, UiGradeTool,
    create_default_tools,
};
pub use traits::*;
