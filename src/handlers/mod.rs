//! Log tools
//!
//! This module provides the tool trait, the five log tools and the registry
//! the transport dispatches into.
//!
//! ## Key Components
//!
//! - [`LogTool`] - trait implemented by every tool
//! - [`ToolRegistry`] - name to tool map; runs calls with timeout and cancellation
//! - [`ToolContext`] - cache handle and request defaults shared by the tools
//! - [`ToolOutput`] - `{is_error, text}` envelope
//!
//! ## Example
//!
//! ```rust,ignore
//! use logbox::handlers::{ToolContext, ToolRegistry};
//!
//! let ctx = ToolContext::builder().cache(cache).build();
//! let registry = ToolRegistry::with_defaults(Arc::new(ctx));
//! let output = registry.call("tail_logs", args).await?;
//! ```

mod context;
mod registry;
mod tools;
mod traits;
pub mod types;

pub use context::{ToolContext, parse_ttl};
pub use registry::{RegistryError, ToolDescriptor, ToolRegistry};
pub use tools::{JobLogsTool, LogsInfoTool, ReadLogsTool, SearchLogsTool, TailLogsTool};
pub use traits::{HandlerError, LogTool, ToolOutput};
