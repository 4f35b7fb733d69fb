//! Tool adapters for the agentic SDK.

pub mod browser;

pub use browser::{BrowserUseConfig, BrowserUseTool, DEFAULT_BROWSER_MODEL};
