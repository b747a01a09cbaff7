//! 核心模块 - 配置和错误定义
//!
//! - [`EditorConfig`] - 编辑器配置
//! - [`EditorError`] - 编辑操作错误

pub mod config;
pub mod error;

pub use config::{ConflictPolicy, EditorConfig};
pub use error::{EditorError, EditorResult};
