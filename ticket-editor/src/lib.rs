//! Ticket Editor - 终端侧点单修改与多来源对账引擎
//!
//! # 架构概述
//!
//! Buffers a terminal's in-progress edits of a table's order and reconciles
//! them with the single backend-of-record:
//!
//! - **订单编辑** (`orders`): snapshot, pending change ledger, selection, confirm/cancel
//! - **多来源合并** (`consolidation`): terminal + external-app order lines
//! - **会话冲突** (`session`): validate-before-edit, merge policies, autosave / recovery
//! - **后端接口** (`backend`): backend-of-record trait + reqwest client
//! - **编辑会话** (`editor`): [`TableEditor`], one handle per table being edited
//!
//! Identity rule: a line is identified by its menu name. Two lines with the
//! same name are the same logical item for this restaurant domain.
//!
//! # 模块结构
//!
//! ```text
//! ticket-editor/src/
//! ├── core/           # 配置、错误
//! ├── backend/        # BackendOfRecord, HttpBackend
//! ├── orders/         # snapshot, ledger, selection, diff, coordinator
//! ├── consolidation.rs
//! ├── session/        # merge, resolver, redb storage, autosave worker
//! ├── editor.rs       # TableEditor
//! └── utils/          # 日志
//! ```

pub mod backend;
pub mod consolidation;
pub mod core;
pub mod editor;
pub mod orders;
pub mod session;
pub mod utils;

// Re-export 公共类型
pub use backend::{BackendError, BackendOfRecord, BackendResult, HttpBackend};
pub use consolidation::Consolidation;
pub use core::{ConflictPolicy, EditorConfig, EditorError, EditorResult};
pub use editor::{AddedItem, EditGate, TableEditor};
pub use orders::{ConfirmOutcome, Confirmation, ModificationCoordinator, RowHandle};
pub use session::{ConflictChoice, ConflictPrompter, EditValidation, RecoveredSession};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置环境 (dotenv, 日志)
///
/// Returns the configuration loaded from the environment.
pub fn setup_environment() -> EditorConfig {
    if let Err(e) = dotenv::dotenv() {
        // .env 是可选的
        eprintln!("No .env loaded: {}", e);
    }
    let config = EditorConfig::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    config
}
