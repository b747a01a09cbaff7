use anyhow::Context;
use ticket_editor::{TableEditor, setup_environment};

/// 诊断工具：打印一张桌子的会话状态、合并视图和可恢复的 autosave
///
/// Usage: `ticket-editor <table_id>`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 日志)
    let config = setup_environment();

    let table_id = std::env::args()
        .nth(1)
        .context("usage: ticket-editor <table_id>")?;

    tracing::info!(
        table_id = %table_id,
        backend = %config.backend_url,
        store_id = %config.store_id,
        "Inspecting table"
    );

    // 2. 编辑会话 (HTTP 后端 + 本地 autosave)
    let editor = TableEditor::from_config(&table_id, config)
        .context("failed to open editing session")?;

    // 3. 合并视图
    let view = editor.load().await.context("failed to load active orders")?;
    println!("Table {} ({} lines, total {})", table_id, view.lines.len(), view.total);
    for line in &view.lines {
        let source = line
            .source
            .map(|s| format!(" [{:?}]", s))
            .unwrap_or_default();
        println!(
            "  {:<24} x{:<3} @ {:>8}{}",
            line.menu_name, line.quantity, line.price, source
        );
    }
    for (source, subtotal) in &view.source_subtotals {
        println!("  subtotal {:?}: {}", source, subtotal);
    }

    // 4. 会话冲突
    match editor.validate_before_edit().await {
        Ok(validation) => {
            println!(
                "can_edit={} conflicts={} resolution={:?} mixed={}",
                validation.can_edit,
                validation.conflicts.len(),
                validation.resolution,
                validation.is_mixed_order
            );
            for session in &validation.conflicts {
                println!(
                    "  {} last active {}",
                    session.device_label, session.last_modified_at
                );
            }
        }
        Err(e) => println!("validation failed: {} ({})", e, e.code()),
    }

    // 5. 可恢复的 autosave
    match editor.recover()? {
        Some(session) => println!(
            "recoverable autosave: {} changes, {}s old",
            session.items.len(),
            session.age.num_seconds()
        ),
        None => println!("no recoverable autosave"),
    }

    Ok(())
}
