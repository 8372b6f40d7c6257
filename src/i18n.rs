/// Status-line and notification phrases.
/// Locale can be selected via the `--locale` CLI flag (e.g. `--locale zh`) or the `[ui]` config section.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl Locale {
    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "zh" | "zh-cn" | "zh_cn" | "zh-hans" | "zh-tw" | "zh_tw" => Self::Zh,
            _ => Self::En,
        }
    }
}

pub struct Messages {
    pub select_drive: &'static str,
    pub select_save_dir: &'static str,
    pub select_files: &'static str,
    pub starting_scan: &'static str,
    pub scan_waiting: &'static str,
    pub scan_started: &'static str,
    pub scan_complete: &'static str,
    pub scan_failed: &'static str,
    pub scan_failed_logs: &'static str,
    pub scan_error: &'static str,
    pub starting_recovery: &'static str,
    pub recovery_waiting: &'static str,
    pub recovery_sent: &'static str,
    pub recovery_complete: &'static str,
    pub recovery_failed_logs: &'static str,
    pub recovery_finished: &'static str,
    pub recovery_error: &'static str,
    pub starting_delete: &'static str,
    /// `{count}` is replaced with the number of files.
    pub delete_confirm: &'static str,
    pub delete_declined: &'static str,
    pub delete_complete: &'static str,
    pub delete_sent: &'static str,
    pub delete_failed_logs: &'static str,
    pub already_running: &'static str,
    pub tracking_timed_out: &'static str,
    pub browse_failed: &'static str,
    pub no_files_found: &'static str,
    pub summary_header: &'static str,
    pub preview_action: &'static str,
    pub preview_loading: &'static str,
    pub preview_unavailable: &'static str,
    pub preview_failed: &'static str,
}

pub static EN: Messages = Messages {
    select_drive: "Please select a drive/path to scan.",
    select_save_dir: "Please select a save directory.",
    select_files: "Please select at least one file.",
    starting_scan: "Starting scan...",
    scan_waiting: "Scan started, please wait...",
    scan_started: "Scan started.",
    scan_complete: "Scan complete.",
    scan_failed: "Scan failed.",
    scan_failed_logs: "Scan failed, check server logs.",
    scan_error: "Scan error",
    starting_recovery: "Starting recovery...",
    recovery_waiting: "Recovery started, please wait...",
    recovery_sent: "Recovery request sent.",
    recovery_complete: "Recovery complete.",
    recovery_failed_logs: "Recovery failed, check server logs.",
    recovery_finished: "Recovery finished. Files recovered",
    recovery_error: "Recovery error",
    starting_delete: "Deleting files permanently...",
    delete_confirm: "Permanently delete {count} file(s)? This cannot be undone.",
    delete_declined: "Deletion cancelled.",
    delete_complete: "Files deleted",
    delete_sent: "Delete request sent.",
    delete_failed_logs: "Delete failed, check server logs.",
    already_running: "Operation already in progress",
    tracking_timed_out: "Lost contact with the server while tracking progress.",
    browse_failed: "Folder picker failed.",
    no_files_found: "No files found.",
    summary_header: "Scan Summary",
    preview_action: "Preview",
    preview_loading: "Loading preview...",
    preview_unavailable: "Preview not available.",
    preview_failed: "Preview failed to load.",
};

pub static ZH: Messages = Messages {
    select_drive: "请选择要扫描的驱动器或路径。",
    select_save_dir: "请选择保存目录。",
    select_files: "请至少选择一个文件。",
    starting_scan: "正在启动扫描...",
    scan_waiting: "扫描已启动，请稍候...",
    scan_started: "扫描已启动。",
    scan_complete: "扫描完成。",
    scan_failed: "扫描失败。",
    scan_failed_logs: "扫描失败，请检查服务器日志。",
    scan_error: "扫描错误",
    starting_recovery: "正在启动恢复...",
    recovery_waiting: "恢复已启动，请稍候...",
    recovery_sent: "恢复请求已发送。",
    recovery_complete: "恢复完成。",
    recovery_failed_logs: "恢复失败，请检查服务器日志。",
    recovery_finished: "恢复结束。已恢复文件数",
    recovery_error: "恢复错误",
    starting_delete: "正在永久删除文件...",
    delete_confirm: "确定永久删除 {count} 个文件吗？此操作无法撤销。",
    delete_declined: "已取消删除。",
    delete_complete: "已删除文件数",
    delete_sent: "删除请求已发送。",
    delete_failed_logs: "删除失败，请检查服务器日志。",
    already_running: "操作正在进行中",
    tracking_timed_out: "跟踪进度时与服务器失去联系。",
    browse_failed: "文件夹选择失败。",
    no_files_found: "未找到文件。",
    summary_header: "扫描摘要",
    preview_action: "预览",
    preview_loading: "正在加载预览...",
    preview_unavailable: "无法预览。",
    preview_failed: "预览加载失败。",
};

pub fn get_messages(locale: Locale) -> &'static Messages {
    match locale {
        Locale::En => &EN,
        Locale::Zh => &ZH,
    }
}
