use log::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 註冊 Ctrl-C 處理器
///
/// 旗標設起後，進行中的剪輯會做完，尚未開始的會被跳過，
/// 已完成的部分仍會輸出到預覽圖。
#[must_use]
pub fn setup_shutdown_signal() -> Arc<AtomicBool> {
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let signal_clone = Arc::clone(&shutdown_signal);

    ctrlc::set_handler(move || {
        signal_clone.store(true, Ordering::SeqCst);
        info!("interrupt received, finishing in-flight clips");
        eprintln!("\n收到中斷信號，完成進行中的剪輯後停止...");
    })
    .expect("無法設定 Ctrl-C 處理器");

    shutdown_signal
}
