use env_logger::Env;

/// 初始化日誌系統
///
/// 預設只輸出警告以上的訊息，避免干擾互動選單；
/// 可用 RUST_LOG 環境變數覆寫。
pub fn init() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp_secs()
        .init();
}
