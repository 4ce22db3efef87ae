use crate::component::SheetGenerator;
use crate::config::Config;
use crate::pause;
use anyhow::Result;
use console::{Term, style};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub fn run_sheet_from_timeline(term: &Term, shutdown_signal: &Arc<AtomicBool>) -> Result<()> {
    let config = Config::new()?;
    let generator = SheetGenerator::new(config, Arc::clone(shutdown_signal));

    if let Err(e) = generator.run_timeline() {
        eprintln!("{} {}", style("錯誤:").red().bold(), e);
    }

    // 取消旗標只對單次生成有效，回到選單後重置
    shutdown_signal.store(false, Ordering::SeqCst);
    pause(term)?;
    Ok(())
}

pub fn run_sheet_from_folder(term: &Term, shutdown_signal: &Arc<AtomicBool>) -> Result<()> {
    let config = Config::new()?;
    let generator = SheetGenerator::new(config, Arc::clone(shutdown_signal));

    if let Err(e) = generator.run_folder() {
        eprintln!("{} {}", style("錯誤:").red().bold(), e);
    }

    shutdown_signal.store(false, Ordering::SeqCst);
    pause(term)?;
    Ok(())
}
