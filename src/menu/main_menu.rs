use crate::component::sheet_generator::parse_hex_color;
use crate::config::save::save_settings;
use crate::config::types::{Config, Language, OverlayPosition};
use crate::menu::handlers::{run_sheet_from_folder, run_sheet_from_timeline};
use crate::tools::parse_position_specs;
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use rust_i18n::t;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style(t!("main_menu.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let options = vec![
        t!("main_menu.opt_timeline"),
        t!("main_menu.opt_folder"),
        t!("main_menu.opt_settings"),
        t!("main_menu.exit"),
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("main_menu.prompt"))
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => {
            run_sheet_from_timeline(term, shutdown_signal)?;
            Ok(true)
        }
        Some(1) => {
            run_sheet_from_folder(term, shutdown_signal)?;
            Ok(true)
        }
        Some(2) => {
            show_settings_menu(term, config)?;
            Ok(true)
        }
        Some(3) => Ok(false),
        None => Ok(false), // ESC pressed - exit
        _ => unreachable!(),
    }
}

/// 設定選單
fn show_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let options = vec![
            t!("settings.opt_sheet"),
            t!("settings.opt_language"),
            t!("settings.back"),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.prompt"))
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        match selection {
            Some(0) => show_sheet_settings_menu(term, config)?,
            Some(1) => show_language_menu(term, config)?,
            Some(2) | None => break, // ESC or back
            _ => unreachable!(),
        }
    }

    Ok(())
}

/// 預覽圖設定選單
///
/// 每個項目顯示目前值，選取後輸入新值；格式錯誤時不儲存。
fn show_sheet_settings_menu(term: &Term, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.sheet.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let sheet = &config.settings.sheet;
        let items = vec![
            format!("{}: {}", t!("settings.sheet.output_path"), sheet.output_path),
            format!(
                "{}: {}",
                t!("settings.sheet.thumbnail_width"),
                sheet.thumbnail_width
            ),
            format!(
                "{}: {}",
                t!("settings.sheet.clips_per_row"),
                sheet.clips_per_row
            ),
            format!("{}: {}", t!("settings.sheet.positions"), sheet.positions),
            format!("{}: {}", t!("settings.sheet.padding"), sheet.padding),
            format!("{}: {}", t!("settings.sheet.font_size"), sheet.font_size),
            format!(
                "{}: {}",
                t!("settings.sheet.overlay_position"),
                sheet.overlay_position
            ),
            format!("{}: {}", t!("settings.sheet.show_frame"), sheet.show_frame),
            format!("{}: {}", t!("settings.sheet.frame_color"), sheet.frame_color),
            format!(
                "{}: {}",
                t!("settings.sheet.frame_thickness"),
                sheet.frame_thickness
            ),
            format!(
                "{}: {}",
                t!("settings.sheet.frame_padding"),
                sheet.frame_padding
            ),
            format!(
                "{}: {}",
                t!("settings.sheet.max_rows_per_image"),
                sheet.max_rows_per_image
            ),
            format!(
                "{}: {}",
                t!("settings.sheet.show_placeholders"),
                sheet.fcpxml_show_placeholders
            ),
            format!(
                "{}: {}",
                t!("settings.sheet.use_interval_positions"),
                sheet.fcpxml_use_interval_positions
            ),
            format!(
                "{}: {}",
                t!("settings.sheet.placeholder_color"),
                sheet.fcpxml_placeholder_color
            ),
            format!(
                "{}: {}",
                t!("settings.sheet.similarity_threshold"),
                sheet.fcpxml_similarity_threshold
            ),
            format!(
                "{}: {}",
                t!("settings.sheet.search_roots"),
                sheet.search_roots.join(", ")
            ),
            t!("settings.back").to_string(),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.sheet.prompt"))
            .items(&items)
            .default(0)
            .interact_on_opt(term)?;

        let Some(selection) = selection else {
            break;
        };

        let sheet = &mut config.settings.sheet;
        let changed = match selection {
            0 => {
                sheet.output_path = prompt_string(&t!("settings.sheet.output_path"), &sheet.output_path)?;
                true
            }
            1 => prompt_u32(&t!("settings.sheet.thumbnail_width"), &mut sheet.thumbnail_width)?,
            2 => prompt_u32(&t!("settings.sheet.clips_per_row"), &mut sheet.clips_per_row)?,
            3 => {
                let value = prompt_string(&t!("settings.sheet.positions"), &sheet.positions)?;
                match parse_position_specs(&value) {
                    Ok(_) => {
                        sheet.positions = value;
                        true
                    }
                    Err(e) => {
                        show_invalid_value(&e.to_string());
                        false
                    }
                }
            }
            4 => prompt_u32(&t!("settings.sheet.padding"), &mut sheet.padding)?,
            5 => prompt_u32(&t!("settings.sheet.font_size"), &mut sheet.font_size)?,
            6 => {
                sheet.overlay_position = match sheet.overlay_position {
                    OverlayPosition::AboveThumbnails => OverlayPosition::OnThumbnails,
                    OverlayPosition::OnThumbnails => OverlayPosition::AboveThumbnails,
                };
                true
            }
            7 => {
                sheet.show_frame = !sheet.show_frame;
                true
            }
            8 => prompt_color(&t!("settings.sheet.frame_color"), &mut sheet.frame_color)?,
            9 => prompt_u32(&t!("settings.sheet.frame_thickness"), &mut sheet.frame_thickness)?,
            10 => prompt_u32(&t!("settings.sheet.frame_padding"), &mut sheet.frame_padding)?,
            11 => prompt_u32(
                &t!("settings.sheet.max_rows_per_image"),
                &mut sheet.max_rows_per_image,
            )?,
            12 => {
                sheet.fcpxml_show_placeholders = !sheet.fcpxml_show_placeholders;
                true
            }
            13 => {
                sheet.fcpxml_use_interval_positions = !sheet.fcpxml_use_interval_positions;
                true
            }
            14 => prompt_color(
                &t!("settings.sheet.placeholder_color"),
                &mut sheet.fcpxml_placeholder_color,
            )?,
            15 => prompt_threshold(
                &t!("settings.sheet.similarity_threshold"),
                &mut sheet.fcpxml_similarity_threshold,
            )?,
            16 => {
                let current = sheet.search_roots.join(", ");
                let value = prompt_string(&t!("settings.sheet.search_roots"), &current)?;
                sheet.search_roots = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                true
            }
            _ => break,
        };

        if changed {
            save_settings(&config.settings)?;
            println!("\n{}", style(t!("settings.saved")).green());
            std::thread::sleep(std::time::Duration::from_secs(1));
        }
    }

    Ok(())
}

/// 語言設定選單
fn show_language_menu(term: &Term, config: &mut Config) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.language.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let languages = [Language::EnUs, Language::ZhTw];

    let items: Vec<String> = languages.iter().map(|l: &Language| l.to_string()).collect();

    let default_index = languages
        .iter()
        .position(|&l| l == config.settings.language)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.language.prompt"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    // ESC pressed - return without saving
    let Some(selection) = selection else {
        return Ok(());
    };

    let selected_lang = languages[selection];

    if selected_lang != config.settings.language {
        config.settings.language = selected_lang;
        rust_i18n::set_locale(selected_lang.as_str());
        save_settings(&config.settings)?;
        println!("\n{} {}", style(t!("settings.saved")).green(), selected_lang);
        std::thread::sleep(std::time::Duration::from_secs(1));
    }

    Ok(())
}

fn prompt_string(prompt: &str, current: &str) -> Result<String> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .default(current.to_string())
        .interact_text()?;
    Ok(value.trim().to_string())
}

fn prompt_u32(prompt: &str, target: &mut u32) -> Result<bool> {
    let value = prompt_string(prompt, &target.to_string())?;
    match value.parse::<u32>() {
        Ok(parsed) => {
            *target = parsed;
            Ok(true)
        }
        Err(_) => {
            show_invalid_value(&value);
            Ok(false)
        }
    }
}

fn prompt_color(prompt: &str, target: &mut String) -> Result<bool> {
    let value = prompt_string(prompt, target)?;
    match parse_hex_color(&value) {
        Ok(_) => {
            *target = value;
            Ok(true)
        }
        Err(e) => {
            show_invalid_value(&e.to_string());
            Ok(false)
        }
    }
}

fn prompt_threshold(prompt: &str, target: &mut f64) -> Result<bool> {
    let value = prompt_string(prompt, &target.to_string())?;
    match value.parse::<f64>() {
        Ok(parsed) if (0.0..=1.0).contains(&parsed) => {
            *target = parsed;
            Ok(true)
        }
        _ => {
            show_invalid_value(&value);
            Ok(false)
        }
    }
}

fn show_invalid_value(detail: &str) {
    println!(
        "\n{} {}",
        style(t!("settings.invalid_value")).red(),
        detail
    );
    std::thread::sleep(std::time::Duration::from_secs(1));
}
