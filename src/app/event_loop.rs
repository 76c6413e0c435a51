//! Main event loop
//!
//! One cooperative loop: pump the transport through the emulation,
//! drain engine events, poll the keyboard with a short timeout,
//! dispatch on the UI mode, and redraw when anything is dirty.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::config::SaveType;
use crate::emulation::{keys, Emulation};
use crate::term::save::SaveFormat;
use crate::term::search::SearchOutcome;
use crate::term::TermEvent;

use super::state::UiMode;
use super::App;

/// Keyboard poll timeout; the loop's only suspension point
const POLL_TIMEOUT: Duration = Duration::from_millis(10);
/// Idle sleep when neither transport nor keyboard had anything
const IDLE_SLEEP: Duration = Duration::from_millis(5);

/// Run the main event loop
pub async fn run(app: &mut App) -> Result<()> {
    while !app.state.quit {
        let received = app.session.poll()?;

        while let Some(event) = app.session.terminal_mut().pop_event() {
            handle_term_event(app, event);
        }

        if let Some(info) = app.session.transport_mut().check_exit() {
            app.state.notify(format!("Shell exited: {}", info.format_reason()));
            app.state.quit = true;
        }

        let mut key_seen = false;
        if event::poll(POLL_TIMEOUT)? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    key_seen = true;
                    dispatch_key(app, key)?;
                }
                Event::Resize(_, _) => app.state.redraw = true,
                _ => {}
            }
        }

        if app.session.terminal().is_dirty() || app.state.redraw {
            app.draw()?;
            app.state.redraw = false;
        }

        if received == 0 && !key_seen {
            tokio::time::sleep(IDLE_SLEEP).await;
        }
    }
    Ok(())
}

fn handle_term_event(app: &mut App, event: TermEvent) {
    match event {
        TermEvent::Bell => {
            if app.config.bell_method == "bell" {
                let mut out = std::io::stdout();
                let _ = out.write_all(b"\x07");
                let _ = out.flush();
            }
        }
        TermEvent::Music(tones) => {
            // No audio sink is wired in; note it so the user knows the
            // remote tried to sing.
            tracing::debug!("ANSI music: {} tones", tones.len());
            app.state.notify(format!("\u{266A} ANSI music ({} tones)", tones.len()));
        }
    }
}

fn dispatch_key(app: &mut App, key: KeyEvent) -> Result<()> {
    match app.state.mode {
        UiMode::Console => console_key(app, key),
        UiMode::ScrollbackView => scrollback_key(app, key),
        UiMode::SearchDialog => search_dialog_key(app, key),
        UiMode::SaveDialog => save_dialog_key(app, key),
    }
}

fn console_key(app: &mut App, key: KeyEvent) -> Result<()> {
    if key.modifiers.contains(KeyModifiers::ALT) {
        match key.code {
            KeyCode::Char('x') => {
                app.state.quit = true;
                return Ok(());
            }
            KeyCode::Char('e') => {
                cycle_emulation(app);
                return Ok(());
            }
            KeyCode::Char('r') => {
                app.session.reset_emulation();
                app.state.notify("Emulation reset");
                return Ok(());
            }
            _ => {}
        }
    }
    if key.code == KeyCode::PageUp {
        enter_scrollback(app);
        return Ok(());
    }
    if let Some(term_key) = keys::from_key_event(&key) {
        app.session.send_key(term_key)?;
    }
    Ok(())
}

fn enter_scrollback(app: &mut App) {
    app.state.mode = UiMode::ScrollbackView;
    app.session
        .terminal_mut()
        .scrollback_mut()
        .set_tracking_tail(false);
    app.state.redraw = true;
}

fn leave_scrollback(app: &mut App) {
    app.state.mode = UiMode::Console;
    let term = app.session.terminal_mut();
    term.clear_search();
    term.scrollback_mut().set_tracking_tail(true);
    app.state.redraw = true;
}

fn scrollback_key(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => leave_scrollback(app),
        KeyCode::Char('/') => {
            app.state.search_field.set_value("");
            app.state.mode = UiMode::SearchDialog;
            app.state.redraw = true;
        }
        KeyCode::Char('n') => find_again(app),
        KeyCode::Char('s') => {
            let default_name = default_dump_name(app.config.scrollback_save_type);
            app.state.save_field.set_value(&default_name);
            app.state.mode = UiMode::SaveDialog;
            app.state.redraw = true;
        }
        code => {
            move_view(app, code);
        }
    }
    Ok(())
}

/// Move the viewport through history. The view bottom never rises above
/// the line that keeps a full window on screen.
fn move_view(app: &mut App, code: KeyCode) {
    let visible = app.session.terminal().visible_rows();
    let sb = app.session.terminal_mut().scrollback_mut();
    let lower = (visible - 1).min(sb.tail_index());
    let current = sb.view_bottom();
    let target = match code {
        KeyCode::Up => current.saturating_sub(1).max(lower),
        KeyCode::Down => current + 1,
        KeyCode::PageUp => current.saturating_sub(visible).max(lower),
        KeyCode::PageDown => current + visible,
        KeyCode::Home => lower,
        KeyCode::End => sb.tail_index(),
        _ => return,
    };
    sb.set_view_bottom(target);
    app.state.redraw = true;
}

fn find_again(app: &mut App) {
    if app.state.last_search.is_empty() {
        app.state.notify("No previous search");
        return;
    }
    match app.session.terminal_mut().search_again() {
        SearchOutcome::Found(_) => app.state.redraw = true,
        SearchOutcome::NoMoreMatches => app.state.notify("No more matches"),
        SearchOutcome::NotFound => app.state.notify("Not found"),
    }
}

fn search_dialog_key(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Esc => {
            app.state.mode = UiMode::ScrollbackView;
        }
        KeyCode::Enter => {
            let needle = app.state.search_field.value();
            app.state.mode = UiMode::ScrollbackView;
            if !needle.is_empty() {
                app.state.last_search = needle.clone();
                match app.session.terminal_mut().search(&needle) {
                    SearchOutcome::Found(_) => {}
                    _ => app.state.notify("Not found"),
                }
            }
        }
        _ => edit_field_key(&mut app.state.search_field, key),
    }
    app.state.redraw = true;
    Ok(())
}

fn save_dialog_key(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Esc => {
            app.state.mode = UiMode::ScrollbackView;
        }
        KeyCode::Enter => {
            let name = app.state.save_field.value();
            app.state.mode = UiMode::ScrollbackView;
            if !name.is_empty() {
                let format = dump_format(app.config.scrollback_save_type, &name);
                let path = crate::config::dumps_dir().join(&name);
                match app.session.terminal().save_scrollback(&path, format) {
                    Ok(()) => app.state.notify(format!("Saved {}", path.display())),
                    Err(e) => {
                        tracing::error!("Scrollback save failed: {:#}", e);
                        app.state.notify(format!("Save failed: {}", e));
                    }
                }
            }
        }
        _ => edit_field_key(&mut app.state.save_field, key),
    }
    app.state.redraw = true;
    Ok(())
}

/// Route ordinary editing keys into a dialog field
fn edit_field_key(field: &mut crate::field::TextField, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => field.keystroke(c),
        KeyCode::Backspace => field.backspace(),
        KeyCode::Delete => field.delete_char(),
        KeyCode::Left => field.left(),
        KeyCode::Right => field.right(),
        KeyCode::Home => field.home(),
        KeyCode::End => field.end(),
        KeyCode::Insert => field.toggle_insert(),
        _ => {}
    }
}

fn cycle_emulation(app: &mut App) {
    let current = app.session.emulation();
    let all = Emulation::ALL;
    let idx = all.iter().position(|&e| e == current).unwrap_or(0);
    let next = all[(idx + 1) % all.len()];
    app.session.set_emulation(next);
    app.state.notify(format!("Emulation: {}", next.label()));
}

fn default_dump_name(save_type: SaveType) -> String {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    match save_type {
        SaveType::Html => format!("scrollback-{}.html", stamp),
        _ => format!("scrollback-{}.txt", stamp),
    }
}

/// The `ask` save type decides by filename extension
fn dump_format(save_type: SaveType, name: &str) -> SaveFormat {
    match save_type {
        SaveType::Normal => SaveFormat::Normal,
        SaveType::Html => SaveFormat::Html,
        SaveType::Ask => {
            if name.ends_with(".html") || name.ends_with(".htm") {
                SaveFormat::Html
            } else {
                SaveFormat::Normal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_format_by_extension() {
        assert_eq!(dump_format(SaveType::Normal, "x.html"), SaveFormat::Normal);
        assert_eq!(dump_format(SaveType::Ask, "x.html"), SaveFormat::Html);
        assert_eq!(dump_format(SaveType::Ask, "x.txt"), SaveFormat::Normal);
        assert_eq!(dump_format(SaveType::Html, "x.txt"), SaveFormat::Html);
    }

    #[test]
    fn test_default_dump_name_extension() {
        assert!(default_dump_name(SaveType::Html).ends_with(".html"));
        assert!(default_dump_name(SaveType::Normal).ends_with(".txt"));
    }
}
