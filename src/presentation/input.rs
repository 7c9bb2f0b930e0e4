use crate::application::{insert_char, remove_at, remove_before, App, AppMode, Screen};
use crossterm::event::{KeyCode, KeyModifiers};

pub struct InputHandler;

#[derive(Debug, Clone, Copy)]
enum FileAction {
    Save,
    Load,
    Export,
}

impl InputHandler {
    pub fn handle_key_event(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        match app.mode {
            AppMode::Normal => Self::handle_normal_mode(app, key, modifiers),
            AppMode::Help => Self::handle_help_mode(app, key),
            AppMode::Form => Self::handle_form_mode(app, key),
            AppMode::ConfirmDelete => Self::handle_confirm_mode(app, key),
            AppMode::ProductView => Self::handle_product_view_mode(app, key),
            AppMode::Search => Self::handle_search_mode(app, key),
            AppMode::SaveAs => Self::handle_filename_input_mode(app, key, FileAction::Save),
            AppMode::LoadFile => Self::handle_filename_input_mode(app, key, FileAction::Load),
            AppMode::ExportCsv => Self::handle_filename_input_mode(app, key, FileAction::Export),
        }
    }

    fn handle_normal_mode(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) {
            match key {
                KeyCode::Char('s') => app.start_save_as(),
                KeyCode::Char('o') => app.start_load_file(),
                KeyCode::Char('e') => app.start_csv_export(),
                _ => {}
            }
            return;
        }

        app.status_message = None;

        match key {
            KeyCode::Tab => app.next_screen(),
            KeyCode::BackTab => app.previous_screen(),
            KeyCode::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                app.set_screen(Screen::ALL[index]);
            }
            KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => app.select_next(),
            KeyCode::Home => app.selected = 0,
            KeyCode::End => app.selected = app.row_count().saturating_sub(1),
            KeyCode::Char('n') => app.start_create(),
            KeyCode::Char('e') | KeyCode::F(2) => app.start_edit(),
            KeyCode::Char('d') | KeyCode::Delete => app.start_delete(),
            KeyCode::Enter => match app.screen {
                Screen::Products | Screen::Reports => app.view_selected_product(),
                Screen::Categories | Screen::Tags => app.show_selected_products(),
            },
            KeyCode::Esc if app.screen == Screen::Products => {
                if app.clear_list_filter() {
                    app.status_message = Some("Showing all products.".to_string());
                }
            }
            KeyCode::Char('v') => app.view_selected_product(),
            KeyCode::Char('/') => app.start_search(),
            KeyCode::Char('r') if app.screen == Screen::Reports => app.refresh_report(),
            KeyCode::Char('s') | KeyCode::Right | KeyCode::Left if app.screen == Screen::Reports => {
                app.next_report_section();
                if key == KeyCode::Left {
                    // three sections, so two steps forward is one back
                    app.next_report_section();
                }
            }
            KeyCode::F(1) | KeyCode::Char('?') => {
                app.mode = AppMode::Help;
                app.help_scroll = 0;
            }
            _ => {}
        }
    }

    fn handle_form_mode(app: &mut App, key: KeyCode) {
        if key == KeyCode::Enter {
            app.submit_form();
            return;
        }
        if key == KeyCode::Esc {
            app.cancel_form();
            return;
        }
        let Some(form) = app.form.as_mut() else {
            app.mode = AppMode::Normal;
            return;
        };
        match key {
            KeyCode::Tab | KeyCode::Down => form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => form.focus_previous(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Delete => form.delete(),
            KeyCode::Left => form.move_left(),
            KeyCode::Right => form.move_right(),
            KeyCode::Home => form.move_home(),
            KeyCode::End => form.move_end(),
            KeyCode::Char(c) => form.insert_char(c),
            _ => {}
        }
    }

    fn handle_confirm_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_delete(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_delete(),
            _ => {}
        }
    }

    fn handle_product_view_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => app.close_view(),
            KeyCode::Char('e') => {
                app.close_view();
                app.start_edit();
            }
            _ => {}
        }
    }

    fn handle_help_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?') | KeyCode::Char('q') => {
                app.mode = AppMode::Normal;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if app.help_scroll > 0 {
                    app.help_scroll -= 1;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.help_scroll += 1;
            }
            KeyCode::PageUp => {
                app.help_scroll = app.help_scroll.saturating_sub(5);
            }
            KeyCode::PageDown => {
                app.help_scroll += 5;
            }
            KeyCode::Home => {
                app.help_scroll = 0;
            }
            _ => {}
        }
    }

    fn handle_filename_input_mode(app: &mut App, key: KeyCode, action: FileAction) {
        match key {
            KeyCode::Enter => match action {
                FileAction::Save => app.save_catalog(),
                FileAction::Load => app.load_catalog(),
                FileAction::Export => app.export_csv(),
            },
            KeyCode::Esc => {
                app.cancel_filename_input();
            }
            KeyCode::Backspace => {
                remove_before(&mut app.filename_input, &mut app.cursor_position);
            }
            KeyCode::Delete => {
                remove_at(&mut app.filename_input, app.cursor_position);
            }
            KeyCode::Left => {
                app.cursor_position = app.cursor_position.saturating_sub(1);
            }
            KeyCode::Right => {
                if app.cursor_position < app.filename_input.chars().count() {
                    app.cursor_position += 1;
                }
            }
            KeyCode::Home => {
                app.cursor_position = 0;
            }
            KeyCode::End => {
                app.cursor_position = app.filename_input.chars().count();
            }
            KeyCode::Char(c) => {
                insert_char(&mut app.filename_input, &mut app.cursor_position, c);
            }
            _ => {}
        }
    }

    fn handle_search_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Enter => {
                app.finish_search();
            }
            KeyCode::Esc => {
                app.cancel_search();
            }
            KeyCode::Backspace => {
                // live search: the list filters as the query changes
                remove_before(&mut app.search_query, &mut app.cursor_position);
                app.selected = 0;
            }
            KeyCode::Delete => {
                remove_at(&mut app.search_query, app.cursor_position);
                app.selected = 0;
            }
            KeyCode::Left => {
                app.cursor_position = app.cursor_position.saturating_sub(1);
            }
            KeyCode::Right => {
                if app.cursor_position < app.search_query.chars().count() {
                    app.cursor_position += 1;
                }
            }
            KeyCode::Home => {
                app.cursor_position = 0;
            }
            KeyCode::End => {
                app.cursor_position = app.search_query.chars().count();
            }
            KeyCode::Down => app.select_next(),
            KeyCode::Up => app.select_previous(),
            KeyCode::Char(c) => {
                insert_char(&mut app.search_query, &mut app.cursor_position, c);
                app.selected = 0;
            }
            _ => {}
        }
    }
}
