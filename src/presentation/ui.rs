use crate::application::{App, AppMode, FormState, ProductRow, Screen};
use crate::domain::{CatalogError, ProductWithDetail, ReportSection};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs},
    Frame,
};

pub fn render_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    match app.screen {
        Screen::Products => render_products(f, app, chunks[1]),
        Screen::Categories => render_categories(f, app, chunks[1]),
        Screen::Tags => render_tags(f, app, chunks[1]),
        Screen::Reports => render_reports(f, app, chunks[1]),
    }
    render_status_bar(f, app, chunks[2]);

    match app.mode {
        AppMode::Help => render_help_popup(f, app.help_scroll),
        AppMode::Form => {
            if let Some(form) = &app.form {
                render_form_popup(f, form);
            }
        }
        AppMode::ConfirmDelete => render_confirm_popup(f, app),
        AppMode::ProductView => {
            if let Some(product) = &app.viewing {
                render_product_popup(f, app, product);
            }
        }
        _ => {}
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(11), Constraint::Min(0), Constraint::Length(12)])
        .split(area);

    f.render_widget(
        Paragraph::new("tcatalog |").style(Style::default().fg(Color::Cyan)),
        chunks[0],
    );

    let titles: Vec<String> = Screen::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{} {}", i + 1, s.title()))
        .collect();
    let selected = Screen::ALL.iter().position(|s| *s == app.screen).unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(Color::Cyan))
        .highlight_style(Style::default().bg(Color::LightBlue).fg(Color::Black));
    f.render_widget(tabs, chunks[1]);

    let access = if app.service.is_authorized() {
        Span::styled("read-write", Style::default().fg(Color::Green))
    } else {
        Span::styled("read-only", Style::default().fg(Color::Red))
    };
    f.render_widget(Paragraph::new(Line::from(access)), chunks[2]);
}

fn selection_state(selected: usize, len: usize) -> TableState {
    TableState::default().with_selected(if len == 0 { None } else { Some(selected.min(len - 1)) })
}

fn highlight() -> Style {
    Style::default().bg(Color::Blue).fg(Color::White)
}

fn heading(titles: &[&'static str]) -> Row<'static> {
    Row::new(titles.iter().map(|t| Cell::from(*t)))
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
}

fn product_table<'a>(rows: &[ProductRow], title: String) -> Table<'a> {
    let body: Vec<Row> = rows
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.id.to_string()),
                Cell::from(r.name.clone()),
                Cell::from(r.category.clone()),
                Cell::from(r.price.clone()),
                Cell::from(r.tags.clone()),
            ])
        })
        .collect();
    Table::new(
        body,
        [
            Constraint::Length(5),
            Constraint::Percentage(35),
            Constraint::Percentage(20),
            Constraint::Length(14),
            Constraint::Min(10),
        ],
    )
    .header(heading(&["ID", "Name", "Category", "Price", "Tags"]))
    .block(Block::default().borders(Borders::ALL).title(title))
    .row_highlight_style(highlight())
    .column_spacing(1)
}

/// Stands in for a list whose rows could not be read.
fn render_unavailable(f: &mut Frame, title: &str, err: &CatalogError, area: Rect) {
    let message = Paragraph::new(format!("Catalog unavailable: {}", err))
        .style(Style::default().fg(Color::Red))
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(message, area);
}

fn render_products(f: &mut Frame, app: &App, area: Rect) {
    let rows = match app.product_rows() {
        Ok(rows) => rows,
        Err(err) => return render_unavailable(f, "Products", &err, area),
    };
    let mut title = match &app.list_filter {
        Some(filter) => format!("Products in {}", filter.describe()),
        None => "Products".to_string(),
    };
    if !app.search_query.trim().is_empty() {
        title.push_str(&format!(" matching '{}'", app.search_query.trim()));
    }
    let title = format!("{} ({})", title, rows.len());
    let mut state = selection_state(app.selected, rows.len());
    f.render_stateful_widget(product_table(&rows, title), area, &mut state);
}

fn render_categories(f: &mut Frame, app: &App, area: Rect) {
    let rows = match app.category_rows() {
        Ok(rows) => rows,
        Err(err) => return render_unavailable(f, "Categories", &err, area),
    };
    let body: Vec<Row> = rows
        .iter()
        .map(|(category, count)| {
            Row::new(vec![
                Cell::from(category.id.to_string()),
                Cell::from(category.name.clone()),
                Cell::from(count.to_string()),
            ])
        })
        .collect();
    let table = Table::new(
        body,
        [Constraint::Length(5), Constraint::Min(20), Constraint::Length(10)],
    )
    .header(heading(&["ID", "Name", "Products"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Categories ({})", rows.len())),
    )
    .row_highlight_style(highlight())
    .column_spacing(1);
    let mut state = selection_state(app.selected, rows.len());
    f.render_stateful_widget(table, area, &mut state);
}

fn render_tags(f: &mut Frame, app: &App, area: Rect) {
    let rows = match app.tag_rows() {
        Ok(rows) => rows,
        Err(err) => return render_unavailable(f, "Tags", &err, area),
    };
    let body: Vec<Row> = rows
        .iter()
        .map(|(tag, count)| {
            Row::new(vec![
                Cell::from(tag.id.to_string()),
                Cell::from(tag.name.clone()),
                Cell::from(count.to_string()),
            ])
        })
        .collect();
    let table = Table::new(
        body,
        [Constraint::Length(5), Constraint::Min(20), Constraint::Length(10)],
    )
    .header(heading(&["ID", "Name", "Products"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Tags ({})", rows.len())),
    )
    .row_highlight_style(highlight())
    .column_spacing(1);
    let mut state = selection_state(app.selected, rows.len());
    f.render_stateful_widget(table, area, &mut state);
}

fn render_reports(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let sections: Vec<Span> = ReportSection::ALL
        .iter()
        .flat_map(|section| {
            let title = section.title(&app.report_settings);
            let count = app
                .report
                .as_ref()
                .map(|r| r.section(*section).len())
                .unwrap_or(0);
            let style = if *section == app.report_section {
                Style::default().bg(Color::LightBlue).fg(Color::Black)
            } else {
                Style::default().fg(Color::Yellow)
            };
            [Span::styled(format!(" {} ({}) ", title, count), style), Span::raw(" ")]
        })
        .collect();
    f.render_widget(Paragraph::new(Line::from(sections)), chunks[0]);

    let title = app.report_section.title(&app.report_settings);
    let rows = match app.report_rows() {
        Ok(rows) => rows,
        Err(err) => return render_unavailable(f, &title, &err, chunks[1]),
    };
    let mut state = selection_state(app.selected, rows.len());
    f.render_stateful_widget(product_table(&rows, title), chunks[1], &mut state);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let input_text = match app.mode {
        AppMode::Normal => {
            if let Some(ref status) = app.status_message {
                status.clone()
            } else {
                let filename = app.filename.as_deref().unwrap_or("unsaved");
                format!(
                    "File: {} | Tab/1-4: screens | n: new | e: edit | d: delete | Enter: view/open | /: search | Ctrl+S/O/E: save/load/export | F1/?: help | q: quit",
                    filename
                )
            }
        }
        AppMode::Help => "↑↓/jk: scroll | PgUp/PgDn: fast scroll | Home: top | Esc/q: close help".to_string(),
        AppMode::Form => match &app.status_message {
            Some(status) => format!("{} | Tab/↑↓: field | Enter: save | Esc: cancel", status),
            None => "Tab/↑↓: field | Enter: save | Esc: cancel".to_string(),
        },
        AppMode::ConfirmDelete => "y/Enter: delete | n/Esc: keep".to_string(),
        AppMode::ProductView => "e: edit | Esc/Enter: close".to_string(),
        AppMode::Search => format!("Search: {} (Enter to apply, Esc to clear)", app.search_query),
        AppMode::SaveAs => format!("Save as: {} (Enter to save, Esc to cancel)", app.filename_input),
        AppMode::LoadFile => format!("Load file: {} (Enter to load, Esc to cancel)", app.filename_input),
        AppMode::ExportCsv => format!("Export CSV as: {} (Enter to export, Esc to cancel)", app.filename_input),
    };

    let input = Paragraph::new(input_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(match app.mode {
            AppMode::Normal | AppMode::ProductView => Style::default(),
            AppMode::Form | AppMode::Search => Style::default().fg(Color::Green),
            AppMode::Help => Style::default().fg(Color::Cyan),
            AppMode::ConfirmDelete => Style::default().fg(Color::Red),
            AppMode::SaveAs | AppMode::LoadFile => Style::default().fg(Color::Yellow),
            AppMode::ExportCsv => Style::default().fg(Color::Magenta),
        });
    f.render_widget(input, area);
}

/// A rectangle of the given percentages centered in `area`.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_form_popup(f: &mut Frame, form: &FormState) {
    let popup_area = centered_rect(70, 80, f.area());
    f.render_widget(Clear, popup_area);

    let label_width = form
        .fields
        .iter()
        .map(|field| field.label.chars().count())
        .max()
        .unwrap_or(0);

    let mut lines = Vec::new();
    let mut cursor_line = 0;
    for (index, field) in form.fields.iter().enumerate() {
        let focused = index == form.focused;
        if focused {
            cursor_line = lines.len();
        }
        let label_style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:>width$}: ", field.label, width = label_width), label_style),
            Span::raw(field.value.clone()),
        ]));
        for message in form.errors.get(field.key) {
            lines.push(Line::from(Span::styled(
                format!("{:>width$}  {}", "", message, width = label_width),
                Style::default().fg(Color::Red),
            )));
        }
    }

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(form.kind.title())
            .style(Style::default().fg(Color::White)),
    );
    f.render_widget(widget, popup_area);

    let x = popup_area.x + 1 + (label_width + 2 + form.cursor) as u16;
    let y = popup_area.y + 1 + cursor_line as u16;
    if x < popup_area.right().saturating_sub(1) && y < popup_area.bottom().saturating_sub(1) {
        f.set_cursor_position((x, y));
    }
}

fn render_confirm_popup(f: &mut Frame, app: &App) {
    let Some(target) = &app.pending_delete else {
        return;
    };
    let popup_area = centered_rect(60, 20, f.area());
    f.render_widget(Clear, popup_area);
    let widget = Paragraph::new(format!("Delete {}?\n\ny: delete   n: keep", target.describe()))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm delete")
                .style(Style::default().fg(Color::Red)),
        );
    f.render_widget(widget, popup_area);
}

fn render_product_popup(f: &mut Frame, app: &App, item: &ProductWithDetail) {
    let popup_area = centered_rect(70, 70, f.area());
    f.render_widget(Clear, popup_area);

    let product = &item.product;
    let (category, tags) = app
        .service
        .with_catalog(|catalog| {
            let category = catalog
                .category(product.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            let tags = product
                .tag_ids
                .iter()
                .filter_map(|id| catalog.tag(*id).ok())
                .map(|t| t.name.clone())
                .collect::<Vec<_>>()
                .join(", ");
            (category, tags)
        })
        .unwrap_or_default();

    let field = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:>18}: ", label), Style::default().fg(Color::Cyan)),
            Span::raw(value),
        ])
    };

    let mut lines = vec![
        field("Name", product.name.clone()),
        field("Description", product.description.clone()),
        field("Price", product.price.to_string()),
        field("Category", category),
        field("Tags", tags),
        Line::from(""),
    ];
    match &item.detail {
        Some(detail) => {
            lines.push(field("Weight (kg)", detail.weight.to_string()));
            lines.push(field("Dimensions", detail.dimensions.clone()));
            lines.push(field(
                "Manufacture date",
                detail
                    .manufacture_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ));
        }
        None => lines.push(Line::from(Span::styled(
            "No technical details recorded.",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Product {}", product.id))
            .style(Style::default().fg(Color::White)),
    );
    f.render_widget(widget, popup_area);
}

fn render_help_popup(f: &mut Frame, scroll: usize) {
    let area = f.area();
    let popup_area = Rect {
        x: area.width / 10,
        y: area.height / 10,
        width: area.width * 4 / 5,
        height: area.height * 4 / 5,
    };

    f.render_widget(Clear, popup_area);

    let help_text = get_help_text();
    let help_lines: Vec<&str> = help_text.lines().collect();
    let visible_height = popup_area.height.saturating_sub(2) as usize;

    let start_line = scroll.min(help_lines.len().saturating_sub(visible_height));
    let end_line = (start_line + visible_height).min(help_lines.len());

    let visible_text = help_lines[start_line..end_line].join("\n");

    let help_widget = Paragraph::new(visible_text)
        .block(Block::default()
            .borders(Borders::ALL)
            .title(format!("tcatalog Help (Line {}/{})", start_line + 1, help_lines.len()))
            .style(Style::default().fg(Color::Cyan)))
        .style(Style::default().fg(Color::White));

    f.render_widget(help_widget, popup_area);
}

pub fn get_help_text() -> &'static str {
    r#"TCATALOG - TERMINAL PRODUCT CATALOG

=== SCREENS ===
Tab / Shift+Tab Next / previous screen
1 2 3 4         Products, Categories, Tags, Reports
↑↓ or j/k       Move the selection

=== RECORDS ===
n               New record on the current screen
e               Edit the selected record
d / Delete      Delete the selected record (asks for confirmation)
Enter / v       View product with its technical details
Enter           On Categories and Tags, list the products of the
                selected record; Esc on Products shows all again
/               Search products by name or description

Deleting a category also deletes all of its products and their
details. Deleting a tag only removes it from products.

=== PRODUCT FORM ===
The product form holds the product and its technical details.
Both halves are validated before anything is written; if either
has errors nothing is saved.

Price           Up to 10 digits, 2 decimal places
Category        Category name (or id)
Tags            Comma separated tag names (or ids), may be empty
Weight (kg)     Up to 5 digits, 2 decimal places
Dimensions      Free text, e.g. 80x40x90
Manufacture date  YYYY-MM-DD, MM/DD/YYYY or MM/DD/YY; may be empty

Tab / ↓         Next field
Shift+Tab / ↑   Previous field
Enter           Save
Esc             Cancel

=== REPORTS ===
←→ or s         Switch report section
r               Recompute the report
Reports list products priced above the threshold, products
outside the excluded category, and products priced below the
threshold. Thresholds are set with --price-threshold and
--excluded-category.

=== FILE OPERATIONS ===
Ctrl+S          Save catalog to a JSON file
Ctrl+O          Load catalog from a JSON file
Ctrl+E          Export shown products to CSV
                Every edit is also written to the file last loaded
                or saved, unless started with --no-autosave

=== HELP NAVIGATION ===
↑↓ or j/k       Scroll help text up/down one line
Page Up/Down    Scroll help text up/down 5 lines
Home            Jump to top of help text
Esc/F1/?/q      Close this help window

q               Quit application"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CategoryForm;
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &App) -> String {
        let backend = TestBackend::new(120, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| render_ui(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_render_products_screen() {
        let app = App::default();
        let screen = draw(&app);
        assert!(screen.contains("Products (0)"));
        assert!(screen.contains("read-write"));
        assert!(screen.contains("File: unsaved"));
    }

    #[test]
    fn test_render_form_with_errors() {
        let mut app = App::default();
        app.set_screen(Screen::Categories);
        app.start_create();
        app.submit_form();
        let screen = draw(&app);
        assert!(screen.contains("New Category"));
        assert!(screen.contains("This field is required."));
    }

    #[test]
    fn test_render_category_rows() {
        let mut app = App::default();
        app.service
            .create_category(&CategoryForm { name: "Hogar".to_string() })
            .unwrap();
        app.set_screen(Screen::Categories);
        let screen = draw(&app);
        assert!(screen.contains("Categories (1)"));
        assert!(screen.contains("Hogar"));
    }

    #[test]
    fn test_render_help_popup() {
        let mut app = App::default();
        app.mode = AppMode::Help;
        let screen = draw(&app);
        assert!(screen.contains("tcatalog Help"));
    }

    #[test]
    fn test_help_text_covers_file_keys() {
        let help = get_help_text();
        assert!(help.contains("Ctrl+S"));
        assert!(help.contains("Ctrl+O"));
        assert!(help.contains("Ctrl+E"));
    }

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 100, 50);
        let rect = centered_rect(50, 50, area);
        assert_eq!(rect, Rect::new(25, 12, 50, 25));
    }

    #[test]
    fn test_render_filtered_products_title() {
        let mut app = App::default();
        app.service
            .create_category(&CategoryForm { name: "Hogar".to_string() })
            .unwrap();
        app.set_screen(Screen::Categories);
        app.show_selected_products();
        let screen = draw(&app);
        assert!(screen.contains("Products in category 'Hogar' (0)"));
    }

    #[test]
    fn test_render_unreadable_catalog() {
        let app = App::default();
        let store = app.service.store().clone();
        let crashed = std::thread::spawn(move || {
            store.transaction(|_tx| -> crate::domain::CatalogResult<()> { panic!("writer crashed") })
        })
        .join();
        assert!(crashed.is_err());

        let screen = draw(&app);
        assert!(screen.contains("Catalog unavailable"));
    }
}
