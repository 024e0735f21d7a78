//! Interactive proxy table

use crate::proxy::export;
use crate::proxy::facets::quick_filters;
use crate::proxy::fetcher::FetcherConfig;
use crate::proxy::models::{FilterCriteria, Page, SortKey};
use crate::proxy::paginate::step_page_size;
use crate::proxy::selection::Selection;
use crate::proxy::store::RecordStore;
use crate::state::{ClientState, StateStore, Theme};
use crate::{refetch, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use tokio::time::Duration;

/// Companies longer than this are cut in the table
const MAX_COMPANY_WIDTH: usize = 35;

const HELP_TEXT: &str = "/ search  s sort  c/o/m country/port/company  r reset  ←/→ page  +/- size  \
1-9,0 quick filter  space select  a all  f fav  F fav selected  v favorites  y copy  e export  \
S/L save/load  R reload  t theme  q quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    Favorites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FacetField {
    Country,
    Port,
    Company,
}

struct Palette {
    text: Color,
    accent: Color,
    favorite: Color,
    selected_bg: Color,
    ok: Color,
    warn: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                text: Color::White,
                accent: Color::Cyan,
                favorite: Color::Yellow,
                selected_bg: Color::DarkGray,
                ok: Color::Green,
                warn: Color::Yellow,
            },
            Theme::Light => Self {
                text: Color::Black,
                accent: Color::Blue,
                favorite: Color::Magenta,
                selected_bg: Color::Gray,
                ok: Color::Green,
                warn: Color::Red,
            },
        }
    }
}

/// Next facet value after `current`, wrapping to "no constraint" past the end
fn next_facet_value(values: &[String], current: Option<&str>) -> Option<String> {
    match current.map(|c| values.iter().position(|v| v == c)) {
        Some(Some(pos)) => values.get(pos + 1).cloned(),
        // Unset, or a value that vanished after a reload
        _ => values.first().cloned(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// Proxy table TUI application state
pub struct ProxyBoardApp {
    /// Loaded records and the active view
    store: RecordStore,
    /// Favorites, history, saved filter, theme
    state: ClientState,
    state_store: StateStore,
    /// Checked rows by global index
    selection: Selection,
    /// Cursor within the current page
    table_state: TableState,
    mode: InputMode,
    search_input: String,
    /// Position in search history while recalling with Up/Down
    history_cursor: Option<usize>,
    export_path: PathBuf,
    /// Text of the last copy action, printed after exit
    last_copied: Option<String>,
    /// Where `R` fetches the feed from
    fetcher: Option<FetcherConfig>,
    reload_requested: bool,
    status_message: String,
    should_quit: bool,
}

impl ProxyBoardApp {
    /// Create a board over an already loaded store
    pub fn new(store: RecordStore, state_store: StateStore, export_path: PathBuf) -> Self {
        let state = state_store.load();
        let mut table_state = TableState::default();
        table_state.select(Some(0));

        let stats = store.stats();
        Self {
            store,
            state,
            state_store,
            selection: Selection::new(),
            table_state,
            mode: InputMode::Normal,
            search_input: String::new(),
            history_cursor: None,
            export_path,
            last_copied: None,
            fetcher: None,
            reload_requested: false,
            status_message: format!("Loaded {} proxies. Press '?' for keys, 'q' to quit.", stats.total),
            should_quit: false,
        }
    }

    /// Enable reloading the feed with `R`
    pub fn with_fetcher(mut self, fetcher: FetcherConfig) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Text copied during the session, if any
    pub fn last_copied(&self) -> Option<&str> {
        self.last_copied.as_deref()
    }

    /// Run the TUI application
    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.run_app(&mut terminal).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    async fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|f| self.ui(f))?;

            if self.reload_requested {
                self.reload().await;
                continue;
            }

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_input(key.code);
                    }
                }
            }
        }

        Ok(())
    }

    /// Fetch the feed again; a failed fetch keeps the current list
    pub async fn reload(&mut self) {
        self.reload_requested = false;
        let Some(fetcher) = self.fetcher.clone() else {
            self.status_message = "No feed source to reload from".to_string();
            return;
        };

        match refetch(&mut self.store, &fetcher).await {
            Ok((report, outcome)) => {
                self.selection.clear();
                self.reset_cursor();
                self.status_message = format!(
                    "Reloaded {} proxies from {} ({} lines rejected)",
                    report.records.len(),
                    outcome.source,
                    report.failures
                );
            }
            Err(e) if e.is_bad_data() => {
                log::warn!("Reloaded feed is unusable: {}", e);
                self.status_message = format!("Feed has no usable proxies, keeping current list: {}", e);
            }
            Err(e) => {
                log::warn!("Reload failed: {}", e);
                self.status_message = format!("Reload failed, press R to retry: {}", e);
            }
        }
    }

    fn current_page(&self) -> Page {
        self.store.current_page()
    }

    /// Global index of the row under the cursor
    fn cursor_index(&self) -> Option<usize> {
        let page = self.current_page();
        let row = self.table_state.selected()?;
        page.items.get(row).map(|item| item.index)
    }

    fn reset_cursor(&mut self) {
        self.table_state.select(Some(0));
    }

    /// Requery with new criteria; selection indices no longer apply
    fn apply(&mut self, criteria: FilterCriteria, sort: SortKey) {
        self.store.apply(criteria, sort);
        self.selection.clear();
        self.reset_cursor();
        let stats = self.store.stats();
        self.status_message = format!("{} of {} proxies match", stats.filtered, stats.total);
    }

    /// Save client state; on failure the status shows the error
    fn persist(&mut self) -> bool {
        match self.state_store.save(&self.state) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to save state: {}", e);
                self.status_message = format!("Failed to save state: {}", e);
                false
            }
        }
    }

    fn handle_input(&mut self, key: KeyCode) {
        match self.mode {
            InputMode::Normal => self.handle_normal(key),
            InputMode::Search => self.handle_search(key),
            InputMode::Favorites => {
                if matches!(key, KeyCode::Esc | KeyCode::Char('v') | KeyCode::Char('q')) {
                    self.mode = InputMode::Normal;
                }
            }
        }
    }

    fn handle_normal(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('?') => {
                self.status_message = HELP_TEXT.to_string();
            }
            KeyCode::Char('/') => {
                self.search_input = self.store.criteria().search_text.clone().unwrap_or_default();
                self.history_cursor = None;
                self.mode = InputMode::Search;
            }
            KeyCode::Char('s') => {
                let sort = self.store.sort().next();
                self.apply(self.store.criteria().clone(), sort);
                self.status_message = format!("Sort: {}", sort);
            }
            KeyCode::Char('c') => self.cycle_facet(FacetField::Country),
            KeyCode::Char('o') => self.cycle_facet(FacetField::Port),
            KeyCode::Char('m') => self.cycle_facet(FacetField::Company),
            KeyCode::Char('r') => {
                self.apply(FilterCriteria::default(), SortKey::Default);
                self.status_message = "Filters reset".to_string();
            }
            KeyCode::Right | KeyCode::PageDown => {
                self.store.next_page();
                self.reset_cursor();
            }
            KeyCode::Left | KeyCode::PageUp => {
                self.store.prev_page();
                self.reset_cursor();
            }
            KeyCode::Home => {
                self.store.first_page();
                self.reset_cursor();
            }
            KeyCode::End => {
                self.store.last_page();
                self.reset_cursor();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.change_page_size(true),
            KeyCode::Char('-') => self.change_page_size(false),
            KeyCode::Down => self.move_cursor(true),
            KeyCode::Up => self.move_cursor(false),
            KeyCode::Char(' ') => {
                if let Some(index) = self.cursor_index() {
                    self.selection.toggle(index);
                }
            }
            KeyCode::Char('a') => {
                self.selection.select_all(self.store.active().len());
                self.status_message = format!("Selected all {} proxies", self.selection.len());
            }
            KeyCode::Char('p') => {
                let page = self.current_page();
                self.selection.select_page(&page);
                self.status_message = format!("{} proxies selected", self.selection.len());
            }
            KeyCode::Char('x') => {
                self.selection.clear();
                self.status_message = "Selection cleared".to_string();
            }
            KeyCode::Char('f') => self.toggle_favorite_at_cursor(),
            KeyCode::Char('F') => self.favorite_selected(),
            KeyCode::Char('v') => {
                if self.state.favorites.is_empty() {
                    self.status_message = "No favorites yet".to_string();
                } else {
                    self.mode = InputMode::Favorites;
                }
            }
            KeyCode::Char('y') => self.copy_selected(),
            KeyCode::Char('e') => self.export_active(),
            KeyCode::Char('S') => {
                self.state
                    .save_filter(self.store.criteria().clone(), self.store.sort());
                if self.persist() {
                    self.status_message = "Filter saved".to_string();
                }
            }
            KeyCode::Char('L') => match self.state.saved_filter.clone() {
                Some(saved) => {
                    self.apply(saved.criteria, saved.sort);
                    self.status_message = "Saved filter loaded".to_string();
                }
                None => self.status_message = "No saved filter".to_string(),
            },
            KeyCode::Char('t') => {
                let theme = self.state.toggle_theme();
                if self.persist() {
                    self.status_message = format!("Theme: {:?}", theme);
                }
            }
            KeyCode::Char('R') => {
                if self.fetcher.is_some() {
                    self.reload_requested = true;
                    self.status_message = "Reloading...".to_string();
                } else {
                    self.status_message = "No feed source to reload from".to_string();
                }
            }
            KeyCode::Char(c @ '0'..='9') => {
                // 1 to 9 then 0 for the tenth
                let slot = c.to_digit(10).map_or(0, |d| (d as usize + 9) % 10);
                self.apply_quick_filter(slot);
            }
            _ => {}
        }
    }

    fn handle_search(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.mode = InputMode::Normal;
                self.status_message = "Search cancelled".to_string();
            }
            KeyCode::Enter => {
                let term = self.search_input.trim().to_string();
                let criteria = FilterCriteria {
                    search_text: (!term.is_empty()).then(|| term.clone()),
                    ..self.store.criteria().clone()
                };
                self.mode = InputMode::Normal;
                self.apply(criteria, self.store.sort());
                if self.state.record_search(&term) {
                    self.persist();
                }
            }
            KeyCode::Backspace => {
                self.search_input.pop();
            }
            KeyCode::Up => self.recall_history(true),
            KeyCode::Down => self.recall_history(false),
            KeyCode::Char(c) => {
                self.search_input.push(c);
            }
            _ => {}
        }
    }

    fn recall_history(&mut self, older: bool) {
        let history = &self.state.search_history;
        if history.is_empty() {
            return;
        }

        let cursor = match (self.history_cursor, older) {
            (None, true) => 0,
            (None, false) => return,
            (Some(i), true) => (i + 1).min(history.len() - 1),
            (Some(0), false) => {
                self.history_cursor = None;
                self.search_input.clear();
                return;
            }
            (Some(i), false) => i - 1,
        };

        self.history_cursor = Some(cursor);
        self.search_input = history[cursor].clone();
    }

    fn cycle_facet(&mut self, field: FacetField) {
        let facets = self.store.facets();
        let mut criteria = self.store.criteria().clone();

        let (values, slot, label) = match field {
            FacetField::Country => (&facets.countries, &mut criteria.country, "Country"),
            FacetField::Port => (&facets.ports, &mut criteria.port, "Port"),
            FacetField::Company => (&facets.companies, &mut criteria.company, "Company"),
        };
        *slot = next_facet_value(values, slot.as_deref());
        let shown = slot.clone().unwrap_or_else(|| "all".to_string());

        self.apply(criteria, self.store.sort());
        self.status_message = format!(
            "{}: {} ({} matches)",
            label,
            shown,
            self.store.active().len()
        );
    }

    fn apply_quick_filter(&mut self, slot: usize) {
        let Some(quick) = quick_filters(self.store.facets()).get(slot).copied() else {
            self.status_message = format!("No quick filter on key {}", (slot + 1) % 10);
            return;
        };

        let was_active = quick.is_active(self.store.criteria());
        let criteria = quick.toggle(self.store.criteria());
        self.apply(criteria, self.store.sort());
        self.status_message = if was_active {
            format!("Quick filter {} cleared", quick)
        } else {
            format!("Quick filter {} ({} matches)", quick, self.store.active().len())
        };
    }

    fn change_page_size(&mut self, larger: bool) {
        let size = step_page_size(self.store.page_size(), larger);
        self.store.set_page_size(size);
        self.reset_cursor();
        self.status_message = format!("{} rows per page", size);
    }

    fn move_cursor(&mut self, down: bool) {
        let len = self.current_page().items.len();
        if len == 0 {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if down => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    fn toggle_favorite_at_cursor(&mut self) {
        let Some(index) = self.cursor_index() else {
            return;
        };
        let key = self.store.active()[index].favorite_key();
        let added = self.state.toggle_favorite(&key);
        if !self.persist() {
            return;
        }
        self.status_message = if added {
            format!("Added {} to favorites", key)
        } else {
            format!("Removed {} from favorites", key)
        };
    }

    fn favorite_selected(&mut self) {
        if self.selection.is_empty() {
            self.status_message = "Select proxies first".to_string();
            return;
        }
        let records = self.selection.records(self.store.active());
        let added = self.state.add_favorites(&records);
        if added == 0 {
            self.status_message = "Already in favorites".to_string();
        } else if self.persist() {
            self.status_message = format!("Added {} proxies to favorites", added);
        }
    }

    fn copy_selected(&mut self) {
        if self.selection.is_empty() {
            self.status_message = "Select proxies first".to_string();
            return;
        }
        let text = self.selection.copy_text(self.store.active());
        self.status_message = format!("Copied {} proxies (printed on exit)", self.selection.len());
        self.last_copied = Some(text);
    }

    fn export_active(&mut self) {
        let records = self.store.active();
        if records.is_empty() {
            self.status_message = "Nothing to export".to_string();
            return;
        }
        self.status_message = match export::save_csv(records, &self.export_path) {
            Ok(()) => format!(
                "Exported {} proxies to {}",
                records.len(),
                self.export_path.display()
            ),
            Err(e) => format!("Export failed: {}", e),
        };
    }

    fn ui(&mut self, f: &mut Frame) {
        let palette = Palette::for_theme(self.state.theme);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3), // Title and stats
                Constraint::Length(4), // Filters and quick filters
                Constraint::Min(0),    // Table
                Constraint::Length(3), // Status bar
            ])
            .split(f.size());

        self.render_title(f, chunks[0], &palette);
        self.render_filters(f, chunks[1], &palette);
        self.render_table(f, chunks[2], &palette);

        let status = Paragraph::new(self.status_message.clone())
            .style(Style::default().fg(palette.ok))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Status"));
        f.render_widget(status, chunks[3]);

        if self.mode == InputMode::Favorites {
            self.render_favorites(f, &palette);
        }
    }

    fn render_title(&self, f: &mut Frame, area: Rect, palette: &Palette) {
        let stats = self.store.stats();
        let updated = self
            .store
            .loaded_at()
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "-".to_string());

        let text = format!(
            "Proxy IP List | total {} | shown {} | countries {} | ports {} | favorites {} | updated {}",
            stats.total,
            stats.filtered,
            stats.countries,
            stats.ports,
            self.state.favorites.len(),
            updated
        );
        let title = Paragraph::new(text)
            .style(Style::default().fg(palette.accent))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(title, area);
    }

    fn render_filters(&self, f: &mut Frame, area: Rect, palette: &Palette) {
        let criteria = self.store.criteria();
        let show = |v: Option<&str>| v.unwrap_or("all").to_string();

        let line = if self.mode == InputMode::Search {
            Line::from(vec![
                Span::styled("Search: ", Style::default().fg(palette.accent)),
                Span::styled(
                    format!("{}_", self.search_input),
                    Style::default().fg(palette.text).add_modifier(Modifier::BOLD),
                ),
                Span::raw("  (Enter apply, Esc cancel, ↑/↓ history)"),
            ])
        } else {
            Line::from(vec![
                Span::styled("Search: ", Style::default().fg(palette.accent)),
                Span::raw(criteria.search_text.clone().unwrap_or_default()),
                Span::styled("  Country: ", Style::default().fg(palette.accent)),
                Span::raw(show(criteria.country_value())),
                Span::styled("  Port: ", Style::default().fg(palette.accent)),
                Span::raw(show(criteria.port_value())),
                Span::styled("  Company: ", Style::default().fg(palette.accent)),
                Span::raw(truncate(&show(criteria.company_value()), 24)),
                Span::styled("  Sort: ", Style::default().fg(palette.accent)),
                Span::raw(self.store.sort().to_string()),
                Span::styled("  Rows: ", Style::default().fg(palette.accent)),
                Span::raw(self.store.page_size().to_string()),
            ])
        };

        let mut quick = vec![Span::styled("Quick: ", Style::default().fg(palette.accent))];
        for (i, filter) in quick_filters(self.store.facets()).iter().enumerate().take(10) {
            let style = if filter.is_active(criteria) {
                Style::default()
                    .fg(palette.favorite)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.text)
            };
            quick.push(Span::raw(format!("{} ", (i + 1) % 10)));
            quick.push(Span::styled(format!("{}  ", filter), style));
        }

        let filters = Paragraph::new(vec![line, Line::from(quick)])
            .style(Style::default().fg(palette.text))
            .block(Block::default().borders(Borders::ALL).title("Filters"));
        f.render_widget(filters, area);
    }

    fn render_table(&mut self, f: &mut Frame, area: Rect, palette: &Palette) {
        let page = self.current_page();

        if page.is_empty() {
            let empty = Paragraph::new("No matching proxies. Press 'r' to reset filters.")
                .style(Style::default().fg(palette.warn))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Proxies"));
            f.render_widget(empty, area);
            return;
        }

        let rows: Vec<Row> = page
            .items
            .iter()
            .map(|item| {
                let record = &item.record;
                let checked = if self.selection.contains(item.index) { "[x]" } else { "[ ]" };
                let favorite = self.state.is_favorite(&record.favorite_key());
                Row::new(vec![
                    Cell::from(checked),
                    Cell::from(if favorite { "★" } else { "☆" })
                        .style(Style::default().fg(palette.favorite)),
                    Cell::from(record.ip.clone()),
                    Cell::from(record.port.clone()),
                    Cell::from(record.country_label().to_string()),
                    Cell::from(truncate(&record.company, MAX_COMPANY_WIDTH)),
                ])
                .style(Style::default().fg(palette.text))
            })
            .collect();

        let header = Row::new(vec!["", "", "IP", "Port", "Country", "Company"]).style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        );

        let (start, end) = page.range().unwrap_or((0, 0));
        let title = format!(
            "Proxies | page {}/{} | {}-{} of {} | {} selected",
            page.page_number,
            page.total_pages,
            start,
            end,
            page.total_items,
            self.selection.len()
        );

        let widths = [
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Length(40),
            Constraint::Length(7),
            Constraint::Length(14),
            Constraint::Min(10),
        ];
        let table = Table::new(rows)
            .header(header)
            .widths(&widths)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(palette.selected_bg))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_favorites(&self, f: &mut Frame, palette: &Palette) {
        let area = centered_rect(60, 60, f.size());
        let favorites = self.state.favorite_records(self.store.all());

        let items: Vec<ListItem> = if favorites.is_empty() {
            vec![ListItem::new("Favorites are not in the current list")]
        } else {
            favorites
                .iter()
                .map(|r| {
                    ListItem::new(format!("{}  {} · {}", r, r.country_label(), r.company))
                        .style(Style::default().fg(palette.text))
                })
                .collect()
        };

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Favorites ({}) - Esc to close", self.state.favorites.len()))
                .border_style(Style::default().fg(palette.favorite)),
        );
        f.render_widget(Clear, area);
        f.render_widget(list, area);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
