use crate::dispatch::{self, Command, Dispatcher, KeyPress};
use crate::filter::FilterBar;
use crate::mesh::{self, MeshSnapshot};
use crate::model::{ResourceTab, RowData, TableData};
use chrono::Local;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Filter,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AppEffect {
    ReloadSnapshot,
}

#[derive(Debug, Clone)]
pub struct DetailOverlay {
    pub title: String,
    pub body: String,
}

pub struct App {
    running: bool,
    mode: InputMode,
    tabs: Vec<ResourceTab>,
    active_tab_index: usize,
    tables: HashMap<ResourceTab, TableData>,
    filters: HashMap<ResourceTab, FilterBar>,
    status: String,
    show_help: bool,
    detail: Option<DetailOverlay>,
    page_size: usize,
    source_label: String,
    effects: Vec<AppEffect>,
}

impl App {
    pub fn new(
        source_label: String,
        snapshot: &MeshSnapshot,
        placeholder: Option<String>,
        initial_query: Option<String>,
        initial_tab: Option<ResourceTab>,
    ) -> Self {
        let tabs = ResourceTab::ALL.to_vec();
        let active_tab_index = initial_tab
            .and_then(|wanted| tabs.iter().position(|tab| *tab == wanted))
            .unwrap_or(0);
        let filters = tabs
            .iter()
            .copied()
            .map(|tab| {
                let query = if Some(tab) == initial_tab.or(Some(tabs[active_tab_index])) {
                    initial_query.clone()
                } else {
                    None
                };
                (
                    tab,
                    FilterBar::new(mesh::catalog_for(tab), placeholder.clone(), query),
                )
            })
            .collect::<HashMap<_, _>>();

        let mut app = Self {
            running: true,
            mode: InputMode::Normal,
            tabs,
            active_tab_index,
            tables: HashMap::new(),
            filters,
            status: "Ready".to_string(),
            show_help: false,
            detail: None,
            page_size: 10,
            source_label,
            effects: Vec::new(),
        };
        app.set_snapshot(snapshot);
        app
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn tabs(&self) -> &[ResourceTab] {
        &self.tabs
    }

    pub fn active_tab(&self) -> ResourceTab {
        self.tabs[self.active_tab_index]
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn detail(&self) -> Option<&DetailOverlay> {
        self.detail.as_ref()
    }

    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
    }

    pub fn table(&self, tab: ResourceTab) -> Option<&TableData> {
        self.tables.get(&tab)
    }

    pub fn filter_bar(&self, tab: ResourceTab) -> Option<&FilterBar> {
        self.filters.get(&tab)
    }

    pub fn set_snapshot(&mut self, snapshot: &MeshSnapshot) {
        for tab in self.tabs.clone() {
            let mut table = mesh::build_table(tab, snapshot);
            let previous = self.tables.get(&tab).map(|old| old.selected).unwrap_or(0);
            table.selected = previous.min(table.rows.len().saturating_sub(1));
            self.tables.insert(tab, table);
        }
    }

    pub fn set_active_table_error(&mut self, error: impl Into<String>) {
        let tab = self.active_tab();
        if let Some(table) = self.tables.get_mut(&tab) {
            table.set_error(error, Local::now());
        }
    }

    pub fn take_effects(&mut self) -> Vec<AppEffect> {
        std::mem::take(&mut self.effects)
    }

    /// Rows of `tab` that pass its last applied filter.
    pub fn visible_rows(&self, tab: ResourceTab) -> Vec<&RowData> {
        let predicates = self
            .filters
            .get(&tab)
            .map(|bar| bar.applied().fields.as_slice())
            .unwrap_or(&[]);
        self.tables
            .get(&tab)
            .map(|table| {
                table
                    .rows
                    .iter()
                    .filter(|row| row.matches(predicates))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn selected_row(&self, tab: ResourceTab) -> Option<&RowData> {
        let selected = self.tables.get(&tab)?.selected;
        self.visible_rows(tab).into_iter().nth(selected)
    }

    /// Routes a key event to the active tab's filter bar; keys no command
    /// consumed fall through to text editing, and an unconsumed Escape blurs
    /// the widget back to normal mode.
    pub fn handle_filter_key(&mut self, event: &mut KeyPress, text: Option<char>) {
        let tab = self.active_tab();
        let mut blurred = false;
        if let Some(bar) = self.filters.get_mut(&tab) {
            let handled = bar.handle_key(event);
            if !handled && !event.default_prevented() {
                match dispatch::normalize_code(&event.code).as_str() {
                    "escape" => {
                        bar.detach();
                        blurred = true;
                    }
                    "backspace" => bar.backspace(),
                    _ => {
                        if let Some(ch) = text {
                            bar.insert_char(ch);
                        }
                    }
                }
            }
        }
        if blurred {
            self.mode = InputMode::Normal;
            self.status = "Filter closed".to_string();
        }
        self.drain_filter_changes();
    }

    /// Applies notifications the active filter bar produced since the last
    /// call: the selection is rehomed and the status line describes the
    /// newly applied predicates.
    pub fn drain_filter_changes(&mut self) {
        let tab = self.active_tab();
        let changes = self
            .filters
            .get_mut(&tab)
            .map(|bar| bar.take_changes())
            .unwrap_or_default();
        let Some(latest) = changes.last() else {
            return;
        };
        debug!(
            "filter change on {}: {:?} -> {} predicates",
            tab.title(),
            latest.query,
            latest.fields.len()
        );

        if let Some(table) = self.tables.get_mut(&tab) {
            table.selected = 0;
        }
        self.status = if latest.fields.is_empty() {
            format!("Filter cleared for {}", tab.title())
        } else {
            let rendered = latest
                .fields
                .iter()
                .map(|pair| format!("{}:{}", pair.field, pair.value))
                .collect::<Vec<_>>()
                .join(" ");
            format!("Filter: {rendered}")
        };
    }

    fn quit(&mut self) {
        self.running = false;
    }

    fn next_tab(&mut self) {
        self.active_tab_index = (self.active_tab_index + 1) % self.tabs.len();
    }

    fn prev_tab(&mut self) {
        self.active_tab_index = (self.active_tab_index + self.tabs.len() - 1) % self.tabs.len();
    }

    fn go_to_tab(&mut self, event: &KeyPress) {
        let code = dispatch::normalize_code(&event.code);
        let Some(number) = code
            .strip_prefix("digit")
            .and_then(|digit| digit.parse::<usize>().ok())
        else {
            return;
        };
        if (1..=self.tabs.len()).contains(&number) {
            self.active_tab_index = number - 1;
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let tab = self.active_tab();
        let visible = self.visible_rows(tab).len();
        let Some(table) = self.tables.get_mut(&tab) else {
            return;
        };
        if visible == 0 {
            table.selected = 0;
            return;
        }
        let next = table.selected as isize + delta;
        table.selected = next.clamp(0, visible as isize - 1) as usize;
    }

    fn select_first(&mut self) {
        let tab = self.active_tab();
        if let Some(table) = self.tables.get_mut(&tab) {
            table.selected = 0;
        }
    }

    fn select_last(&mut self) {
        let tab = self.active_tab();
        let visible = self.visible_rows(tab).len();
        if let Some(table) = self.tables.get_mut(&tab) {
            table.selected = visible.saturating_sub(1);
        }
    }

    fn open_filter(&mut self) {
        let tab = self.active_tab();
        self.mode = InputMode::Filter;
        if let Some(bar) = self.filters.get_mut(&tab) {
            bar.attach();
        }
        self.status = format!("Filtering {}", tab.title());
    }

    fn clear_filter(&mut self) {
        let tab = self.active_tab();
        self.mode = InputMode::Filter;
        if let Some(bar) = self.filters.get_mut(&tab) {
            bar.attach();
            bar.clear();
        }
    }

    fn show_details(&mut self) {
        let tab = self.active_tab();
        let Some(row) = self.selected_row(tab) else {
            self.status = "Nothing selected".to_string();
            return;
        };
        let name = match &row.mesh {
            Some(mesh) => format!("{mesh}/{}", row.name),
            None => row.name.clone(),
        };
        self.detail = Some(DetailOverlay {
            title: format!("{} {name}", tab.title()),
            body: row.detail.clone(),
        });
    }

    fn close_overlay(&mut self) {
        if self.detail.take().is_some() {
            self.status = "Closed details".to_string();
        } else if self.show_help {
            self.show_help = false;
        }
    }

    fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    fn refresh(&mut self) {
        self.effects.push(AppEffect::ReloadSnapshot);
        self.status = format!("Reloading {}", self.source_label);
    }
}

/// Command names the normal-mode binding table may reference; config-file
/// hotkeys naming anything else are skipped.
pub const NORMAL_COMMANDS: [&str; 16] = [
    "quit",
    "nextTab",
    "prevTab",
    "goToTab",
    "selectNext",
    "selectPrev",
    "pageDown",
    "pageUp",
    "selectFirst",
    "selectLast",
    "openFilter",
    "clearFilter",
    "showDetails",
    "closeOverlay",
    "toggleHelp",
    "refresh",
];

pub fn is_known_command(name: &str) -> bool {
    NORMAL_COMMANDS.contains(&name)
}

/// Builds the normal-mode key dispatcher: the built-in bindings plus any
/// config-supplied extras (already normalized to combo form).
pub fn normal_dispatcher(extra_bindings: &[(String, String)]) -> Dispatcher<App> {
    let mut bindings = vec![
        ("q", "quit"),
        ("ctrl+c", "quit"),
        ("arrowright", "nextTab"),
        ("tab", "nextTab"),
        ("arrowleft", "prevTab"),
        ("shift+tab", "prevTab"),
        ("digit1", "goToTab"),
        ("digit2", "goToTab"),
        ("digit3", "goToTab"),
        ("digit4", "goToTab"),
        ("digit5", "goToTab"),
        ("arrowdown", "selectNext"),
        ("j", "selectNext"),
        ("arrowup", "selectPrev"),
        ("k", "selectPrev"),
        ("pagedown", "pageDown"),
        ("ctrl+d", "pageDown"),
        ("pageup", "pageUp"),
        ("ctrl+u", "pageUp"),
        ("home", "selectFirst"),
        ("end", "selectLast"),
        ("slash", "openFilter"),
        ("c", "clearFilter"),
        ("enter", "showDetails"),
        ("d", "showDetails"),
        ("escape", "closeOverlay"),
        ("shift+slash", "toggleHelp"),
        ("r", "refresh"),
        ("f5", "refresh"),
    ]
    .into_iter()
    .map(|(combo, name)| (combo.to_string(), name.to_string()))
    .collect::<Vec<_>>();
    bindings.extend(extra_bindings.iter().cloned());

    let commands = [
        command("quit", |app: &mut App, _event: &KeyPress| app.quit()),
        command("nextTab", |app: &mut App, _event: &KeyPress| app.next_tab()),
        command("prevTab", |app: &mut App, _event: &KeyPress| app.prev_tab()),
        (
            "goToTab".to_string(),
            Command::new(|app: &mut App, event: &KeyPress| app.go_to_tab(event)),
        ),
        command("selectNext", |app: &mut App, _event: &KeyPress| {
            app.move_selection(1)
        }),
        command("selectPrev", |app: &mut App, _event: &KeyPress| {
            app.move_selection(-1)
        }),
        command("pageDown", |app: &mut App, _event: &KeyPress| {
            app.move_selection(app.page_size as isize)
        }),
        command("pageUp", |app: &mut App, _event: &KeyPress| {
            app.move_selection(-(app.page_size as isize))
        }),
        command("selectFirst", |app: &mut App, _event: &KeyPress| {
            app.select_first()
        }),
        command("selectLast", |app: &mut App, _event: &KeyPress| {
            app.select_last()
        }),
        command("openFilter", |app: &mut App, _event: &KeyPress| {
            app.open_filter()
        }),
        command("clearFilter", |app: &mut App, _event: &KeyPress| {
            app.clear_filter()
        }),
        (
            "showDetails".to_string(),
            Command::new(|app: &mut App, _event: &KeyPress| app.show_details())
                .disabled_when(|app: &App| app.visible_rows(app.active_tab()).is_empty()),
        ),
        command("closeOverlay", |app: &mut App, _event: &KeyPress| {
            app.close_overlay()
        }),
        command("toggleHelp", |app: &mut App, _event: &KeyPress| {
            app.toggle_help()
        }),
        command("refresh", |app: &mut App, _event: &KeyPress| app.refresh()),
    ];

    Dispatcher::new(bindings, commands)
}

fn command(
    name: &str,
    trigger: impl Fn(&mut App, &KeyPress) + 'static,
) -> (String, Command<App>) {
    (name.to_string(), Command::new(trigger))
}

#[cfg(test)]
mod tests {
    use super::{App, AppEffect, InputMode, is_known_command, normal_dispatcher};
    use crate::dispatch::KeyPress;
    use crate::mesh::sample_snapshot;
    use crate::model::ResourceTab;

    fn app() -> App {
        let snapshot = sample_snapshot().expect("sample parses");
        App::new("sample data".to_string(), &snapshot, None, None, None)
    }

    fn dispatch(app: &mut App, event: &mut KeyPress) {
        let dispatcher = {
            let mut dispatcher = normal_dispatcher(&[]);
            dispatcher.register_listener();
            dispatcher
        };
        dispatcher.dispatch(app, event);
        app.drain_filter_changes();
    }

    fn type_filter(app: &mut App, text: &str) {
        for ch in text.chars() {
            let mut event = KeyPress::plain("");
            app.handle_filter_key(&mut event, Some(ch));
        }
    }

    #[test]
    fn q_quits() {
        let mut app = app();
        dispatch(&mut app, &mut KeyPress::plain("KeyQ"));
        assert!(!app.running());
    }

    #[test]
    fn digits_switch_tabs() {
        let mut app = app();
        dispatch(&mut app, &mut KeyPress::plain("Digit3"));
        assert_eq!(app.active_tab(), ResourceTab::Dataplanes);

        dispatch(&mut app, &mut KeyPress::plain("Digit9"));
        assert_eq!(app.active_tab(), ResourceTab::Dataplanes, "out of range is ignored");
    }

    #[test]
    fn tab_cycling_wraps() {
        let mut app = app();
        dispatch(&mut app, &mut KeyPress::plain("ArrowLeft"));
        assert_eq!(app.active_tab(), ResourceTab::Policies);
        dispatch(&mut app, &mut KeyPress::plain("ArrowRight"));
        assert_eq!(app.active_tab(), ResourceTab::Meshes);
    }

    #[test]
    fn slash_enters_filter_mode_and_typing_narrows_rows() {
        let mut app = app();
        dispatch(&mut app, &mut KeyPress::plain("Digit3"));
        assert_eq!(app.visible_rows(ResourceTab::Dataplanes).len(), 4);

        dispatch(&mut app, &mut KeyPress::plain("Slash"));
        assert_eq!(app.mode(), InputMode::Filter);

        type_filter(&mut app, "zone: east");
        let visible = app.visible_rows(ResourceTab::Dataplanes);
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|row| row
            .attributes
            .iter()
            .any(|(field, value)| field == "zone" && value == "east")));
        assert!(app.status().starts_with("Filter:"));
    }

    #[test]
    fn parse_errors_keep_the_previous_filter() {
        let mut app = app();
        dispatch(&mut app, &mut KeyPress::plain("Digit3"));
        dispatch(&mut app, &mut KeyPress::plain("Slash"));
        type_filter(&mut app, "zone: east");
        assert_eq!(app.visible_rows(ResourceTab::Dataplanes).len(), 2);

        type_filter(&mut app, " color: red");
        let bar = app.filter_bar(ResourceTab::Dataplanes).expect("bar exists");
        assert!(bar.error().is_some());
        assert_eq!(
            app.visible_rows(ResourceTab::Dataplanes).len(),
            2,
            "rows stay filtered by the last valid query"
        );
    }

    #[test]
    fn escape_blurs_filter_mode_after_closing_the_overlay() {
        let mut app = app();
        dispatch(&mut app, &mut KeyPress::plain("Slash"));
        assert_eq!(app.mode(), InputMode::Filter);

        // first escape closes the suggestion overlay, second blurs
        let mut event = KeyPress::plain("Escape");
        app.handle_filter_key(&mut event, None);
        assert_eq!(app.mode(), InputMode::Filter);

        let mut event = KeyPress::plain("Escape");
        app.handle_filter_key(&mut event, None);
        assert_eq!(app.mode(), InputMode::Normal);
    }

    #[test]
    fn clear_filter_resets_predicates_and_refocuses() {
        let mut app = app();
        dispatch(&mut app, &mut KeyPress::plain("Digit3"));
        dispatch(&mut app, &mut KeyPress::plain("Slash"));
        type_filter(&mut app, "zone: east");

        let mut event = KeyPress::plain("Escape");
        app.handle_filter_key(&mut event, None);
        let mut event = KeyPress::plain("Escape");
        app.handle_filter_key(&mut event, None);
        assert_eq!(app.mode(), InputMode::Normal);

        dispatch(&mut app, &mut KeyPress::plain("KeyC"));
        assert_eq!(app.mode(), InputMode::Filter);
        assert_eq!(app.visible_rows(ResourceTab::Dataplanes).len(), 4);
        let bar = app.filter_bar(ResourceTab::Dataplanes).expect("bar exists");
        assert_eq!(bar.text(), "");
    }

    #[test]
    fn selection_clamps_to_visible_rows() {
        let mut app = app();
        dispatch(&mut app, &mut KeyPress::plain("Digit3"));
        for _ in 0..10 {
            dispatch(&mut app, &mut KeyPress::plain("ArrowDown"));
        }
        let table = app.table(ResourceTab::Dataplanes).expect("table exists");
        assert_eq!(table.selected, 3);

        dispatch(&mut app, &mut KeyPress::plain("Home"));
        let table = app.table(ResourceTab::Dataplanes).expect("table exists");
        assert_eq!(table.selected, 0);
    }

    #[test]
    fn details_open_for_the_selected_row() {
        let mut app = app();
        dispatch(&mut app, &mut KeyPress::plain("Enter"));
        let detail = app.detail().expect("detail overlay open");
        assert!(detail.title.starts_with("Meshes"));

        dispatch(&mut app, &mut KeyPress::plain("Escape"));
        assert!(app.detail().is_none());
    }

    #[test]
    fn refresh_queues_a_reload_effect() {
        let mut app = app();
        dispatch(&mut app, &mut KeyPress::plain("KeyR"));
        assert_eq!(app.take_effects(), vec![AppEffect::ReloadSnapshot]);
        assert!(app.take_effects().is_empty());
    }

    #[test]
    fn initial_query_filters_from_construction() {
        let snapshot = sample_snapshot().expect("sample parses");
        let app = App::new(
            "sample data".to_string(),
            &snapshot,
            None,
            Some("status: online".to_string()),
            Some(ResourceTab::Dataplanes),
        );
        assert_eq!(app.active_tab(), ResourceTab::Dataplanes);
        assert_eq!(app.visible_rows(ResourceTab::Dataplanes).len(), 3);
    }

    #[test]
    fn config_command_names_are_validated() {
        assert!(is_known_command("refresh"));
        assert!(is_known_command("openFilter"));
        assert!(!is_known_command("launchMissiles"));
    }
}
