use crate::dispatch::{Command, Dispatcher, KeyPress};
use crate::query::{self, FieldCatalog, FieldDescriptor, ParsedQuery, QueryError};

/// Interactive filter input: owns the live query text, the parsed-fields
/// cache, and the suggestion overlay state, and wires its key commands
/// through a [`Dispatcher`].
///
/// A change notification is produced exactly when a parse succeeds and its
/// field set differs structurally from the last one handed out; parse
/// failures keep the previous result intact and never notify.
pub struct FilterBar {
    state: FilterState,
    dispatcher: Dispatcher<FilterState>,
}

/// No suggestion highlighted; submitting runs the parser over the full text.
const NO_HIGHLIGHT: isize = -1;

pub struct FilterState {
    catalog: FieldCatalog,
    placeholder: Option<String>,
    text: String,
    open: bool,
    highlighted: isize,
    error: Option<QueryError>,
    applied: ParsedQuery,
    pending: Vec<ParsedQuery>,
}

impl FilterState {
    fn reparse(&mut self) {
        match query::parse(&self.text, self.catalog.names()) {
            Ok(parsed) => {
                self.error = None;
                if !parsed.same_fields(&self.applied) {
                    self.applied = parsed.clone();
                    self.pending.push(parsed);
                }
            }
            Err(error) => {
                self.error = Some(error);
            }
        }
    }

    fn text_changed(&mut self) {
        self.open = true;
        self.highlighted = NO_HIGHLIGHT;
        self.reparse();
    }

    fn submit(&mut self) {
        if self.highlighted == NO_HIGHLIGHT {
            self.reparse();
            return;
        }

        let Some(field) = self
            .catalog
            .suggestions()
            .get(self.highlighted as usize)
            .map(|descriptor| descriptor.name.clone())
        else {
            return;
        };
        if !self.text.is_empty() && !self.text.ends_with(char::is_whitespace) {
            self.text.push(' ');
        }
        self.text.push_str(&field);
        self.text.push(':');
        self.highlighted = NO_HIGHLIGHT;
    }

    fn jump(&mut self, delta: isize) {
        let last = self.catalog.suggestions().len() as isize - 1;
        self.highlighted = (self.highlighted + delta).clamp(NO_HIGHLIGHT, last.max(NO_HIGHLIGHT));
    }

    fn close(&mut self) {
        self.open = false;
        self.highlighted = NO_HIGHLIGHT;
    }

    fn clear(&mut self) {
        self.text.clear();
        self.error = None;
        self.open = true;
        self.highlighted = NO_HIGHLIGHT;
        self.reparse();
    }
}

impl FilterBar {
    /// Builds a filter bar over an immutable field catalog. `placeholder`
    /// overrides the catalog-derived prompt; `query` seeds the live text and
    /// is parsed immediately without producing a notification.
    pub fn new(catalog: FieldCatalog, placeholder: Option<String>, query: Option<String>) -> Self {
        let text = query.unwrap_or_default();
        let mut state = FilterState {
            catalog,
            placeholder,
            text,
            open: false,
            highlighted: NO_HIGHLIGHT,
            error: None,
            applied: ParsedQuery::default(),
            pending: Vec::new(),
        };
        match query::parse(&state.text, state.catalog.names()) {
            Ok(parsed) => state.applied = parsed,
            Err(error) => state.error = Some(error),
        }

        Self {
            dispatcher: Self::build_dispatcher(),
            state,
        }
    }

    fn build_dispatcher() -> Dispatcher<FilterState> {
        let bindings = [
            ("enter", "submitQuery"),
            ("arrowdown", "jumpToNextSuggestion"),
            ("arrowup", "jumpToPreviousSuggestion"),
            ("escape", "closeSuggestionBox"),
            ("ctrl+u", "clearQuery"),
        ]
        .into_iter()
        .map(|(combo, name)| (combo.to_string(), name.to_string()));

        let commands = [
            (
                "submitQuery".to_string(),
                Command::new(|state: &mut FilterState, _event: &KeyPress| state.submit())
                    .prevent_default(),
            ),
            (
                "jumpToNextSuggestion".to_string(),
                Command::new(|state: &mut FilterState, _event: &KeyPress| state.jump(1))
                    .allowed_when(|state: &FilterState, _event| state.open)
                    .disabled_when(|state: &FilterState| state.catalog.is_empty())
                    .prevent_default(),
            ),
            (
                "jumpToPreviousSuggestion".to_string(),
                Command::new(|state: &mut FilterState, _event: &KeyPress| state.jump(-1))
                    .allowed_when(|state: &FilterState, _event| state.open)
                    .disabled_when(|state: &FilterState| state.catalog.is_empty())
                    .prevent_default(),
            ),
            (
                "closeSuggestionBox".to_string(),
                Command::new(|state: &mut FilterState, _event: &KeyPress| state.close())
                    .allowed_when(|state: &FilterState, _event| state.open)
                    .prevent_default(),
            ),
            (
                "clearQuery".to_string(),
                Command::new(|state: &mut FilterState, _event: &KeyPress| state.clear())
                    .prevent_default(),
            ),
        ];

        Dispatcher::new(bindings, commands)
    }

    /// Focus: subscribe to key events, open the overlay, re-run the parser.
    pub fn attach(&mut self) {
        self.dispatcher.register_listener();
        self.state.open = true;
        self.state.highlighted = NO_HIGHLIGHT;
        self.state.reparse();
    }

    /// Blur: release the subscription and close the overlay. Safe to call
    /// when already detached.
    pub fn detach(&mut self) {
        self.dispatcher.unregister_listener();
        self.state.close();
    }

    pub fn is_attached(&self) -> bool {
        self.dispatcher.is_listening()
    }

    /// Routes a key event through the command dispatcher. Returns true when
    /// a command consumed it; callers fall back to text input for events
    /// whose default action was not suppressed.
    pub fn handle_key(&mut self, event: &mut KeyPress) -> bool {
        self.dispatcher.dispatch(&mut self.state, event)
    }

    pub fn insert_char(&mut self, ch: char) {
        self.state.text.push(ch);
        self.state.text_changed();
    }

    pub fn backspace(&mut self) {
        self.state.text.pop();
        self.state.text_changed();
    }

    /// Explicit clear action: reset text and error, keep focus, re-parse.
    pub fn clear(&mut self) {
        self.state.clear();
    }

    /// Drains change notifications accumulated since the last call.
    pub fn take_changes(&mut self) -> Vec<ParsedQuery> {
        std::mem::take(&mut self.state.pending)
    }

    pub fn text(&self) -> &str {
        &self.state.text
    }

    pub fn error(&self) -> Option<&QueryError> {
        self.state.error.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.state.open
    }

    pub fn highlighted(&self) -> isize {
        self.state.highlighted
    }

    /// Suggestions visible right now: empty while the overlay is closed.
    pub fn suggestions(&self) -> &[FieldDescriptor] {
        if self.state.open {
            self.state.catalog.suggestions()
        } else {
            &[]
        }
    }

    pub fn placeholder(&self) -> String {
        self.state
            .placeholder
            .clone()
            .unwrap_or_else(|| self.state.catalog.placeholder())
    }

    /// Last successfully emitted parse result.
    pub fn applied(&self) -> &ParsedQuery {
        &self.state.applied
    }
}
