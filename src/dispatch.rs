use std::collections::HashMap;

/// A physical key event as seen by the dispatcher: the raw key code plus
/// modifier flags, and a flag recording whether a command suppressed the
/// event's default handling (for example text insertion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub code: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    default_prevented: bool,
}

impl KeyPress {
    pub fn new(code: impl Into<String>, ctrl: bool, shift: bool, alt: bool) -> Self {
        Self {
            code: code.into(),
            ctrl,
            shift,
            alt,
            default_prevented: false,
        }
    }

    pub fn plain(code: impl Into<String>) -> Self {
        Self::new(code, false, false, false)
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Canonical lookup key for the binding table: present modifiers in the
    /// fixed order ctrl, shift, alt, then the normalized key code, joined
    /// with `+`. An unmodified key contributes only its code.
    pub fn combo(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("ctrl".to_string());
        }
        if self.shift {
            parts.push("shift".to_string());
        }
        if self.alt {
            parts.push("alt".to_string());
        }
        parts.push(normalize_code(&self.code));
        parts.join("+")
    }
}

/// Strips pure-modifier codes to the empty string, drops the `Key` prefix
/// from alphabetic codes and lower-cases the remainder: `KeyA` becomes `a`,
/// `ArrowDown` becomes `arrowdown`, `ShiftLeft` becomes ``.
pub fn normalize_code(code: &str) -> String {
    match code {
        "ControlLeft" | "ControlRight" | "ShiftLeft" | "ShiftRight" | "AltLeft" => String::new(),
        _ => {
            let stripped = code
                .strip_prefix("Key")
                .filter(|rest| !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_alphabetic()))
                .unwrap_or(code);
            stripped.to_ascii_lowercase()
        }
    }
}

/// A named behavior invocable only through key-combo resolution. The trigger
/// receives an explicit handle to the controller state it mutates; the
/// optional predicates gate applicability and enablement against that same
/// state.
pub struct Command<C> {
    trigger: Box<dyn Fn(&mut C, &KeyPress)>,
    is_allowed_context: Option<Box<dyn Fn(&C, &KeyPress) -> bool>>,
    should_prevent_default: bool,
    is_disabled: Option<Box<dyn Fn(&C) -> bool>>,
}

impl<C> Command<C> {
    pub fn new(trigger: impl Fn(&mut C, &KeyPress) + 'static) -> Self {
        Self {
            trigger: Box::new(trigger),
            is_allowed_context: None,
            should_prevent_default: false,
            is_disabled: None,
        }
    }

    pub fn allowed_when(mut self, predicate: impl Fn(&C, &KeyPress) -> bool + 'static) -> Self {
        self.is_allowed_context = Some(Box::new(predicate));
        self
    }

    pub fn prevent_default(mut self) -> Self {
        self.should_prevent_default = true;
        self
    }

    pub fn disabled_when(mut self, predicate: impl Fn(&C) -> bool + 'static) -> Self {
        self.is_disabled = Some(Box::new(predicate));
        self
    }
}

/// Resolves key events to commands through two tables built once at
/// construction: combo string to command name, command name to command.
/// Binding keys are case-insensitive and stored lower-cased. Dispatch holds
/// no other state, so the same event against the same tables always
/// resolves the same way.
pub struct Dispatcher<C> {
    bindings: HashMap<String, String>,
    commands: HashMap<String, Command<C>>,
    listening: bool,
}

impl<C> Dispatcher<C> {
    pub fn new(
        bindings: impl IntoIterator<Item = (String, String)>,
        commands: impl IntoIterator<Item = (String, Command<C>)>,
    ) -> Self {
        Self {
            bindings: bindings
                .into_iter()
                .map(|(combo, name)| (combo.to_ascii_lowercase(), name))
                .collect(),
            commands: commands.into_iter().collect(),
            listening: false,
        }
    }

    /// Subscribes to the input-event source. Called once when the owning
    /// widget becomes active.
    pub fn register_listener(&mut self) {
        self.listening = true;
    }

    /// Releases the subscription. Safe to call without a prior register.
    pub fn unregister_listener(&mut self) {
        self.listening = false;
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Resolves `event` to zero or one command and invokes it against `ctx`.
    /// Returns true when a command was resolved in an allowed context;
    /// otherwise the event passes through untouched.
    pub fn dispatch(&self, ctx: &mut C, event: &mut KeyPress) -> bool {
        if !self.listening {
            return false;
        }
        let Some(name) = self.bindings.get(&event.combo()) else {
            return false;
        };
        let Some(command) = self.commands.get(name) else {
            return false;
        };
        if let Some(allowed) = &command.is_allowed_context
            && !allowed(ctx, event)
        {
            return false;
        }
        if command.should_prevent_default {
            event.prevent_default();
        }
        if let Some(disabled) = &command.is_disabled
            && disabled(ctx)
        {
            return true;
        }
        (command.trigger)(ctx, event);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, Dispatcher, KeyPress, normalize_code};

    #[derive(Default)]
    struct Counter {
        submits: usize,
        disabled: bool,
        allowed: bool,
    }

    fn dispatcher() -> Dispatcher<Counter> {
        Dispatcher::new(
            [("Ctrl+Enter".to_string(), "submitQuery".to_string())],
            [(
                "submitQuery".to_string(),
                Command::new(|counter: &mut Counter, _event| counter.submits += 1)
                    .prevent_default()
                    .disabled_when(|counter: &Counter| counter.disabled),
            )],
        )
    }

    #[test]
    fn normalizes_key_codes() {
        assert_eq!(normalize_code("KeyA"), "a");
        assert_eq!(normalize_code("Enter"), "enter");
        assert_eq!(normalize_code("ArrowDown"), "arrowdown");
        assert_eq!(normalize_code("Digit1"), "digit1");
        assert_eq!(normalize_code("ControlLeft"), "");
        assert_eq!(normalize_code("ShiftRight"), "");
        assert_eq!(normalize_code("AltLeft"), "");
    }

    #[test]
    fn combo_orders_modifiers_ctrl_shift_alt() {
        let event = KeyPress::new("KeyP", true, true, true);
        assert_eq!(event.combo(), "ctrl+shift+alt+p");

        let event = KeyPress::plain("Enter");
        assert_eq!(event.combo(), "enter");
    }

    #[test]
    fn unbound_combo_passes_through() {
        let dispatcher = {
            let mut d = dispatcher();
            d.register_listener();
            d
        };
        let mut counter = Counter::default();
        let mut event = KeyPress::plain("Enter");
        assert!(!dispatcher.dispatch(&mut counter, &mut event));
        assert_eq!(counter.submits, 0);
        assert!(!event.default_prevented());
    }

    #[test]
    fn bound_combo_triggers_once_and_prevents_default() {
        let mut dispatcher = dispatcher();
        dispatcher.register_listener();
        let mut counter = Counter::default();
        let mut event = KeyPress::new("Enter", true, false, false);
        assert!(dispatcher.dispatch(&mut counter, &mut event));
        assert_eq!(counter.submits, 1);
        assert!(event.default_prevented());
    }

    #[test]
    fn disabled_command_suppresses_default_but_does_not_trigger() {
        let mut dispatcher = dispatcher();
        dispatcher.register_listener();
        let mut counter = Counter {
            disabled: true,
            ..Counter::default()
        };
        let mut event = KeyPress::new("Enter", true, false, false);
        assert!(dispatcher.dispatch(&mut counter, &mut event));
        assert_eq!(counter.submits, 0);
        assert!(event.default_prevented());
    }

    #[test]
    fn disallowed_context_leaves_event_untouched() {
        let mut dispatcher = Dispatcher::new(
            [("arrowdown".to_string(), "next".to_string())],
            [(
                "next".to_string(),
                Command::new(|counter: &mut Counter, _event| counter.submits += 1)
                    .allowed_when(|counter: &Counter, _event| counter.allowed)
                    .prevent_default(),
            )],
        );
        dispatcher.register_listener();
        let mut counter = Counter::default();
        let mut event = KeyPress::plain("ArrowDown");
        assert!(!dispatcher.dispatch(&mut counter, &mut event));
        assert_eq!(counter.submits, 0);
        assert!(!event.default_prevented());

        counter.allowed = true;
        let mut event = KeyPress::plain("ArrowDown");
        assert!(dispatcher.dispatch(&mut counter, &mut event));
        assert_eq!(counter.submits, 1);
    }

    #[test]
    fn binding_lookup_is_case_insensitive() {
        let mut dispatcher = dispatcher();
        dispatcher.register_listener();
        let mut counter = Counter::default();
        let mut event = KeyPress::new("Enter", true, false, false);
        assert!(dispatcher.dispatch(&mut counter, &mut event));
        assert_eq!(counter.submits, 1);
    }

    #[test]
    fn pure_modifier_press_resolves_to_nothing() {
        let mut dispatcher = dispatcher();
        dispatcher.register_listener();
        let mut counter = Counter::default();
        let mut event = KeyPress::new("ControlLeft", true, false, false);
        assert!(!dispatcher.dispatch(&mut counter, &mut event));
        assert_eq!(counter.submits, 0);
    }

    #[test]
    fn unregistered_listener_ignores_events() {
        let mut dispatcher = dispatcher();
        let mut counter = Counter::default();
        let mut event = KeyPress::new("Enter", true, false, false);
        assert!(!dispatcher.dispatch(&mut counter, &mut event));

        dispatcher.register_listener();
        dispatcher.unregister_listener();
        dispatcher.unregister_listener();
        let mut event = KeyPress::new("Enter", true, false, false);
        assert!(!dispatcher.dispatch(&mut counter, &mut event));
        assert_eq!(counter.submits, 0);
    }

    #[test]
    fn dispatch_is_deterministic_for_identical_events() {
        let mut dispatcher = dispatcher();
        dispatcher.register_listener();
        let mut counter = Counter::default();
        for _ in 0..3 {
            let mut event = KeyPress::new("Enter", true, false, false);
            assert!(dispatcher.dispatch(&mut counter, &mut event));
        }
        assert_eq!(counter.submits, 3);
    }
}
