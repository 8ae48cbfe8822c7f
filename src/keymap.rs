use winit::keyboard::{Key, ModifiersState, NamedKey};

/// Commands a keymap can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ToggleSettings,
    ToggleAlwaysOnTop,
    CopyToDestination,
    CopyMedia,
    CopyMediaPath,
    PanImage,
    Next,
    Previous,
    ZoomIn,
    ZoomOut,
    ResetView,
    ActualSize,
    ToggleFullscreen,
    Close,
    OpenFile,
    ToggleInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chords {
    Single(&'static str),
    Any(Vec<&'static str>),
}

impl Chords {
    pub fn as_slice(&self) -> &[&'static str] {
        match self {
            Chords::Single(c) => std::slice::from_ref(c),
            Chords::Any(cs) => cs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Keymap {
    pub chords: Chords,
    pub description: &'static str,
    pub action: Action,
}

impl Keymap {
    fn new(chords: Chords, description: &'static str, action: Action) -> Self {
        Self {
            chords,
            description,
            action,
        }
    }

    /// The registered chord matching `normalized`, if any.
    fn matching(&self, normalized: &str) -> Option<&'static str> {
        self.chords
            .as_slice()
            .iter()
            .copied()
            .find(|c| normalize(c) == normalized)
    }
}

pub fn normalize(chord: &str) -> String {
    let lower = chord.to_lowercase();
    let mut parts: Vec<&str> = lower.split('|').collect();
    parts.sort_unstable();
    parts.join("|")
}

pub fn chords_equal(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

fn push_modifiers(parts: &mut Vec<String>, mods: ModifiersState) {
    if mods.control_key() {
        parts.push("ctrl".into());
    }
    if mods.alt_key() {
        parts.push("alt".into());
    }
    if mods.shift_key() {
        parts.push("shift".into());
    }
}

fn named_token(key: NamedKey) -> String {
    match key {
        NamedKey::Space => "space".into(),
        NamedKey::ArrowUp => "up".into(),
        NamedKey::ArrowDown => "down".into(),
        NamedKey::ArrowLeft => "left".into(),
        NamedKey::ArrowRight => "right".into(),
        NamedKey::Escape => "esc".into(),
        other => format!("{other:?}").to_lowercase(),
    }
}

/// Chord for a key press, or `None` for keys that carry no name (dead keys,
/// bare modifiers).
pub fn key_chord(key: &Key, mods: ModifiersState) -> Option<String> {
    let token = match key {
        Key::Named(
            NamedKey::Control | NamedKey::Shift | NamedKey::Alt | NamedKey::Super | NamedKey::Meta,
        ) => return None,
        Key::Named(named) => named_token(*named),
        Key::Character(s) if s.as_str() == " " => "space".into(),
        Key::Character(s) => s.to_lowercase(),
        _ => return None,
    };
    let mut parts = Vec::with_capacity(4);
    push_modifiers(&mut parts, mods);
    parts.push(token);
    Some(parts.join("|"))
}

/// Chord for a vertical wheel movement. Positive `delta_y` scrolls up.
pub fn wheel_chord(delta_y: f32, mods: ModifiersState) -> Option<String> {
    if delta_y == 0.0 {
        return None;
    }
    let mut parts = Vec::with_capacity(4);
    push_modifiers(&mut parts, mods);
    parts.push(if delta_y > 0.0 { "scrollup" } else { "scrolldown" }.into());
    Some(parts.join("|"))
}

/// Ordered keymap table plus the modal suspension switch.
pub struct KeyRouter {
    keymaps: Vec<Keymap>,
    suspended: bool,
}

impl KeyRouter {
    pub fn new(keymaps: Vec<Keymap>) -> Self {
        Self {
            keymaps,
            suspended: false,
        }
    }

    pub fn keymaps(&self) -> &[Keymap] {
        &self.keymaps
    }

    /// While suspended (a modal overlay is open) nothing is dispatched.
    pub fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// First keymap matching `chord`, with the registered chord that matched.
    pub fn lookup(&self, chord: &str) -> Option<(Action, &'static str)> {
        if self.suspended {
            return None;
        }
        let pressed = normalize(chord);
        self.keymaps
            .iter()
            .find_map(|km| km.matching(&pressed).map(|c| (km.action, c)))
    }

    /// Runs `handler` for the first match. Returns whether the event was
    /// consumed; unmatched chords are left to the platform.
    pub fn dispatch(&self, chord: &str, mut handler: impl FnMut(Action, &str)) -> bool {
        match self.lookup(chord) {
            Some((action, matched)) => {
                log::debug!("[keys] {} -> {:?}", chord, action);
                handler(action, matched);
                true
            }
            None => false,
        }
    }

    /// One line per keymap, for help output.
    pub fn describe(&self) -> Vec<String> {
        self.keymaps
            .iter()
            .map(|km| {
                let keys: Vec<String> = km
                    .chords
                    .as_slice()
                    .iter()
                    .map(|c| c.split('|').collect::<Vec<_>>().join(" + "))
                    .collect();
                format!("{:<22} {}", km.description, keys.join(" | "))
            })
            .collect()
    }
}

// Chord sets must stay pairwise disjoint after normalization; lookup stops at
// the first registered match.
pub fn default_keymaps() -> Vec<Keymap> {
    use Action::*;
    use Chords::{Any, Single};
    vec![
        Keymap::new(Single("ctrl|,"), "Open Settings", ToggleSettings),
        Keymap::new(Single("ctrl|t"), "Always on top", ToggleAlwaysOnTop),
        Keymap::new(Single("ctrl|s"), "Copy To Destination", CopyToDestination),
        Keymap::new(Single("ctrl|c"), "Copy Media", CopyMedia),
        Keymap::new(Single("ctrl|shift|c"), "Copy Media Path", CopyMediaPath),
        Keymap::new(Any(vec!["ctrl|h", "ctrl|l", "ctrl|j", "ctrl|k"]), "Drag Image", PanImage),
        Keymap::new(Any(vec!["right", "h", "scrollup"]), "Next", Next),
        Keymap::new(Any(vec!["left", "l", "scrolldown"]), "Previous", Previous),
        Keymap::new(
            Any(vec!["=", "shift|+", "k", "up", "ctrl|scrollup"]),
            "Zoom In",
            ZoomIn,
        ),
        Keymap::new(Any(vec!["-", "j", "down", "ctrl|scrolldown"]), "Zoom Out", ZoomOut),
        Keymap::new(Any(vec!["esc", "r", "o"]), "Reset Zoom/Pan", ResetView),
        Keymap::new(Single("1"), "Zoom to Actual Size", ActualSize),
        Keymap::new(Single("f"), "Toggle Fullscreen", ToggleFullscreen),
        Keymap::new(Single("x"), "Close Window", Close),
        Keymap::new(Single("ctrl|o"), "Open File", OpenFile),
        Keymap::new(Single("i"), "Toggle Info", ToggleInfo),
    ]
}

/// Pan step for a matched `Drag Image` chord.
pub fn pan_delta(chord: &str) -> (f64, f64) {
    match normalize(chord).as_str() {
        "ctrl|h" => (-10.0, 0.0),
        "ctrl|l" => (10.0, 0.0),
        "ctrl|j" => (0.0, -10.0),
        "ctrl|k" => (0.0, 10.0),
        _ => (0.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use winit::keyboard::SmolStr;
    use super::Chords::Single;

    fn ch(s: &str) -> Key {
        Key::Character(SmolStr::new(s))
    }

    #[test]
    fn normalization_ignores_order_and_case() {
        assert!(chords_equal("Ctrl|Shift|S", "shift|ctrl|s"));
        assert!(!chords_equal("ctrl|s", "ctrl|shift|s"));
        assert_eq!(normalize("Shift|Ctrl|C"), "c|ctrl|shift");
    }

    #[test]
    fn key_chords_list_modifiers_in_fixed_order() {
        let all = ModifiersState::CONTROL | ModifiersState::ALT | ModifiersState::SHIFT;
        assert_eq!(key_chord(&ch("S"), all).as_deref(), Some("ctrl|alt|shift|s"));
        assert_eq!(
            key_chord(&Key::Named(NamedKey::ArrowLeft), ModifiersState::empty()).as_deref(),
            Some("left")
        );
        assert_eq!(
            key_chord(&Key::Named(NamedKey::Escape), ModifiersState::empty()).as_deref(),
            Some("esc")
        );
        assert_eq!(
            key_chord(&Key::Named(NamedKey::Space), ModifiersState::SHIFT).as_deref(),
            Some("shift|space")
        );
        assert_eq!(
            key_chord(&Key::Named(NamedKey::Home), ModifiersState::empty()).as_deref(),
            Some("home")
        );
        assert_eq!(key_chord(&Key::Named(NamedKey::Control), ModifiersState::CONTROL), None);
    }

    #[test]
    fn wheel_chords_follow_delta_sign() {
        assert_eq!(wheel_chord(1.0, ModifiersState::empty()).as_deref(), Some("scrollup"));
        assert_eq!(wheel_chord(-3.0, ModifiersState::empty()).as_deref(), Some("scrolldown"));
        assert_eq!(
            wheel_chord(-1.0, ModifiersState::CONTROL).as_deref(),
            Some("ctrl|scrolldown")
        );
        assert_eq!(wheel_chord(0.0, ModifiersState::CONTROL), None);
    }

    #[test]
    fn alternatives_map_to_one_action() {
        let router = KeyRouter::new(default_keymaps());
        assert_eq!(router.lookup("right").map(|m| m.0), Some(Action::Next));
        assert_eq!(router.lookup("h").map(|m| m.0), Some(Action::Next));
        assert_eq!(router.lookup("l").map(|m| m.0), Some(Action::Previous));
        assert_eq!(router.lookup("scrollup").map(|m| m.0), Some(Action::Next));
        assert_eq!(router.lookup("scrollup|ctrl").map(|m| m.0), Some(Action::ZoomIn));
        assert_eq!(router.lookup("shift|ctrl|c").map(|m| m.0), Some(Action::CopyMediaPath));
        assert_eq!(router.lookup("ctrl|c").map(|m| m.0), Some(Action::CopyMedia));
    }

    #[test]
    fn matched_chord_is_passed_to_the_handler() {
        let router = KeyRouter::new(default_keymaps());
        let mut seen = Vec::new();
        assert!(router.dispatch("ctrl|j", |a, c| seen.push((a, c.to_string()))));
        assert_eq!(seen, vec![(Action::PanImage, "ctrl|j".to_string())]);
        assert_eq!(pan_delta(&seen[0].1), (0.0, -10.0));
    }

    #[test]
    fn unmapped_chords_are_not_consumed() {
        let router = KeyRouter::new(default_keymaps());
        let mut calls = 0;
        assert!(!router.dispatch("ctrl|alt|q", |_, _| calls += 1));
        assert!(!router.dispatch("shift|h", |_, _| calls += 1));
        assert_eq!(calls, 0);
    }

    #[test]
    fn first_registered_keymap_wins() {
        let router = KeyRouter::new(vec![
            Keymap::new(Single("a"), "first", Action::Next),
            Keymap::new(Chords::Any(vec!["b", "A"]), "second", Action::Previous),
        ]);
        assert_eq!(router.lookup("a"), Some((Action::Next, "a")));
        assert_eq!(router.lookup("b"), Some((Action::Previous, "b")));
    }

    #[test]
    fn suspended_router_fires_nothing() {
        let mut router = KeyRouter::new(default_keymaps());
        router.set_suspended(true);
        let mut calls = 0;
        assert!(!router.dispatch("right", |_, _| calls += 1));
        assert!(!router.dispatch("ctrl|,", |_, _| calls += 1));
        assert_eq!(calls, 0);

        router.set_suspended(false);
        assert!(router.dispatch("right", |_, _| calls += 1));
        assert_eq!(calls, 1);
    }

    #[test]
    fn default_chord_sets_are_pairwise_disjoint() {
        let mut seen = HashSet::new();
        for km in default_keymaps() {
            for chord in km.chords.as_slice() {
                assert!(seen.insert(normalize(chord)), "{chord} registered twice");
            }
        }
    }

    #[test]
    fn describe_lists_every_keymap() {
        let router = KeyRouter::new(default_keymaps());
        let lines = router.describe();
        assert_eq!(lines.len(), router.keymaps().len());
        assert!(lines[4].contains("ctrl + shift + c"));
    }
}
