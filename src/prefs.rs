//! Display preferences for the karaoke view.
//!
//! Preferences are read through a [`PreferenceStore`] exactly once, when the view is
//! constructed, and frozen into a [`DisplayPreferences`] snapshot. Changing a preference
//! takes effect the next time a view is built.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKey {
    ShowPending,
    Karaoke,
    UpdateOnFinish,
    StopKaraokeOnAnyNodeClick,
}

impl PreferenceKey {
    pub const ALL: [PreferenceKey; 4] = [
        PreferenceKey::ShowPending,
        PreferenceKey::Karaoke,
        PreferenceKey::UpdateOnFinish,
        PreferenceKey::StopKaraokeOnAnyNodeClick,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PreferenceKey::ShowPending => "runDetails.pipeline.showPending",
            PreferenceKey::Karaoke => "runDetails.pipeline.karaoke",
            PreferenceKey::UpdateOnFinish => "runDetails.pipeline.updateOnFinish",
            PreferenceKey::StopKaraokeOnAnyNodeClick => {
                "runDetails.pipeline.stopKaraokeOnAnyNodeClick"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PreferenceValue {
    Always,
    Never,
    #[default]
    Default,
}

pub trait PreferenceStore {
    fn get(&self, key: PreferenceKey) -> PreferenceValue;
}

/// In-memory store; unset keys read as [`PreferenceValue::Default`].
#[derive(Debug, Clone, Default)]
pub struct StaticPreferences {
    values: HashMap<PreferenceKey, PreferenceValue>,
}

impl StaticPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: PreferenceKey, value: PreferenceValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: PreferenceKey, value: PreferenceValue) {
        self.values.insert(key, value);
    }
}

impl PreferenceStore for StaticPreferences {
    fn get(&self, key: PreferenceKey) -> PreferenceValue {
        self.values.get(&key).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayPreferences {
    /// Show the "waiting for backend" placeholder while a fetch is in flight.
    pub show_pending: bool,
    /// `false` means the view never follows along, whatever the caller asks for.
    pub karaoke_allowed: bool,
    /// Refetch everything when the run transitions into completed.
    pub update_on_finish: bool,
    /// Clicking any node never turns karaoke back on.
    pub stop_on_click: bool,
}

impl DisplayPreferences {
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let prefs = Self {
            show_pending: store.get(PreferenceKey::ShowPending) != PreferenceValue::Never,
            karaoke_allowed: store.get(PreferenceKey::Karaoke) != PreferenceValue::Never,
            update_on_finish: store.get(PreferenceKey::UpdateOnFinish) != PreferenceValue::Never,
            stop_on_click: store.get(PreferenceKey::StopKaraokeOnAnyNodeClick)
                == PreferenceValue::Always,
        };
        tracing::debug!(?prefs, "display preferences loaded");
        prefs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn defaults_enable_everything_but_stop_on_click() {
        let prefs = DisplayPreferences::load(&StaticPreferences::new());
        assert_eq!(
            prefs,
            DisplayPreferences {
                show_pending: true,
                karaoke_allowed: true,
                update_on_finish: true,
                stop_on_click: false,
            }
        );
    }

    #[test]
    fn never_disables_the_tri_state_flags() {
        let store = StaticPreferences::new()
            .with(PreferenceKey::ShowPending, PreferenceValue::Never)
            .with(PreferenceKey::Karaoke, PreferenceValue::Never)
            .with(PreferenceKey::UpdateOnFinish, PreferenceValue::Never);
        let prefs = DisplayPreferences::load(&store);
        assert!(!prefs.show_pending);
        assert!(!prefs.karaoke_allowed);
        assert!(!prefs.update_on_finish);
    }

    #[test]
    fn stop_on_click_requires_always() {
        let store = StaticPreferences::new()
            .with(PreferenceKey::StopKaraokeOnAnyNodeClick, PreferenceValue::Default);
        assert!(!DisplayPreferences::load(&store).stop_on_click);

        let store = store.with(PreferenceKey::StopKaraokeOnAnyNodeClick, PreferenceValue::Always);
        assert!(DisplayPreferences::load(&store).stop_on_click);
    }

    struct CountingStore {
        reads: Cell<usize>,
    }

    impl PreferenceStore for CountingStore {
        fn get(&self, _key: PreferenceKey) -> PreferenceValue {
            self.reads.set(self.reads.get() + 1);
            PreferenceValue::Default
        }
    }

    #[test]
    fn load_reads_each_key_once() {
        let store = CountingStore { reads: Cell::new(0) };
        let _ = DisplayPreferences::load(&store);
        assert_eq!(store.reads.get(), PreferenceKey::ALL.len());
    }

    #[test]
    fn keys_match_dashboard_names() {
        assert_eq!(PreferenceKey::Karaoke.key(), "runDetails.pipeline.karaoke");
        assert_eq!(
            PreferenceKey::StopKaraokeOnAnyNodeClick.key(),
            "runDetails.pipeline.stopKaraokeOnAnyNodeClick"
        );
    }
}
