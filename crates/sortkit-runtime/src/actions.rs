#![forbid(unsafe_code)]

//! Named user actions and their default shortcuts.
//!
//! A front-end binds keys to [`WizardAction`]s and forwards each one to
//! [`Supervisor::dispatch`](crate::Supervisor::dispatch) as a [`Command`].
//!
//! | Action                  | Default shortcut   |
//! |-------------------------|--------------------|
//! | `merge`                 | `g`                |
//! | `split`                 | `k`                |
//! | `undo` / `redo`         | `ctrl+z` / `ctrl+shift+z` |
//! | `save`                  | `ctrl+s`           |
//! | `reset`                 | `ctrl+alt+space`   |
//! | `next` / `previous`     | `space` / `shift+space` |
//! | `next_best` / `previous_best` | `down` / `up` |
//! | `move_best_to_<group>`  | `alt+<key>`        |
//! | `move_similar_to_<group>` | `ctrl+<key>`     |
//! | `move_all_to_<group>`   | `ctrl+alt+<key>`   |
//!
//! Group keys: `n` noise, `m` mua, `g` good, `u` unsorted.

use std::fmt;
use std::str::FromStr;

use sortkit_core::{CurationError, Group};

use crate::command::{Command, MoveTarget};

/// Part of the selection a move action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveScope {
    Best,
    Similar,
    All,
}

impl MoveScope {
    pub const ALL: [MoveScope; 3] = [MoveScope::Best, MoveScope::Similar, MoveScope::All];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::Similar => "similar",
            Self::All => "all",
        }
    }

    const fn modifiers(self) -> &'static str {
        match self {
            Self::Best => "alt",
            Self::Similar => "ctrl",
            Self::All => "ctrl+alt",
        }
    }

    fn target(self) -> MoveTarget {
        match self {
            Self::Best => MoveTarget::Best,
            Self::Similar => MoveTarget::Similar,
            Self::All => MoveTarget::All,
        }
    }
}

/// A user-facing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WizardAction {
    Merge,
    Split,
    Undo,
    Redo,
    Save,
    /// Select the best cluster.
    Reset,
    /// Next similar cluster.
    Next,
    /// Previous similar cluster.
    Previous,
    /// Next cluster in the cluster list.
    NextBest,
    /// Previous cluster in the cluster list.
    PreviousBest,
    Move(MoveScope, Group),
}

const SIMPLE: [WizardAction; 10] = [
    WizardAction::Merge,
    WizardAction::Split,
    WizardAction::Undo,
    WizardAction::Redo,
    WizardAction::Save,
    WizardAction::Reset,
    WizardAction::Next,
    WizardAction::Previous,
    WizardAction::NextBest,
    WizardAction::PreviousBest,
];

impl WizardAction {
    /// Every action, simple ones first.
    #[must_use]
    pub fn all() -> Vec<Self> {
        let mut actions = SIMPLE.to_vec();
        for scope in MoveScope::ALL {
            actions.extend(Group::ALL.iter().map(|&group| Self::Move(scope, group)));
        }
        actions
    }

    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Merge => "merge".into(),
            Self::Split => "split".into(),
            Self::Undo => "undo".into(),
            Self::Redo => "redo".into(),
            Self::Save => "save".into(),
            Self::Reset => "reset".into(),
            Self::Next => "next".into(),
            Self::Previous => "previous".into(),
            Self::NextBest => "next_best".into(),
            Self::PreviousBest => "previous_best".into(),
            Self::Move(scope, group) => format!("move_{}_to_{}", scope.as_str(), group.as_str()),
        }
    }

    #[must_use]
    pub fn default_shortcut(&self) -> String {
        match self {
            Self::Merge => "g".into(),
            Self::Split => "k".into(),
            Self::Undo => "ctrl+z".into(),
            Self::Redo => "ctrl+shift+z".into(),
            Self::Save => "ctrl+s".into(),
            Self::Reset => "ctrl+alt+space".into(),
            Self::Next => "space".into(),
            Self::Previous => "shift+space".into(),
            Self::NextBest => "down".into(),
            Self::PreviousBest => "up".into(),
            Self::Move(scope, group) => {
                let key = match group {
                    Group::Noise => 'n',
                    Group::Mua => 'm',
                    Group::Good => 'g',
                    Group::Unsorted => 'u',
                };
                format!("{}+{key}", scope.modifiers())
            }
        }
    }

    /// Action bound to `shortcut` in the default table.
    #[must_use]
    pub fn from_shortcut(shortcut: &str) -> Option<Self> {
        let shortcut = shortcut.trim().to_ascii_lowercase();
        Self::all()
            .into_iter()
            .find(|action| action.default_shortcut() == shortcut)
    }

    /// `(name, shortcut)` for every action.
    #[must_use]
    pub fn shortcut_table() -> Vec<(String, String)> {
        Self::all()
            .iter()
            .map(|action| (action.name(), action.default_shortcut()))
            .collect()
    }
}

impl fmt::Display for WizardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for WizardAction {
    type Err = CurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if let Some(action) = SIMPLE.iter().find(|action| action.name() == name) {
            return Ok(*action);
        }
        let parsed = name.strip_prefix("move_").and_then(|rest| {
            let (scope, group) = rest.split_once("_to_")?;
            let scope = MoveScope::ALL
                .into_iter()
                .find(|candidate| candidate.as_str() == scope)?;
            Some(Self::Move(scope, group.parse().ok()?))
        });
        parsed.ok_or_else(|| CurationError::Parse(s.to_string()))
    }
}

impl From<WizardAction> for Command {
    fn from(action: WizardAction) -> Self {
        match action {
            WizardAction::Merge => Command::Merge(None),
            WizardAction::Split => Command::Split(None),
            WizardAction::Undo => Command::Undo,
            WizardAction::Redo => Command::Redo,
            WizardAction::Save => Command::Save,
            WizardAction::Reset => Command::ResetWizard,
            WizardAction::Next => Command::Next,
            WizardAction::Previous => Command::Previous,
            WizardAction::NextBest => Command::NextBest,
            WizardAction::PreviousBest => Command::PreviousBest,
            WizardAction::Move(scope, group) => Command::Move {
                group,
                target: scope.target(),
            },
        }
    }
}
