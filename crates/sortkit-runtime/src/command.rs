#![forbid(unsafe_code)]

//! Commands accepted by the supervisor and the queue that serializes them.
//!
//! Subscribers react to [`SupervisorEvent`](crate::SupervisorEvent)s while a
//! command is still executing. Anything they want to do next goes through a
//! [`CommandSender`]; the supervisor runs queued commands one by one after
//! the current command returns.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use sortkit_core::{ClusterId, CurationError, Group, LabelValue, SpikeId};

use crate::views::SortSpec;

/// Which clusters a move applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveTarget {
    /// Primary and similar selection.
    All,
    /// Primary selection.
    Best,
    /// Similar selection.
    Similar,
    Ids(Vec<ClusterId>),
    One(ClusterId),
}

impl MoveTarget {
    /// Explicit ids, `None` for selection-relative targets.
    #[must_use]
    pub fn explicit_ids(&self) -> Option<Vec<ClusterId>> {
        match self {
            Self::Ids(ids) => Some(ids.clone()),
            Self::One(id) => Some(vec![*id]),
            Self::All | Self::Best | Self::Similar => None,
        }
    }
}

impl fmt::Display for MoveTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Best => f.write_str("best"),
            Self::Similar => f.write_str("similar"),
            Self::One(id) => write!(f, "{id}"),
            Self::Ids(ids) => {
                let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                f.write_str(&ids.join(","))
            }
        }
    }
}

/// `all`, `best`, `similar`, a single id or a comma separated id list. The
/// empty string is an empty id list.
impl FromStr for MoveTarget {
    type Err = CurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "all" => return Ok(Self::All),
            "best" => return Ok(Self::Best),
            "similar" => return Ok(Self::Similar),
            "" => return Ok(Self::Ids(Vec::new())),
            _ => {}
        }
        let ids = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<ClusterId>()
                    .map_err(|_| CurationError::Parse(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        match ids.as_slice() {
            [id] => Ok(Self::One(*id)),
            _ => Ok(Self::Ids(ids)),
        }
    }
}

/// One supervisor operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Select(Vec<ClusterId>),
    SelectSimilar(Vec<ClusterId>),
    /// `None` merges the whole selection.
    Merge(Option<Vec<ClusterId>>),
    /// `None` asks the split requester for spikes.
    Split(Option<Vec<SpikeId>>),
    /// `None` splits the whole selection.
    SplitClusters(Option<Vec<ClusterId>>),
    Move {
        group: Group,
        target: MoveTarget,
    },
    Label {
        field: String,
        value: LabelValue,
        /// `None` labels the whole selection.
        cluster_ids: Option<Vec<ClusterId>>,
    },
    Undo,
    Redo,
    ResetWizard,
    Next,
    Previous,
    NextBest,
    PreviousBest,
    SortClusterView(SortSpec),
    Save,
}

impl Command {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Select(_) => "select",
            Self::SelectSimilar(_) => "select_similar",
            Self::Merge(_) => "merge",
            Self::Split(_) => "split",
            Self::SplitClusters(_) => "split_clusters",
            Self::Move { .. } => "move",
            Self::Label { .. } => "label",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::ResetWizard => "reset_wizard",
            Self::Next => "next",
            Self::Previous => "previous",
            Self::NextBest => "next_best",
            Self::PreviousBest => "previous_best",
            Self::SortClusterView(_) => "sort_cluster_view",
            Self::Save => "save",
        }
    }
}

/// Result of a command that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// State changed and events were emitted.
    Applied,
    /// Nothing to do; no history was recorded.
    NoOp,
}

impl Outcome {
    #[must_use]
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

type Inbox = Rc<RefCell<VecDeque<Command>>>;

/// FIFO of commands waiting for the supervisor.
#[derive(Debug, Default)]
pub(crate) struct CommandQueue {
    inbox: Inbox,
}

impl CommandQueue {
    pub(crate) fn sender(&self) -> CommandSender {
        CommandSender {
            inbox: Rc::clone(&self.inbox),
        }
    }

    pub(crate) fn pop(&self) -> Option<Command> {
        self.inbox.borrow_mut().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.inbox.borrow().len()
    }
}

/// Cloneable handle for enqueueing follow-up commands.
#[derive(Debug, Clone)]
pub struct CommandSender {
    inbox: Inbox,
}

impl CommandSender {
    pub fn send(&self, command: Command) {
        tracing::debug!(message = "command.queued", command = command.name());
        self.inbox.borrow_mut().push_back(command);
    }

    /// Commands not yet executed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbox.borrow().len()
    }
}
