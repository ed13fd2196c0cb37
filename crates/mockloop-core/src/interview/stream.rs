//! Streaming turn output.
//!
//! A turn stream yields raw backend text as it arrives, then the committed
//! outcome, then exactly one terminal fragment. Nothing follows a terminal
//! fragment, so a consumer can always stop on `End` or `Error`.

use std::pin::Pin;

use futures_util::Stream;

use mockloop_types::interview::TurnOutcome;

#[derive(Debug, Clone)]
pub enum TurnFragment {
    /// A piece of raw backend output.
    Delta(String),
    /// The turn was parsed and durably committed.
    Completed(TurnOutcome),
    /// End of stream after a successful turn.
    End,
    /// End of stream after a failure. Nothing of the turn was committed.
    Error(String),
}

impl TurnFragment {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnFragment::End | TurnFragment::Error(_))
    }
}

/// Single-use stream of one turn's fragments.
pub type TurnStream = Pin<Box<dyn Stream<Item = TurnFragment> + Send + 'static>>;
