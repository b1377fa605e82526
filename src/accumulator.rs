use crate::error::ChatError;
use futures_util::{stream, Stream, StreamExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    Empty,
    Accumulating,
    Completed,
    Failed,
}

/// Folds the incremental deltas of one in-flight response into a growing
/// full-text snapshot. One instance per request; `Completed` and `Failed`
/// are terminal.
#[derive(Debug)]
pub struct StreamAccumulator {
    text: String,
    state: AccumulatorState,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        StreamAccumulator {
            text: String::new(),
            state: AccumulatorState::Empty,
        }
    }

    /// Appends one fragment and returns the updated snapshot. `Completed`
    /// and `Failed` absorb: once finished, the text is frozen and further
    /// pushes are ignored.
    pub fn push(&mut self, fragment: &str) -> &str {
        if !self.is_terminal() {
            self.state = AccumulatorState::Accumulating;
            self.text.push_str(fragment);
        }
        &self.text
    }

    pub fn complete(&mut self) {
        if !self.is_terminal() {
            self.state = AccumulatorState::Completed;
        }
    }

    pub fn fail(&mut self) {
        if !self.is_terminal() {
            self.state = AccumulatorState::Failed;
        }
    }

    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            AccumulatorState::Completed | AccumulatorState::Failed
        )
    }

    /// The full response so far; after `complete` this is the final text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Default for StreamAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapts a fragment stream into the snapshot stream handed to the display:
/// the i-th `Ok` item is the concatenation of the first i fragments, so each
/// item is a prefix-extension of the one before. An upstream error is
/// forwarded once and ends the stream; already-yielded snapshots stay valid.
pub fn accumulate<S>(upstream: S) -> impl Stream<Item = Result<String, ChatError>>
where
    S: Stream<Item = Result<String, ChatError>>,
{
    stream::unfold(
        (Box::pin(upstream), StreamAccumulator::new()),
        |(mut upstream, mut acc)| async move {
            if acc.is_terminal() {
                return None;
            }
            match upstream.next().await {
                Some(Ok(fragment)) => {
                    let snapshot = acc.push(&fragment).to_owned();
                    Some((Ok(snapshot), (upstream, acc)))
                }
                Some(Err(err)) => {
                    acc.fail();
                    Some((Err(err), (upstream, acc)))
                }
                None => {
                    acc.complete();
                    None
                }
            }
        },
    )
}
