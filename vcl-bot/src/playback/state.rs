//! Player state machine
//!
//! The whole player lifecycle is this one pure function. Every edge into
//! `Idle` carries `RequestPlay`: that edge is what turns a finite asset into
//! an endless stream. There is no input that parks the player in `Idle`.
//!
//! `Paused` is part of the reported status set but has no inbound edge; a
//! player without subscribers auto-pauses instead.

pub use vcl_common::PlayerStatus;

/// Inputs driving the player state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    /// Play a resource; `subscribed` is true when at least one sink is attached
    Play { subscribed: bool },
    /// A sink confirmed it is streaming the current resource
    SinkStarted,
    /// A new subscriber was attached
    SubscriberAttached,
    /// The last subscriber was detached
    SubscribersGone,
    /// Current resource was exhausted
    ResourceEnded,
    /// Streaming the current resource failed
    Failed,
}

/// Side effect the player performs after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    None,
    /// Start the current resource on every attached sink
    StartSinks,
    /// Start the current resource on the newly attached sink only, from
    /// the held position
    StartAttached,
    /// Play the current (possibly refreshed) resource again
    RequestPlay,
}

/// Result of applying one input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: PlayerStatus,
    pub action: PlayerAction,
}

impl Transition {
    const fn to(next: PlayerStatus, action: PlayerAction) -> Self {
        Self { next, action }
    }

    const fn stay(current: PlayerStatus) -> Self {
        Self {
            next: current,
            action: PlayerAction::None,
        }
    }
}

/// Apply `input` to `from`
///
/// The player never stops on a subscriber loss: it auto-pauses and resumes
/// when a subscriber comes back.
pub fn transition(from: PlayerStatus, input: PlayerInput) -> Transition {
    use PlayerAction as A;
    use PlayerInput as I;
    use PlayerStatus as S;

    match (from, input) {
        (_, I::Play { subscribed: true }) => Transition::to(S::Buffering, A::StartSinks),
        (_, I::Play { subscribed: false }) => Transition::to(S::AutoPaused, A::None),

        (S::Buffering, I::SinkStarted) => Transition::to(S::Playing, A::None),

        (S::AutoPaused, I::SubscriberAttached) => Transition::to(S::Buffering, A::StartAttached),
        (S::Buffering | S::Playing, I::SubscriberAttached) => Transition::to(from, A::StartAttached),

        (S::Buffering | S::Playing, I::SubscribersGone) => Transition::to(S::AutoPaused, A::None),

        (_, I::ResourceEnded | I::Failed) => Transition::to(S::Idle, A::RequestPlay),

        _ => Transition::stay(from),
    }
}
