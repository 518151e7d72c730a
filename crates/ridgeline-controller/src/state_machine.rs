//! The leader-role state machine.
//!
//! A pure `(Phase, Event) -> Phase` transition function -- no I/O, no side
//! effects, fully exercised by table tests without a controller,
//! coordination client, or registry in scope.

/// Where the leader role is in one pass of the generate-bump-publish-activate
/// cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Generating,
    BumpingVersion,
    PublishingBundle,
    AwaitingActivation,
}

/// What happened during the current phase, driving the next transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A tick or external event (wanted-state change, probe report,
    /// resource-block signal) woke the leader loop.
    TickOrExternalEvent,
    /// `StateGenerator::generate` produced `GenerationOutcome::NoChange`.
    NoChange,
    /// `StateGenerator::generate` produced `GenerationOutcome::Candidate`.
    Candidate,
    /// A CAS write (version bump or bundle publish) succeeded.
    CasOk,
    /// A CAS write's expected version was stale.
    CasConflict,
    /// The bundle write succeeded and the bundle is not deferred-activation.
    PublishedImmediate,
    /// The bundle write succeeded and the bundle requires deferred
    /// activation.
    PublishedDeferred,
    /// The activation coordinator reached quorum.
    QuorumAcks,
    /// The activation deadline elapsed without quorum.
    Timeout,
}

/// Applies one transition of the leader-role diagram.
///
/// Returns `phase` unchanged for an event the diagram does not define from
/// the current phase -- callers only ever feed events that are valid for
/// the phase they're in, but the function does not panic on a mismatch,
/// preferring a total function over a partial one.
#[must_use]
pub fn transition(phase: Phase, event: Event) -> Phase {
    match (phase, event) {
        (Phase::Idle, Event::TickOrExternalEvent) => Phase::Generating,
        (Phase::Generating, Event::NoChange) => Phase::Idle,
        (Phase::Generating, Event::Candidate) => Phase::BumpingVersion,
        (Phase::BumpingVersion, Event::CasOk) => Phase::PublishingBundle,
        (Phase::BumpingVersion, Event::CasConflict) => Phase::Idle,
        (Phase::PublishingBundle, Event::PublishedImmediate) => Phase::Idle,
        (Phase::PublishingBundle, Event::PublishedDeferred) => Phase::AwaitingActivation,
        (Phase::PublishingBundle, Event::CasConflict) => Phase::Idle,
        (Phase::AwaitingActivation, Event::QuorumAcks) => Phase::Idle,
        (Phase::AwaitingActivation, Event::Timeout) => Phase::Idle,
        (other, _) => other,
    }
}
