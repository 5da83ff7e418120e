//! Call indicator tracking
//!
//! The AG reports its call, held and call-setup indicators as one group. Each
//! indicator is compared against the link's stored value and only changes are
//! forwarded, always in the order call, held, setup.

use tracing::{debug, info};

use crate::events::OutboundEvent;
use crate::link::LinkContext;
use crate::types::{CallSetupState, ConnectionHandle, IndicatorId};

/// What the indicator group change means for the call as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTransition {
    /// Setup went from idle to incoming, dialing or alerting
    SetupStarted,
    /// A call became active
    Activated,
    /// A previously active call ended
    Terminated,
    /// Setup returned to idle without a call ever becoming active
    AttemptCancelled,
}

/// Changed indicators, in emission order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorUpdate {
    pub changes: Vec<(IndicatorId, u8)>,
    pub transition: Option<CallTransition>,
}

impl IndicatorUpdate {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn into_events(self, handle: ConnectionHandle) -> Vec<OutboundEvent> {
        self.changes
            .into_iter()
            .map(|(id, value)| OutboundEvent::indicator(handle, id, value))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CallStateTracker;

impl CallStateTracker {
    /// Apply the AG's latest call/held/setup values to `link`
    pub fn on_call_indicators(
        link: &mut LinkContext,
        active: bool,
        held: bool,
        setup: CallSetupState,
    ) -> IndicatorUpdate {
        let mut update = IndicatorUpdate::default();
        let was_active = link.call_active;
        let previous_setup = link.call_setup;

        if active != link.call_active {
            update.changes.push((IndicatorId::Call, u8::from(active)));
            link.call_active = active;
        }
        if held != link.call_held {
            update.changes.push((IndicatorId::CallHeld, u8::from(held)));
            link.call_held = held;
        }
        if setup != link.call_setup {
            update.changes.push((IndicatorId::CallSetup, setup as u8));
            link.call_setup = setup;
        }

        update.transition = classify(was_active, active, previous_setup, setup);
        match update.transition {
            Some(CallTransition::Terminated) => {
                info!(handle = %link.handle, "Call terminated");
            }
            Some(CallTransition::AttemptCancelled) => {
                info!(handle = %link.handle, ?previous_setup, "Call attempt cancelled or rejected");
            }
            Some(CallTransition::Activated) => {
                info!(handle = %link.handle, "Call active");
            }
            Some(CallTransition::SetupStarted) => {
                debug!(handle = %link.handle, ?setup, "Call setup started");
            }
            None => {}
        }
        update
    }
}

fn classify(
    was_active: bool,
    active: bool,
    previous_setup: CallSetupState,
    setup: CallSetupState,
) -> Option<CallTransition> {
    match (was_active, active) {
        (false, true) => Some(CallTransition::Activated),
        (true, false) => Some(CallTransition::Terminated),
        (false, false) if setup == CallSetupState::Idle && previous_setup.is_in_progress() => {
            Some(CallTransition::AttemptCancelled)
        }
        _ if !previous_setup.is_in_progress() && setup.is_in_progress() => {
            Some(CallTransition::SetupStarted)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandsfreeConfig;
    use crate::types::ProfileKind;

    fn link() -> LinkContext {
        LinkContext::new(ConnectionHandle(1), ProfileKind::HandsFree, &HandsfreeConfig::default())
    }

    #[test]
    fn test_identical_indicators_emit_once() {
        let mut l = link();
        let first = CallStateTracker::on_call_indicators(&mut l, false, false, CallSetupState::Incoming);
        assert_eq!(first.changes, vec![(IndicatorId::CallSetup, 1)]);

        let second = CallStateTracker::on_call_indicators(&mut l, false, false, CallSetupState::Incoming);
        assert!(second.is_empty());
        assert_eq!(second.transition, None);
    }

    #[test]
    fn test_fixed_emission_order() {
        let mut l = link();
        l.call_setup = CallSetupState::Incoming;
        let update = CallStateTracker::on_call_indicators(&mut l, true, true, CallSetupState::Idle);
        assert_eq!(
            update.changes,
            vec![(IndicatorId::Call, 1), (IndicatorId::CallHeld, 1), (IndicatorId::CallSetup, 0)]
        );
        assert_eq!(update.transition, Some(CallTransition::Activated));
        assert!(l.call_active);
        assert!(l.call_held);
        assert_eq!(l.call_setup, CallSetupState::Idle);
    }

    #[test]
    fn test_cancelled_attempt() {
        let mut l = link();
        CallStateTracker::on_call_indicators(&mut l, false, false, CallSetupState::Dialing);
        let update = CallStateTracker::on_call_indicators(&mut l, false, false, CallSetupState::Idle);
        assert_eq!(update.changes, vec![(IndicatorId::CallSetup, 0)]);
        assert_eq!(update.transition, Some(CallTransition::AttemptCancelled));
    }

    #[test]
    fn test_termination() {
        let mut l = link();
        l.call_active = true;
        let update = CallStateTracker::on_call_indicators(&mut l, false, false, CallSetupState::Idle);
        assert_eq!(update.changes, vec![(IndicatorId::Call, 0)]);
        assert_eq!(update.transition, Some(CallTransition::Terminated));
    }

    #[test]
    fn test_setup_started_and_events() {
        let mut l = link();
        let update = CallStateTracker::on_call_indicators(&mut l, false, false, CallSetupState::Alerting);
        assert_eq!(update.transition, Some(CallTransition::SetupStarted));

        let events = update.into_events(ConnectionHandle(1));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].text().as_deref(), Some("3,3"));
    }
}
