//! Decides, step by step, which actions apply to each area.
//!
//! An area whose windowed emissions reach the threshold is escalated one action at a
//! time: speed limiting first, then traffic light adjustment (only ever on top of speed
//! limiting), and locking when the area has vehicles inside. As soon as the windowed
//! emissions fall under the threshold, every active action is reverted in the same step.
//! An action that fails part way is rolled back, and retried on the next step.
//!
//! The same threshold is used in both directions, so an area hovering around it may
//! switch back and forth from one step to the next.

use crate::actions;
use crate::config::Config;
use crate::error::ActionError;
use crate::grid::Area;
use crate::simulator::Simulator;
use log::debug;
use std::collections::HashSet;
use std::fmt;

/// The speed related actions applied to an area.
///
/// Traffic lights can only be adjusted in an area whose speed is already limited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpeedState {
    #[default]
    Normal,
    Limited,
    LimitedWithLights,
}

/// The actions applied to an area.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AreaState {
    pub speed: SpeedState,
    pub locked: bool,
    /// A failed activation could not be rolled back, so some lanes or traffic lights
    /// may still differ from their recorded values.
    pub pending_restore: bool,
}

impl AreaState {
    pub fn speed_limited(&self) -> bool {
        self.speed != SpeedState::Normal
    }

    pub fn traffic_lights_adjusted(&self) -> bool {
        self.speed == SpeedState::LimitedWithLights
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    /// Returns true if no action is applied and nothing is left to restore.
    pub fn is_inactive(&self) -> bool {
        !self.speed_limited() && !self.locked && !self.pending_restore
    }
}

/// An action on an area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    SpeedLimit,
    TrafficLights,
    Lock,
}

/// Something the policy did to an area.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionEvent {
    /// An action was applied; `factor` is the configured factor (or speed, for locks).
    Activated {
        area: String,
        action: Action,
        factor: f64,
    },
    /// An action was reverted.
    Reversed { area: String, action: Action },
    /// Applying (or reverting) an action failed; it will be retried on the next step.
    Failed {
        area: String,
        action: Action,
        reverting: bool,
        error: ActionError,
    },
}

impl ActionEvent {
    pub fn area(&self) -> &str {
        match self {
            ActionEvent::Activated { area, .. }
            | ActionEvent::Reversed { area, .. }
            | ActionEvent::Failed { area, .. } => area,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            ActionEvent::Activated { action, .. }
            | ActionEvent::Reversed { action, .. }
            | ActionEvent::Failed { action, .. } => *action,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ActionEvent::Failed { .. })
    }
}

impl fmt::Display for ActionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Action::*;
        match self {
            ActionEvent::Activated {
                area,
                action: SpeedLimit,
                factor,
            } => write!(f, "Action - Max speed into {} set to {}%", area, factor * 100.0),
            ActionEvent::Activated {
                area,
                action: TrafficLights,
                factor,
            } => write!(
                f,
                "Action - Traffic light phases into {} set to {}% of their duration",
                area,
                factor * 100.0
            ),
            ActionEvent::Activated {
                area,
                action: Lock,
                factor,
            } => write!(f, "Action - {} locked (max speed {} m/s)", area, factor),
            ActionEvent::Reversed {
                area,
                action: SpeedLimit,
            } => write!(f, "Action reversed - Max speed into {} restored", area),
            ActionEvent::Reversed {
                area,
                action: TrafficLights,
            } => write!(f, "Action reversed - Traffic lights into {} restored", area),
            ActionEvent::Reversed { area, action: Lock } => {
                write!(f, "Action reversed - {} unlocked", area)
            }
            ActionEvent::Failed {
                area,
                action,
                reverting,
                error,
            } => write!(
                f,
                "Could not {} {:?} into {}: {}",
                if *reverting { "revert" } else { "apply" },
                action,
                area,
                error
            ),
        }
    }
}

/// The thresholds and actions of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct Policy {
    threshold: f64,
    window: usize,
    /// The speed factor, if speed limiting is enabled.
    speed_factor: Option<f64>,
    /// The phase duration factor, if traffic light adjustment is enabled.
    lights_factor: Option<f64>,
    /// The lane speed of locked areas, if locking is enabled.
    lock_speed: Option<f64>,
}

impl Policy {
    /// Creates the policy described by the configuration. In without-actions mode
    /// no action is ever enabled.
    pub fn new(config: &Config) -> Self {
        let enabled = |flag: bool, value: f64| (flag && !config.without_actions).then(|| value);
        Self {
            threshold: config.emissions_threshold,
            window: config.window_size,
            speed_factor: enabled(config.limit_speed, config.speed_factor),
            lights_factor: enabled(config.adjust_traffic_lights, config.traffic_lights_factor),
            lock_speed: enabled(config.lock_area, config.lock_speed),
        }
    }

    /// The emissions of the area summed over the window.
    pub fn windowed_emissions(&self, area: &Area) -> f64 {
        area.emissions().window_sum(self.window)
    }

    pub fn is_over_threshold(&self, area: &Area) -> bool {
        self.windowed_emissions(area) >= self.threshold
    }

    /// Applies or reverts the actions of an area according to its windowed emissions.
    ///
    /// `occupants` are the IDs of the vehicles currently in the area. Vehicles removed
    /// from the simulation by a lock are added to `removed`.
    pub fn evaluate<S: Simulator + ?Sized>(
        &self,
        area: &mut Area,
        occupants: &[&str],
        removed: &mut HashSet<String>,
        sim: &mut S,
    ) -> Vec<ActionEvent> {
        let mut events = vec![];
        if self.is_over_threshold(area) {
            self.escalate(area, occupants, removed, sim, &mut events);
        } else if !area.state.is_inactive() {
            self.revert(area, sim, &mut events);
        }
        events
    }

    fn escalate<S: Simulator + ?Sized>(
        &self,
        area: &mut Area,
        occupants: &[&str],
        removed: &mut HashSet<String>,
        sim: &mut S,
        events: &mut Vec<ActionEvent>,
    ) {
        if let Some(factor) = self.speed_factor {
            if area.state.speed == SpeedState::Normal {
                // A locked area is already slower than a speed limited one
                let result = match area.state.locked {
                    true => Ok(()),
                    false => actions::limit_speed(sim, area.lanes(), factor),
                };
                match result {
                    Ok(()) => {
                        area.state.speed = SpeedState::Limited;
                        if let Err(err) = actions::highlight_area(sim, area.name()) {
                            debug!("Could not highlight {}: {}", area.name(), err);
                        }
                        events.push(activated(area, Action::SpeedLimit, factor));
                    }
                    Err(error) => {
                        events.push(failed(area, Action::SpeedLimit, false, error));
                        self.roll_back_lanes(area, sim);
                    }
                }
            }
        }

        if let Some(factor) = self.lights_factor {
            if area.state.speed == SpeedState::Limited {
                match actions::adjust_traffic_lights(sim, area.traffic_lights(), factor) {
                    Ok(()) => {
                        area.state.speed = SpeedState::LimitedWithLights;
                        events.push(activated(area, Action::TrafficLights, factor));
                    }
                    Err(error) => {
                        events.push(failed(area, Action::TrafficLights, false, error));
                        if let Err(err) = actions::restore_traffic_lights(sim, area.traffic_lights()) {
                            debug!(
                                "Could not roll back the traffic lights of {}: {}",
                                area.name(),
                                err
                            );
                            area.state.pending_restore = true;
                        }
                    }
                }
            }
        }

        if let Some(lock_speed) = self.lock_speed {
            if !area.state.locked && !occupants.is_empty() {
                match actions::lock_area(sim, area.lanes(), lock_speed, occupants, removed) {
                    Ok(()) => {
                        area.state.locked = true;
                        events.push(activated(area, Action::Lock, lock_speed));
                    }
                    Err(error) => {
                        events.push(failed(area, Action::Lock, false, error));
                        self.roll_back_lanes(area, sim);
                    }
                }
            }
        }
    }

    /// Returns the lanes of an area to the speed its current state calls for, after an
    /// activation failed part way.
    fn roll_back_lanes<S: Simulator + ?Sized>(&self, area: &mut Area, sim: &mut S) {
        // Both activations touching lanes run on an unlocked area
        let result = match (area.state.speed_limited(), self.speed_factor) {
            (true, Some(factor)) => actions::limit_speed(sim, area.lanes(), factor),
            _ => actions::restore_speed(sim, area.lanes()),
        };
        if let Err(err) = result {
            debug!("Could not roll back the lanes of {}: {}", area.name(), err);
            area.state.pending_restore = true;
        }
    }

    fn revert<S: Simulator + ?Sized>(
        &self,
        area: &mut Area,
        sim: &mut S,
        events: &mut Vec<ActionEvent>,
    ) {
        let adjusted = area.state.traffic_lights_adjusted();
        if adjusted || area.state.pending_restore {
            match actions::restore_traffic_lights(sim, area.traffic_lights()) {
                Ok(()) if adjusted => {
                    area.state.speed = SpeedState::Limited;
                    events.push(reversed(area, Action::TrafficLights));
                }
                Ok(()) => {}
                Err(error) => {
                    // Speed limiting stays in place while the lights are adjusted
                    match adjusted {
                        true => events.push(failed(area, Action::TrafficLights, true, error)),
                        false => debug!(
                            "Could not restore the traffic lights of {}: {}",
                            area.name(),
                            error
                        ),
                    }
                    return;
                }
            }
        }

        // Restoring the initial lane speeds lifts both the speed limit and the lock
        let lifted = [
            (area.state.speed_limited(), Action::SpeedLimit),
            (area.state.locked, Action::Lock),
        ];
        match actions::restore_speed(sim, area.lanes()) {
            Ok(()) => {
                area.state = AreaState::default();
                for (_, action) in lifted.iter().filter(|(active, _)| *active) {
                    events.push(reversed(area, *action));
                }
                if let Err(err) = actions::reset_area_color(sim, area.name()) {
                    debug!("Could not reset the colour of {}: {}", area.name(), err);
                }
            }
            Err(error) => {
                for (_, action) in lifted.iter().filter(|(active, _)| *active) {
                    events.push(failed(area, *action, true, error.clone()));
                }
            }
        }
    }
}

fn activated(area: &Area, action: Action, factor: f64) -> ActionEvent {
    ActionEvent::Activated {
        area: area.name().to_owned(),
        action,
        factor,
    }
}

fn reversed(area: &Area, action: Action) -> ActionEvent {
    ActionEvent::Reversed {
        area: area.name().to_owned(),
        action,
    }
}

fn failed(area: &Area, action: Action, reverting: bool, error: ActionError) -> ActionEvent {
    ActionEvent::Failed {
        area: area.name().to_owned(),
        action,
        reverting,
        error,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lights_imply_speed_limit() {
        let state = AreaState {
            speed: SpeedState::LimitedWithLights,
            locked: false,
            pending_restore: false,
        };
        assert!(state.speed_limited());
        assert!(state.traffic_lights_adjusted());
        assert!(!state.is_inactive());
        assert!(AreaState::default().is_inactive());
    }

    #[test]
    fn pending_restore_keeps_area_active() {
        let state = AreaState {
            pending_restore: true,
            ..Default::default()
        };
        assert!(!state.speed_limited());
        assert!(!state.is_inactive());
    }

    #[test]
    fn without_actions_disables_policy() {
        let config = Config {
            without_actions: true,
            lock_area: true,
            ..Default::default()
        };
        let policy = Policy::new(&config);
        assert_eq!(policy.speed_factor, None);
        assert_eq!(policy.lights_factor, None);
        assert_eq!(policy.lock_speed, None);
    }

    #[test]
    fn event_messages_name_the_area() {
        let event = ActionEvent::Activated {
            area: "Area (1,2)".into(),
            action: Action::SpeedLimit,
            factor: 0.5,
        };
        assert_eq!(event.to_string(), "Action - Max speed into Area (1,2) set to 50%");
        assert_eq!(event.area(), "Area (1,2)");
        assert!(!event.is_failure());
    }
}
