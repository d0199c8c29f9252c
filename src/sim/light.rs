use super::{LinkId, TrafficControl, TrafficLightId};
use crate::network::Logic;

/// A fixed-time signal controller.
#[derive(Clone, Debug)]
pub struct TrafficLight {
    /// The traffic light ID.
    id: TrafficLightId,
    name: String,
    /// The links controlled, in signal index order.
    controlled: Vec<LinkId>,
    /// The signal programs.
    logics: Vec<Logic>,
    /// The index of the running program.
    active: usize,
    /// The index of the current phase of the running program.
    phase: usize,
    /// The time since the current phase was entered, in s.
    since: f64,
}

impl TrafficLight {
    pub(crate) fn new(
        id: TrafficLightId,
        name: &str,
        controlled: Vec<LinkId>,
        logics: Vec<Logic>,
    ) -> Self {
        Self {
            id,
            name: name.to_owned(),
            controlled,
            logics,
            active: 0,
            phase: 0,
            since: 0.0,
        }
    }

    pub fn id(&self) -> TrafficLightId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The links controlled, in signal index order.
    pub fn controlled_links(&self) -> &[LinkId] {
        &self.controlled
    }

    pub fn logics(&self) -> &[Logic] {
        &self.logics
    }

    /// The running program, if there is one.
    pub fn active_logic(&self) -> Option<&Logic> {
        self.logics.get(self.active)
    }

    /// The index of the current phase of the running program.
    pub fn phase_index(&self) -> usize {
        self.phase
    }

    /// Advances the signal timing by `dt` seconds.
    pub(crate) fn step(&mut self, dt: f64) {
        let Some(logic) = self.logics.get(self.active) else {
            return;
        };
        let num_phases = logic.phases.len();
        if num_phases == 0 {
            return;
        }
        self.since += dt;
        // At most one cycle per step, so a program of zero length phases cannot stall
        for _ in 0..num_phases {
            let duration = logic.phases[self.phase].duration;
            if self.since < duration {
                break;
            }
            self.since -= duration;
            self.phase = (self.phase + 1) % num_phases;
        }
    }

    /// Gets the control at the end of each controlled link.
    pub fn get_states(&self) -> impl Iterator<Item = (LinkId, TrafficControl)> + '_ {
        let state = self
            .active_logic()
            .and_then(|logic| logic.phases.get(self.phase))
            .map(|phase| phase.state.as_str())
            .unwrap_or("");
        self.controlled
            .iter()
            .copied()
            .zip(state.chars().map(TrafficControl::from_signal))
    }

    /// Replaces the program with the same ID, or adds it, and runs it.
    pub(crate) fn set_program(&mut self, logic: Logic) -> Result<(), String> {
        if logic.phases.is_empty() {
            return Err("program has no phases".into());
        }
        if let Some(phase) = logic
            .phases
            .iter()
            .find(|p| p.state.chars().count() != self.controlled.len())
        {
            return Err(format!(
                "phase state '{}' does not match the {} controlled links",
                phase.state,
                self.controlled.len()
            ));
        }

        match self
            .logics
            .iter()
            .position(|l| l.program_id == logic.program_id)
        {
            Some(idx) => {
                self.logics[idx] = logic;
                self.active = idx;
            }
            None => {
                self.logics.push(logic);
                self.active = self.logics.len() - 1;
            }
        }

        let phases = &self.logics[self.active].phases;
        self.phase = usize::min(self.phase, phases.len() - 1);
        self.since = f64::min(self.since, phases[self.phase].duration);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::network::Phase;
    use slotmap::{Key, KeyData};

    fn light() -> TrafficLight {
        let links = [1, 2].map(|i| LinkId::from(KeyData::from_ffi(i)));
        let logic = Logic {
            program_id: "0".into(),
            phases: vec![Phase::new(10.0, "Gr"), Phase::new(3.0, "yr"), Phase::new(10.0, "rG")],
        };
        TrafficLight::new(TrafficLightId::null(), "tl", links.to_vec(), vec![logic])
    }

    fn controls(light: &TrafficLight) -> Vec<TrafficControl> {
        light.get_states().map(|(_, c)| c).collect()
    }

    #[test]
    fn phases_cycle() {
        use TrafficControl::*;
        let mut light = light();
        assert_eq!(controls(&light), vec![Open, Closed]);
        for _ in 0..10 {
            light.step(1.0);
        }
        assert_eq!(light.phase_index(), 1);
        assert_eq!(controls(&light), vec![Closed, Closed]);
        for _ in 0..3 {
            light.step(1.0);
        }
        assert_eq!(controls(&light), vec![Closed, Open]);
        for _ in 0..10 {
            light.step(1.0);
        }
        assert_eq!(light.phase_index(), 0);
    }

    #[test]
    fn set_program_replaces_same_id() {
        let mut light = light();
        let shorter = light.logics()[0].scaled(0.5);
        light.set_program(shorter).unwrap();
        assert_eq!(light.logics().len(), 1);
        assert_eq!(light.active_logic().unwrap().cycle_time(), 11.5);

        let bad = Logic {
            program_id: "1".into(),
            phases: vec![Phase::new(5.0, "GGG")],
        };
        assert!(light.set_program(bad).is_err());
        assert_eq!(light.logics().len(), 1);
    }
}
