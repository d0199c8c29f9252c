use self::emissions::emissions;
use super::{LinkId, LinkSet, TrafficControl, VehicleId};
use crate::emission::Pollutants;
use crate::math::Point2d;

mod emissions;

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID
    id: VehicleId,
    name: String,
    /// The maximum acceleration of the vehicle, in m/s^2.
    max_acc: f64,
    /// The comfortable deceleration of the vehicle, a negative number in m/s^2.
    comf_dec: f64,
    /// The factor applied to the speed limit to get the desired speed.
    velocity_adjust: f64,
    /// The links left to drive, starting with the current one.
    route: Vec<LinkId>,
    /// The link the vehicle is heading to.
    destination: LinkId,
    /// The longitudinal position along the current link, in m.
    pos: f64,
    /// The velocity in m/s.
    vel: f64,
    /// The acceleration in m/s^2.
    acc: f64,
    /// The world space coordinates of the vehicle.
    world_pos: Point2d,
    /// The pollutants emitted during the last frame.
    emissions: Pollutants,
}

/// The attributes of a simulated vehicle.
#[derive(Clone, Copy, Debug)]
pub struct VehicleAttributes {
    /// The maximum acceleration of the vehicle, in m/s^2.
    pub max_acc: f64,
    /// The comfortable deceleration of the vehicle, a negative number in m/s^2.
    pub comf_dec: f64,
}

impl Default for VehicleAttributes {
    fn default() -> Self {
        Self {
            max_acc: 2.6,
            comf_dec: -4.5,
        }
    }
}

impl Vehicle {
    /// Creates a new vehicle at the start of the first link of `route`.
    pub(crate) fn new(
        id: VehicleId,
        name: &str,
        attributes: &VehicleAttributes,
        route: Vec<LinkId>,
    ) -> Self {
        let destination = route.last().copied().unwrap_or_default();
        Self {
            id,
            name: name.to_owned(),
            max_acc: attributes.max_acc,
            comf_dec: attributes.comf_dec,
            velocity_adjust: 1.0,
            route,
            destination,
            pos: 0.0,
            vel: 0.0,
            acc: 0.0,
            world_pos: Point2d::new(0.0, 0.0),
            emissions: Default::default(),
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the ID of the link the vehicle is on.
    pub fn link_id(&self) -> LinkId {
        self.route[0]
    }

    /// The links left to drive, starting with the current one.
    pub fn route(&self) -> &[LinkId] {
        &self.route
    }

    pub fn destination(&self) -> LinkId {
        self.destination
    }

    /// The longitudinal position along the current link, in m.
    pub fn pos(&self) -> f64 {
        self.pos
    }

    /// The velocity in m/s.
    pub fn vel(&self) -> f64 {
        self.vel
    }

    /// The acceleration in m/s^2.
    pub fn acc(&self) -> f64 {
        self.acc
    }

    /// The world space coordinates of the vehicle.
    pub fn position(&self) -> Point2d {
        self.world_pos
    }

    /// The pollutants emitted during the last frame.
    pub fn emissions(&self) -> Pollutants {
        self.emissions
    }

    pub(crate) fn set_velocity_adjust(&mut self, factor: f64) {
        self.velocity_adjust = factor;
    }

    /// Replaces the route. Its first link must be the current one.
    pub(crate) fn set_route(&mut self, route: Vec<LinkId>) {
        if route.first() == Some(&self.route[0]) {
            self.route = route;
        }
    }

    /// Chooses the acceleration for the next frame: towards the desired speed,
    /// and stopping before the end of the link if it is closed.
    pub(crate) fn update_acceleration(&mut self, links: &LinkSet, dt: f64) {
        let link = &links[self.route[0]];
        let target = link.speed_limit() * self.velocity_adjust;
        let mut acc = ((target - self.vel) / dt).clamp(self.comf_dec, self.max_acc);

        if self.route.len() > 1 && link.control() == TrafficControl::Closed {
            let dist = f64::max(link.length() - self.pos, 0.0);
            // The speed from which a comfortable stop within `dist` is still possible
            let stop_vel = (2.0 * -self.comf_dec * dist).sqrt();
            acc = f64::min(acc, (stop_vel - self.vel) / dt);
        }

        self.acc = acc;
    }

    /// Integrates the velocity and position, and computes the emissions of the frame.
    pub(crate) fn integrate(&mut self, dt: f64) {
        self.vel = f64::max(self.vel + self.acc * dt, 0.0);
        self.pos += self.vel * dt;
        self.emissions = emissions(self.vel, self.acc).scaled(dt);
    }

    /// Moves the vehicle onto the next links of its route if it passed the end of
    /// the current one. Returns true if the vehicle reached the end of its route.
    pub(crate) fn advance(&mut self, links: &LinkSet) -> bool {
        loop {
            let link = &links[self.route[0]];
            if self.pos < link.length() {
                return false;
            }
            if self.route.len() == 1 {
                return true;
            }
            if link.control() == TrafficControl::Closed {
                self.pos = link.length();
                self.vel = 0.0;
                return false;
            }
            self.pos -= link.length();
            self.route.remove(0);
        }
    }

    /// Updates the world coordinates of the vehicle.
    pub(crate) fn update_coords(&mut self, links: &LinkSet) {
        self.world_pos = links[self.route[0]].sample(self.pos);
    }
}
