use super::LinkId;
use crate::math::{polyline_length, sample_polyline, Point2d};
use smallvec::SmallVec;

/// The lowest speed used to compute travel times, in m/s.
const MIN_TRAVEL_SPEED: f64 = 0.1;

/// A link represents a single lane of traffic.
#[derive(Clone, Debug)]
pub struct Link {
    /// The link ID.
    id: LinkId,
    /// The name of the link.
    name: String,
    /// The centre line of the link.
    points: Vec<Point2d>,
    /// The length of the centre line in m.
    length: f64,
    /// The links that succeed this one.
    links_out: SmallVec<[LinkId; 4]>,
    /// Speed limit in m/s.
    speed_limit: f64,
    /// The mean speed of the vehicles on the link at the last edge weight update.
    observed_speed: Option<f64>,
    /// Whether vehicles may leave the link at its end.
    control: TrafficControl,
}

/// The attributes of a link.
pub struct LinkAttributes<'a> {
    /// The name of the link.
    pub name: &'a str,
    /// A polyline defining the centre line of the link.
    pub points: &'a [Point2d],
    /// The speed limit in m/s.
    pub speed_limit: f64,
}

/// The signal at the end of a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrafficControl {
    Open,
    Closed,
}

impl TrafficControl {
    /// Interprets one character of a phase state.
    pub fn from_signal(signal: char) -> Self {
        match signal {
            'G' | 'g' | 'O' | 'o' => TrafficControl::Open,
            _ => TrafficControl::Closed,
        }
    }
}

impl Link {
    /// Creates a new link.
    pub(crate) fn new(id: LinkId, attribs: &LinkAttributes) -> Self {
        Self {
            id,
            name: attribs.name.to_owned(),
            points: attribs.points.to_vec(),
            length: polyline_length(attribs.points),
            links_out: SmallVec::new(),
            speed_limit: attribs.speed_limit,
            observed_speed: None,
            control: TrafficControl::Open,
        }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The centre line of the link.
    pub fn points(&self) -> &[Point2d] {
        &self.points
    }

    /// Gets the length of the link in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Gets the speed limit of the link in m/s.
    pub fn speed_limit(&self) -> f64 {
        self.speed_limit
    }

    pub fn control(&self) -> TrafficControl {
        self.control
    }

    /// Gets the links succeeding this one.
    pub fn links_out(&self) -> &[LinkId] {
        &self.links_out
    }

    /// The expected time to drive the link, in s.
    pub fn travel_time(&self) -> f64 {
        let speed = match self.observed_speed {
            Some(observed) => f64::min(observed, self.speed_limit),
            None => self.speed_limit,
        };
        self.length / f64::max(speed, MIN_TRAVEL_SPEED)
    }

    /// Gets the world position at a distance along the link.
    pub fn sample(&self, pos: f64) -> Point2d {
        sample_polyline(&self.points, pos).unwrap_or_else(|| Point2d::new(0.0, 0.0))
    }

    pub(crate) fn add_link_out(&mut self, link_id: LinkId) {
        if !self.links_out.contains(&link_id) {
            self.links_out.push(link_id);
        }
    }

    pub(crate) fn set_speed_limit(&mut self, speed_limit: f64) {
        self.speed_limit = speed_limit;
    }

    pub(crate) fn set_observed_speed(&mut self, speed: Option<f64>) {
        self.observed_speed = speed;
    }

    pub(crate) fn set_control(&mut self, control: TrafficControl) {
        self.control = control;
    }
}
