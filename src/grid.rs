use crate::emission::VehicleSample;
use crate::error::ConfigError;
use crate::math::{Point2d, Rect};
use crate::network::{Lane, TrafficLight};
use crate::policy::AreaState;
use crate::window::EmissionSeries;
use std::rc::Rc;

/// The world rectangle divided into `cells × cells` areas.
#[derive(Clone, Debug)]
pub struct Grid {
    bounds: Rect,
    cells: usize,
    /// The areas, column-major: area `(i, j)` is at index `i * cells + j`.
    areas: Vec<Area>,
}

/// A rectangular cell of the grid.
#[derive(Clone, Debug)]
pub struct Area {
    name: String,
    rect: Rect,
    /// The lanes crossing the area.
    lanes: Vec<Rc<Lane>>,
    /// The traffic lights controlling at least one of the lanes.
    traffic_lights: Vec<Rc<TrafficLight>>,
    /// The emissions in the area, one entry per step.
    emissions: EmissionSeries,
    /// The actions currently applied to the area.
    pub(crate) state: AreaState,
}

impl Grid {
    /// Divides `bounds` into `cells × cells` areas of equal size.
    ///
    /// Area `(i, j)` is the `i`-th along the x-axis and the `j`-th along the y-axis.
    pub fn new(bounds: Rect, cells: usize) -> Result<Self, ConfigError> {
        if cells == 0 {
            return Err(ConfigError::InvalidGridSize);
        }

        let width = bounds.width() / cells as f64;
        let height = bounds.height() / cells as f64;
        // The last edge is pinned to the bounds so the areas tile them exactly
        let edge = |start: f64, end: f64, size: f64, k: usize| {
            if k == cells {
                end
            } else {
                start + k as f64 * size
            }
        };

        let mut areas = Vec::with_capacity(cells * cells);
        for i in 0..cells {
            for j in 0..cells {
                let min = Point2d::new(
                    edge(bounds.x.min, bounds.x.max, width, i),
                    edge(bounds.y.min, bounds.y.max, height, j),
                );
                let max = Point2d::new(
                    edge(bounds.x.min, bounds.x.max, width, i + 1),
                    edge(bounds.y.min, bounds.y.max, height, j + 1),
                );
                areas.push(Area::new(format!("Area ({},{})", i, j), Rect::new(min, max)));
            }
        }

        Ok(Self {
            bounds,
            cells,
            areas,
        })
    }

    /// The rectangle covered by the grid.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// The number of cells along each axis.
    pub fn cells(&self) -> usize {
        self.cells
    }

    /// The total number of areas.
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Gets the area at column `i` and row `j`.
    pub fn area(&self, i: usize, j: usize) -> Option<&Area> {
        if i < self.cells && j < self.cells {
            self.areas.get(i * self.cells + j)
        } else {
            None
        }
    }

    pub fn area_by_name(&self, name: &str) -> Option<&Area> {
        self.areas.iter().find(|area| area.name == name)
    }

    /// Iterates over the areas in grid order.
    pub fn areas(&self) -> std::slice::Iter<'_, Area> {
        self.areas.iter()
    }

    pub(crate) fn areas_mut(&mut self) -> impl Iterator<Item = &mut Area> {
        self.areas.iter_mut()
    }

    /// The emissions recorded over the whole run, summed over every area.
    pub fn total_emissions(&self) -> f64 {
        self.areas.iter().map(|area| area.emissions.total()).sum()
    }
}

impl Area {
    fn new(name: String, rect: Rect) -> Self {
        Self {
            name,
            rect,
            lanes: vec![],
            traffic_lights: vec![],
            emissions: EmissionSeries::new(),
            state: AreaState::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    pub fn lanes(&self) -> &[Rc<Lane>] {
        &self.lanes
    }

    pub fn traffic_lights(&self) -> &[Rc<TrafficLight>] {
        &self.traffic_lights
    }

    pub fn emissions(&self) -> &EmissionSeries {
        &self.emissions
    }

    /// The actions currently applied to the area.
    pub fn state(&self) -> AreaState {
        self.state
    }

    pub(crate) fn add_lane(&mut self, lane: Rc<Lane>) {
        self.lanes.push(lane);
    }

    pub(crate) fn has_traffic_light(&self, id: &str) -> bool {
        self.traffic_lights.iter().any(|tl| tl.id == id)
    }

    pub(crate) fn add_traffic_light(&mut self, light: Rc<TrafficLight>) {
        self.traffic_lights.push(light);
    }

    /// Returns true if the vehicle is inside the area or on its boundary.
    pub fn contains(&self, vehicle: &VehicleSample) -> bool {
        self.rect.contains(vehicle.pos)
    }

    /// The IDs of the vehicles inside the area.
    pub fn occupants<'a>(&self, vehicles: &'a [VehicleSample]) -> Vec<&'a str> {
        vehicles
            .iter()
            .filter(|v| self.contains(v))
            .map(|v| v.id.as_str())
            .collect()
    }

    /// Sums the emissions of the vehicles inside the area and appends the sum
    /// as the entry of the current step.
    pub(crate) fn record_step(&mut self, vehicles: &[VehicleSample]) -> f64 {
        let sum = vehicles
            .iter()
            .filter(|v| self.contains(v))
            .map(|v| v.emissions)
            .sum();
        self.emissions.push(sum);
        sum
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use itertools::Itertools;

    fn sample(id: &str, x: f64, y: f64, emissions: f64) -> VehicleSample {
        VehicleSample {
            id: id.into(),
            pos: Point2d::new(x, y),
            emissions,
        }
    }

    #[test]
    fn zero_cells_is_rejected() {
        let bounds = Rect::new(Point2d::new(0.0, 0.0), Point2d::new(1.0, 1.0));
        assert_eq!(Grid::new(bounds, 0).unwrap_err(), ConfigError::InvalidGridSize);
    }

    #[test]
    fn areas_tile_the_bounds() {
        let bounds = Rect::new(Point2d::new(-120.0, 35.5), Point2d::new(877.3, 410.0));
        for cells in [1, 2, 3, 7] {
            let grid = Grid::new(bounds, cells).unwrap();
            assert_eq!(grid.len(), cells * cells);

            let covered: f64 = grid.areas().map(|a| a.rect().width() * a.rect().height()).sum();
            assert_approx_eq!(covered, bounds.width() * bounds.height(), 1e-6);

            for (a, b) in grid.areas().tuple_combinations() {
                assert!(!a.rect().overlaps(b.rect()), "{} overlaps {}", a.name(), b.name());
            }

            let corner = grid.area(cells - 1, cells - 1).unwrap();
            assert_eq!(corner.rect().max(), bounds.max());
            assert_eq!(grid.area(0, 0).unwrap().rect().min(), bounds.min());
        }
    }

    #[test]
    fn area_names_are_unique_and_addressable() {
        let bounds = Rect::new(Point2d::new(0.0, 0.0), Point2d::new(100.0, 50.0));
        let grid = Grid::new(bounds, 4).unwrap();
        assert!(grid.areas().map(|a| a.name()).all_unique());

        let area = grid.area(3, 1).unwrap();
        assert_eq!(area.name(), "Area (3,1)");
        assert_eq!(area.rect().min(), Point2d::new(75.0, 12.5));
        assert_eq!(area.rect().max(), Point2d::new(100.0, 25.0));
        assert!(grid.area(4, 0).is_none());
        assert_eq!(grid.area_by_name("Area (3,1)").unwrap().rect(), area.rect());
    }

    #[test]
    fn record_step_counts_boundary_vehicles() {
        let bounds = Rect::new(Point2d::new(0.0, 0.0), Point2d::new(10.0, 10.0));
        let mut grid = Grid::new(bounds, 2).unwrap();
        let vehicles = [
            sample("a", 1.0, 1.0, 3.0),
            sample("b", 5.0, 2.0, 4.0),
            sample("c", 9.0, 9.0, 100.0),
        ];
        let sums = grid
            .areas_mut()
            .map(|area| area.record_step(&vehicles))
            .collect::<Vec<_>>();
        // "b" lies on the boundary between the two lower areas
        assert_eq!(sums, vec![7.0, 0.0, 4.0, 100.0]);
        assert_eq!(grid.area(0, 0).unwrap().occupants(&vehicles), vec!["a", "b"]);
        assert_approx_eq!(grid.total_emissions(), 111.0);
    }
}
