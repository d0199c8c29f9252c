use crate::emission::Pollutants;

/// The emission rate of a pollutant: `idle + speed·v + power·max(a, 0)·v`, in mg/s.
#[derive(Clone, Copy)]
struct Factors {
    idle: f64,
    speed: f64,
    power: f64,
}

impl Factors {
    const fn new(idle: f64, speed: f64, power: f64) -> Self {
        Self { idle, speed, power }
    }

    fn rate(&self, vel: f64, acc: f64) -> f64 {
        self.idle + self.speed * vel + self.power * f64::max(acc, 0.0) * vel
    }
}

/// Rough factors for a petrol passenger car.
const CO: Factors = Factors::new(2.5, 0.4, 1.8);
const NOX: Factors = Factors::new(0.4, 0.05, 0.35);
const HC: Factors = Factors::new(0.15, 0.01, 0.06);
const PMX: Factors = Factors::new(0.02, 0.002, 0.01);
const CO2: Factors = Factors::new(1100.0, 110.0, 520.0);

/// The emission rates of a vehicle at the given velocity and acceleration, in mg/s.
pub(crate) fn emissions(vel: f64, acc: f64) -> Pollutants {
    Pollutants {
        co: CO.rate(vel, acc),
        nox: NOX.rate(vel, acc),
        hc: HC.rate(vel, acc),
        pmx: PMX.rate(vel, acc),
        co2: CO2.rate(vel, acc),
    }
}
