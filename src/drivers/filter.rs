//! Online simulation of the charge-amplifier model that turns sensor voltage
//! back into force.
//!
//! The amplifier gives `H(s) = (Rf·Cf·s + 1) / (Rf·d33·s)`. It is simulated in
//! state-space form with a first-order hold on the input, so successive chunks
//! stitched with their returned [`FilterState`] reproduce a single long run.
use crate::config::CircuitConfig;
use crate::drivers::AcquisitionError;
/// First order transfer function `(b1·s + b0) / (a1·s + a0)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransferFunction {
    pub numerator: [f64; 2],
    pub denominator: [f64; 2],
}
impl TransferFunction {
    pub fn new(numerator: [f64; 2], denominator: [f64; 2]) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
    pub fn from_circuit(circuit: &CircuitConfig) -> Self {
        Self::new(
            [circuit.rf * circuit.cf, 1.0],
            [circuit.rf * circuit.d33, 0.0],
        )
    }
    fn realize(&self) -> Result<StateSpace, AcquisitionError> {
        let [b1, b0] = self.numerator;
        let [a1, a0] = self.denominator;
        if a1 == 0.0 || !a1.is_finite() {
            return Err(AcquisitionError::InvalidSystem);
        }
        let a = -a0 / a1;
        Ok(StateSpace {
            a,
            c: (b0 + b1 * a) / a1,
            d: b1 / a1,
        })
    }
}
/// Scalar realisation with `B = 1`.
#[derive(Clone, Copy, Debug)]
struct StateSpace {
    a: f64,
    c: f64,
    d: f64,
}
impl StateSpace {
    fn output(&self, x: f64, u: f64) -> f64 {
        self.c * x + self.d * u
    }
    /// State after `h` seconds with the input ramping linearly from `u0` to `u1`.
    fn step(&self, x: f64, u0: f64, u1: f64, h: f64) -> f64 {
        let ah = self.a * h;
        // m0 = ∫ e^{As} ds, ms = ∫ s·e^{As} ds, both over [0, h]
        let (phi, m0, ms) = if ah.abs() < 1e-3 {
            let ah2 = ah * ah;
            (
                1.0 + ah + ah2 / 2.0 + ah2 * ah / 6.0,
                h * (1.0 + ah / 2.0 + ah2 / 6.0),
                h * h * (0.5 + ah / 3.0 + ah2 / 8.0),
            )
        } else {
            let phi = ah.exp();
            let a2 = self.a * self.a;
            (phi, (phi - 1.0) / self.a, (phi * (ah - 1.0) + 1.0) / a2)
        };
        let m1 = m0 - ms / h;
        phi * x + (m0 - m1) * u0 + m1 * u1
    }
}
/// Internal state carried between [`LtiSystem::advance`] calls.
///
/// `last` holds the time and input of the final sample already consumed; it is
/// what lets the gap between two chunks be integrated.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FilterState {
    pub x: f64,
    pub last: Option<(f64, f64)>,
}
impl FilterState {
    pub fn is_cold(&self) -> bool {
        self.last.is_none() && self.x == 0.0
    }
}
#[derive(Clone, Copy, Debug)]
pub struct LtiSystem {
    ss: StateSpace,
}
impl LtiSystem {
    pub fn new(tf: TransferFunction) -> Result<Self, AcquisitionError> {
        Ok(Self { ss: tf.realize()? })
    }
    /// Simulates `inputs` sampled every `dt` seconds, continuing from `prior`.
    ///
    /// A cold `prior` puts the first sample at t = 0; a warm one places it `dt`
    /// after the last sample of the previous call.
    pub fn advance(
        &self,
        inputs: &[f64],
        dt: f64,
        prior: FilterState,
    ) -> Result<(Vec<f64>, FilterState), AcquisitionError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(AcquisitionError::InvalidSampleInterval);
        }
        let start = prior.last.map_or(0.0, |(t, _)| t + dt);
        let times: Vec<f64> = (0..inputs.len()).map(|i| start + i as f64 * dt).collect();
        self.advance_at(inputs, &times, prior)
    }
    /// Simulates `inputs` at absolute, strictly increasing `times`.
    pub fn advance_at(
        &self,
        inputs: &[f64],
        times: &[f64],
        prior: FilterState,
    ) -> Result<(Vec<f64>, FilterState), AcquisitionError> {
        if inputs.len() != times.len() {
            return Err(AcquisitionError::Dimension {
                expected: inputs.len(),
                actual: times.len(),
            });
        }
        let mut state = prior;
        let mut outputs = Vec::with_capacity(inputs.len());
        for (&u, &t) in inputs.iter().zip(times) {
            if let Some((t0, u0)) = state.last {
                let h = t - t0;
                if !(h.is_finite() && h > 0.0) {
                    return Err(AcquisitionError::InvalidSampleInterval);
                }
                state.x = self.ss.step(state.x, u0, u, h);
            }
            state.last = Some((t, u));
            outputs.push(self.ss.output(state.x, u));
        }
        Ok((outputs, state))
    }
}
/// [`LtiSystem`] that threads its own state between chunks.
#[derive(Clone, Debug)]
pub struct StreamingLtiFilter {
    system: LtiSystem,
    sample_interval: f64,
    state: FilterState,
}
impl StreamingLtiFilter {
    pub fn new(tf: TransferFunction, sample_rate_hz: f64) -> Result<Self, AcquisitionError> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(AcquisitionError::InvalidSampleInterval);
        }
        Ok(Self {
            system: LtiSystem::new(tf)?,
            sample_interval: 1.0 / sample_rate_hz,
            state: FilterState::default(),
        })
    }
    pub fn from_circuit(circuit: &CircuitConfig) -> Result<Self, AcquisitionError> {
        Self::new(TransferFunction::from_circuit(circuit), circuit.sample_rate_hz)
    }
    pub fn process(&mut self, chunk: &[f64]) -> Result<Vec<f64>, AcquisitionError> {
        let (out, state) = self
            .system
            .advance(chunk, self.sample_interval, self.state)?;
        self.state = state;
        Ok(out)
    }
    pub fn state(&self) -> FilterState {
        self.state
    }
    pub fn reset(&mut self) {
        self.state = FilterState::default();
    }
}
