// ── Firing program domain types ──

use serde::{Deserialize, Serialize};

/// Name given to programs created without one.
pub const DEFAULT_PROGRAM_NAME: &str = "New program";

/// One segment of a firing schedule: move from `t_start` to `t_end`
/// over `duration` seconds. Equal endpoints make it a hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Step {
    pub t_start: f64,
    pub t_end: f64,
    /// Seconds. Zero is legal and means "jump straight to `t_end`".
    pub duration: f64,
}

impl Step {
    pub const fn new(t_start: f64, t_end: f64, duration: f64) -> Self {
        Self {
            t_start,
            t_end,
            duration,
        }
    }

    /// Ramp rate in degrees per hour, or `None` for a zero-length step.
    pub fn rate_per_hour(&self) -> Option<f64> {
        (self.duration > 0.0).then(|| (self.t_end - self.t_start) * 3600.0 / self.duration)
    }
}

/// A named, ordered, never-empty list of [`Step`]s.
///
/// Every constructor (including deserialization) substitutes a single
/// default step when given none, and no mutator can remove the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawProgram")]
pub struct Program {
    name: String,
    steps: Vec<Step>,
}

#[derive(Deserialize)]
struct RawProgram {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    steps: Option<Vec<Step>>,
}

impl From<RawProgram> for Program {
    fn from(raw: RawProgram) -> Self {
        Self::new(
            raw.name.unwrap_or_else(|| DEFAULT_PROGRAM_NAME.into()),
            raw.steps.unwrap_or_default(),
        )
    }
}

impl Program {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        let steps = if steps.is_empty() {
            vec![Step::default()]
        } else {
            steps
        };
        Self {
            name: name.into(),
            steps,
        }
    }

    /// A program with one default step.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn with_step(name: impl Into<String>, step: Step) -> Self {
        Self::new(name, vec![step])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_mut(&mut self, index: usize) -> Option<&mut Step> {
        self.steps.get_mut(index)
    }

    pub fn push_step(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Insert at `index`, clamped to the end of the list.
    pub fn insert_step(&mut self, index: usize, step: Step) {
        let index = index.min(self.steps.len());
        self.steps.insert(index, step);
    }

    /// Remove the step at `index`. Refuses (returns `None`) when it is the
    /// only step left or the index is out of range.
    pub fn remove_step(&mut self, index: usize) -> Option<Step> {
        if self.steps.len() <= 1 || index >= self.steps.len() {
            return None;
        }
        Some(self.steps.remove(index))
    }

    pub fn replace_steps(&mut self, steps: Vec<Step>) {
        *self = Self::new(std::mem::take(&mut self.name), steps);
    }

    /// Sum of all step durations, in seconds.
    pub fn total_duration(&self) -> f64 {
        self.steps.iter().map(|s| s.duration).sum()
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::named(DEFAULT_PROGRAM_NAME)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_step_list_is_normalized() {
        let program = Program::new("Empty", Vec::new());
        assert_eq!(program.steps(), &[Step::default()]);

        assert_eq!(Program::named("x").steps().len(), 1);
        assert_eq!(Program::default().name(), DEFAULT_PROGRAM_NAME);
    }

    #[test]
    fn deserialization_never_yields_an_empty_program() {
        let cases = [
            r#"{"name":"A"}"#,
            r#"{"name":"A","steps":[]}"#,
            r#"{"name":"A","steps":null}"#,
            r"{}",
        ];
        for text in cases {
            let program: Program = serde_json::from_str(text).unwrap();
            assert_eq!(program.steps().len(), 1, "{text}");
        }

        let program: Program = serde_json::from_str(r"{}").unwrap();
        assert_eq!(program.name(), DEFAULT_PROGRAM_NAME);
    }

    #[test]
    fn last_step_cannot_be_removed() {
        let mut program = Program::new(
            "P",
            vec![Step::new(0.0, 100.0, 60.0), Step::new(100.0, 100.0, 30.0)],
        );
        assert_eq!(program.remove_step(5), None);
        assert_eq!(program.remove_step(0), Some(Step::new(0.0, 100.0, 60.0)));
        assert_eq!(program.remove_step(0), None);
        assert_eq!(program.steps().len(), 1);

        program.replace_steps(Vec::new());
        assert_eq!(program.steps().len(), 1);
        assert_eq!(program.name(), "P");
    }

    #[test]
    fn insert_clamps_and_durations_add_up() {
        let mut program = Program::with_step("P", Step::new(20.0, 600.0, 3600.0));
        program.insert_step(99, Step::new(600.0, 600.0, 600.0));
        program.insert_step(0, Step::new(0.0, 20.0, 0.0));
        assert_eq!(program.steps()[0].t_end, 20.0);
        assert_eq!(program.steps()[2].duration, 600.0);
        assert_eq!(program.total_duration(), 4200.0);
    }

    #[test]
    fn rate_per_hour() {
        assert_eq!(Step::new(100.0, 200.0, 1800.0).rate_per_hour(), Some(200.0));
        assert_eq!(Step::new(100.0, 200.0, 0.0).rate_per_hour(), None);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let program = Program::with_step("Glaze", Step::new(1.0, 2.0, 3.0));
        let value = serde_json::to_value(&program).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"name": "Glaze", "steps": [{"tStart": 1.0, "tEnd": 2.0, "duration": 3.0}]})
        );
    }

    #[test]
    fn durations_accept_integer_and_fractional_numbers() {
        let program: Program = serde_json::from_str(
            r#"{"name":"P","steps":[{"tStart":20,"tEnd":600,"duration":90.5},{"tStart":600,"tEnd":600,"duration":30}]}"#,
        )
        .unwrap();
        assert_eq!(program.steps()[0].duration, 90.5);
        assert_eq!(program.steps()[1].t_start, 600.0);
        assert_eq!(program.total_duration(), 120.5);
    }
}
