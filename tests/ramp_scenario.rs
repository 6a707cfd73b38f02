//! End-to-end Ramp strategy run against a synthetic host.
//!
//! The simulated host renders at the target frame rate up to complexity 500
//! and degrades linearly above it, so the breakeven complexity the run
//! should report is 500.

use framemark::{Config, Controller, MarkName, Stage, Strategy};

const TARGET_FRAME_LENGTH: f64 = 1000.0 / 60.0;
const BREAKEVEN: f64 = 500.0;

struct SimulatedStage {
    complexity: i64,
}

impl SimulatedStage {
    fn frame_length(&self) -> f64 {
        let degraded = (self.complexity as f64 - BREAKEVEN) * 0.02 + TARGET_FRAME_LENGTH;
        degraded.max(TARGET_FRAME_LENGTH)
    }
}

impl Stage for SimulatedStage {
    fn complexity(&self) -> i64 {
        self.complexity
    }

    fn tune(&mut self, delta: i64) {
        self.complexity = (self.complexity + delta).max(0);
    }
}

fn run() -> framemark::ControllerResults {
    let mut stage = SimulatedStage { complexity: 1 };
    let mut controller = Controller::start(Config::quick(), Strategy::Ramp, 0.0, &mut stage);

    let mut t = 0.0;
    let mut stopped = false;
    // Bounded iteration so a scheduling bug cannot hang the test.
    for _ in 0..20_000 {
        t += stage.frame_length();
        controller.update(t, &mut stage);
        if controller.should_stop(t) {
            stopped = true;
            break;
        }
    }
    assert!(stopped, "run never reached its deadline");
    controller.results(t)
}

#[test]
fn test_score_lands_near_breakeven_complexity() {
    let results = run();

    let score = results.score.expect("ramp run should produce a score");
    assert!(
        (score - BREAKEVEN).abs() < 50.0,
        "score {score} should land near {BREAKEVEN}"
    );

    let bootstrap = results.bootstrap.expect("ramp run should produce an interval");
    assert!(bootstrap.confidence_low <= bootstrap.median);
    assert!(bootstrap.median <= bootstrap.confidence_high);
    assert_eq!(bootstrap.median, score);
}

#[test]
fn test_run_produces_ramps_and_marks() {
    let results = run();

    assert!(
        results.ramps.len() >= 2,
        "expected several completed ramps, got {}",
        results.ramps.len()
    );
    for ramp in &results.ramps {
        assert!(ramp.complexity >= 1.0);
        assert!(ramp.complexity <= 1778.0);
        assert!(ramp.start_index < ramp.end_index);
        // Segments meet at the breakpoint descriptor boundary.
        assert!(ramp.segment1.x2 <= ramp.segment2.x2);
    }

    let marks = &results.marks;
    assert_eq!(marks.first().unwrap().name, MarkName::SamplingStart);
    assert_eq!(marks.last().unwrap().name, MarkName::SamplingEnd);
    assert_eq!(
        marks.iter().filter(|m| m.name == MarkName::TierComplete).count(),
        1
    );
    assert!(
        marks.iter().filter(|m| m.name == MarkName::RampComplete).count() >= 2
    );
    // Marks are rebased to the run start.
    assert_eq!(marks.first().unwrap().time, 0.0);
    assert!(marks.windows(2).all(|w| w[0].time <= w[1].time));
}

#[test]
fn test_sample_series_is_consistent() {
    let results = run();
    let samples = &results.samples;

    assert!(!samples.is_empty());
    assert_eq!(samples.time.len(), samples.complexity.len());
    assert_eq!(samples.time.len(), samples.frame_length.len());
    assert_eq!(samples.time.len(), samples.smoothed_frame_length.len());
    assert_eq!(samples.time.len(), samples.frame_type.len());

    // Timestamps are rebased and monotonic.
    assert!(samples.time[0] >= 0.0);
    assert!(samples.time.windows(2).all(|w| w[0] < w[1]));

    // The first frame has no length; later frames do.
    assert_eq!(samples.frame_length[0], -1.0);
    assert!(samples.frame_length[1..].iter().all(|&f| f > 0.0));
}

#[test]
fn test_results_serialize_to_json() {
    let results = run();
    let value = serde_json::to_value(&results).expect("results should serialize");

    assert!(value.get("samples").is_some());
    assert!(value.get("marks").is_some());
    assert!(value.get("ramps").is_some());
    assert!(value.get("score").is_some());
    assert!(value["bootstrap"]["confidence_low"].is_number());
}
