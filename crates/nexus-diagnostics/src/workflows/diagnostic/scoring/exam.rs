use super::super::domain::{ExamPrep, Feeling, MiniTest};
use super::round_half_up;

fn mini_test_percent(mini_test: &MiniTest) -> f64 {
    f64::from(mini_test.score) / f64::from(MiniTest::MAX_SCORE) * 100.0
}

fn time_component(mini_test: &MiniTest) -> f64 {
    if mini_test.finished_in_time() {
        100.0
    } else {
        40.0
    }
}

/// Stress is rated 0 (calm) to 4 (overwhelmed); invert it so calm scores high.
fn calm_percent(stress: u8) -> f64 {
    (4.0 - f64::from(stress)) / 4.0 * 100.0
}

/// Automatisms, timing, writing quality and stress folded into a 0-100 index.
pub(crate) fn exam_readiness_index(exam: &ExamPrep) -> u8 {
    let ratings = &exam.self_ratings;
    let writing = (f64::from(ratings.redaction) + f64::from(ratings.justifications)) / 2.0 / 4.0 * 100.0;

    let readiness = 0.40 * mini_test_percent(&exam.mini_test)
        + 0.20 * time_component(&exam.mini_test)
        + 0.25 * writing
        + 0.15 * calm_percent(ratings.stress);

    round_half_up(readiness.clamp(0.0, 100.0))
}

/// 60% measured on the mini test, 40% declared by the student.
pub(crate) fn risk_index(exam: &ExamPrep) -> u8 {
    let verified = if exam.signals.answers_verified() {
        100.0
    } else {
        50.0
    };
    let proof = 100.0
        - (0.50 * mini_test_percent(&exam.mini_test)
            + 0.25 * time_component(&exam.mini_test)
            + 0.25 * verified);

    let feeling = match exam.signals.feeling() {
        Feeling::Panic => 0.0,
        Feeling::Ok => 80.0,
        Feeling::Neutral => 50.0,
    };
    let declarative = 100.0 - (0.50 * calm_percent(exam.self_ratings.stress) + 0.50 * feeling);

    round_half_up((0.60 * proof + 0.40 * declarative).clamp(0.0, 100.0))
}
