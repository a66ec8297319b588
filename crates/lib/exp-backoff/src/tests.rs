use super::*;

#[test]
fn grows_to_the_clamp() {
    let mut state = State::doubling(Duration::from_secs(1), Duration::from_secs(300));

    let delays: [u64; 10] = core::array::from_fn(|_| state.advance().as_secs());

    assert_eq!(delays, [2, 4, 8, 16, 32, 64, 128, 256, 300, 300]);
}

#[test]
fn kth_failure_is_min_times_two_to_the_k() {
    let min = Duration::from_millis(250);
    let max = Duration::from_secs(60);
    let mut state = State::doubling(min, max);

    for k in 1..=12u32 {
        let expected = min.saturating_mul(2u32.pow(k)).min(max);
        assert_eq!(state.advance(), expected, "failure {k}");
    }
}

#[test]
fn reset_returns_to_min() {
    let mut state = State::doubling(Duration::from_secs(1), Duration::from_secs(10));
    state.advance();
    state.advance();

    state.reset();

    assert_eq!(state.peek(), Duration::from_secs(1));
    assert_eq!(state.advance(), Duration::from_secs(2));
}

#[test]
fn saturates_instead_of_overflowing() {
    let mut state = State::doubling(Duration::MAX, Duration::MAX);

    assert_eq!(state.advance(), Duration::MAX);
}
