use log::{debug, info};
use std::thread;
use std::time::{Duration, Instant};

pub fn settle(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    info!("Waiting for {:.1} seconds (Settle Delay)...", duration.as_secs_f64());
    thread::sleep(duration);
}

// Checks at least once, so a zero timeout is a single look.
pub fn wait_until<F>(timeout: Duration, poll: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let started = Instant::now();
    loop {
        if condition() {
            return true;
        }
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            debug!("Condition not met after {:?}", elapsed);
            return false;
        }
        thread::sleep(poll.min(timeout - elapsed));
    }
}
