use crate::clock::{Clock, ManualClock};
use crate::simulator::{Emission, RunStats, Simulator};
use rand::Rng;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

/// Cadence source for the polling loop.
pub trait Ticker: Send + 'static {
    /// Block (or fast-forward) until the next poll is due.
    fn wait(&self);

    fn interval(&self) -> Duration;
}

/// Sleeps a fixed wall-clock interval between polls.
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn wait(&self) {
        thread::sleep(self.interval);
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Advances a [`ManualClock`] instead of sleeping, so a whole run plays
/// out as fast as the loop can spin.
#[derive(Clone, Debug)]
pub struct VirtualTicker {
    clock: ManualClock,
    interval: Duration,
}

impl VirtualTicker {
    pub fn new(clock: ManualClock, interval: Duration) -> Self {
        Self { clock, interval }
    }
}

impl Ticker for VirtualTicker {
    fn wait(&self) {
        self.clock.advance(self.interval);
    }

    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Events published by a driven simulator.
///
/// Exactly one `Finished` event closes every feed; everything before it is
/// a non-idle keystroke in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Key(Emission),
    Finished(RunStats),
}

/// Run a simulator over `text` on its own thread, publishing keystrokes
/// over a channel.
///
/// This is the process boundary for anything racing against the rival:
/// consumers only ever see the event stream, never shared state. Dropping
/// the receiver stops the feed at the next emission.
pub fn spawn_feed<R, C, T>(
    mut simulator: Simulator<R, C>,
    text: String,
    ticker: T,
) -> Receiver<FeedEvent>
where
    R: Rng + Send + 'static,
    C: Clock + Send + 'static,
    T: Ticker,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        simulator.start_run(&text);
        loop {
            ticker.wait();
            let emission = simulator.next_emission();
            if !emission.is_idle() && tx.send(FeedEvent::Key(emission)).is_err() {
                break;
            }
            if simulator.is_done() {
                let _ = tx.send(FeedEvent::Finished(simulator.stats()));
                break;
            }
        }
    });
    rx
}
