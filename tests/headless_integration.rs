use assert_matches::assert_matches;
use keydash::clock::{Clock, ManualClock};
use keydash::driver::{spawn_feed, FeedEvent, VirtualTicker};
use keydash::pacer::{RevealWindow, SpeedPacer, FLOOR_SPEED};
use keydash::profile::{Personality, SimulatorConfig, SimulatorOverrides};
use keydash::race::{GameMode, Race, RaceOutcome, Session};
use keydash::simulator::Simulator;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn at(ms: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(ms)
}

// Headless run of a complete feed: every keystroke arrives over the
// channel in order, closed by exactly one Finished event.
#[test]
fn feed_streams_a_whole_run() {
    let clock = ManualClock::new();
    let config = SimulatorConfig::preset(Personality::Balanced).with_overrides(
        &SimulatorOverrides {
            mistake_rate: Some(0.0),
            ..Default::default()
        },
    );
    let simulator = Simulator::with_parts(config, StdRng::seed_from_u64(21), clock.clone());
    let ticker = VirtualTicker::new(clock, Duration::from_millis(50));

    let rx = spawn_feed(simulator, "channel crossing".to_string(), ticker);

    let mut typed = String::new();
    let mut finished = None;
    for event in rx {
        match event {
            FeedEvent::Key(emission) => {
                assert!(finished.is_none(), "keystroke after the Finished event");
                typed.push_str(&emission.keys);
            }
            FeedEvent::Finished(stats) => finished = Some(stats),
        }
    }

    assert_eq!(typed, "channel crossing");
    let stats = finished.expect("feed must close with Finished");
    assert_eq!(stats.position, "channel crossing".len());
    assert_eq!(stats.mistakes, 0);
    assert_eq!(stats.accuracy, 100.0);
}

// A quick scripted player against an untouched rival: the player finishes
// first and takes the race.
#[test]
fn scripted_player_outraces_an_idle_rival() {
    let clock = ManualClock::new();
    let rival = Simulator::with_parts(
        SimulatorConfig::preset(Personality::Careful),
        StdRng::seed_from_u64(4),
        clock.clone(),
    );
    let mut race = Race::new("go fast!", None, rival);

    let mut t = 0u64;
    for c in "go fast!".chars() {
        race.player_key(c, at(t));
        race.poll_rival();
        clock.advance(Duration::from_millis(30));
        t += 30;
    }

    assert!(race.session.has_finished());
    assert_matches!(race.outcome(), Some(RaceOutcome::PlayerWin));
    assert!(race.rival_progress() < 100.0);

    race.session.calc_results(at(t));
    assert_eq!(race.session.accuracy, 100.0);
    assert!(race.session.wpm > 0.0);
}

// A player who never types past the first key loses to the rival.
#[test]
fn rival_wins_against_a_stalled_player() {
    let clock = ManualClock::new();
    let rival = Simulator::with_parts(
        SimulatorConfig::preset(Personality::Aggressive),
        StdRng::seed_from_u64(8),
        clock.clone(),
    );
    let mut race = Race::new("short race", None, rival);

    race.player_key('s', clock.now());
    for _ in 0..4_000 {
        clock.advance(Duration::from_millis(50));
        race.poll_rival();
        if race.rival_finished() {
            break;
        }
    }

    assert_matches!(race.outcome(), Some(RaceOutcome::RivalWin));
    assert_eq!(race.rival_progress(), 100.0);
    assert!(!race.rival_typed.is_empty());
}

// Dynamic mode wiring: accurate typing pushes the pacer up and the reveal
// window keeps opening ahead of the player.
#[test]
fn dynamic_mode_speeds_up_for_accurate_typing() {
    let prompt = "a prompt long enough for the window to matter, clearly!";
    let mut session = Session::new(prompt, GameMode::Dynamic, None);
    let mut pacer = SpeedPacer::new();
    let mut window = RevealWindow::new();
    let total = prompt.chars().count();

    let mut t = 0u64;
    for c in prompt.chars() {
        session.write(c, at(t));
        pacer.observe(session.live_accuracy(), at(t));
        window.poll(&pacer, at(t), total);
        t += 350;
    }

    assert!(session.has_finished());
    assert_eq!(session.live_accuracy(), 100.0);
    assert!(pacer.speed() > FLOOR_SPEED);
    assert_eq!(window.visible(total), total);
}

// Classic mode wiring: penalties surface in the final elapsed time.
#[test]
fn classic_mode_charges_misses_into_the_clock() {
    let mut session = Session::new("abc", GameMode::Classic, None);
    session.write('a', at(0));
    session.write('x', at(500));
    session.write('c', at(1000));
    assert!(session.has_finished());

    // One second of real time plus a one second miss penalty.
    assert_eq!(session.total_secs(at(1000)), 2.0);
    session.calc_results(at(1000));
    assert_eq!(session.accuracy, 67.0);
}
