use std::any::Any;

use simcore::{
    Event, EventCacheKind, EventHeader, EventId, EventKind, EventManagerKind, EventRegistry,
    KindedEvent, MemoryLogger, SimData, SimResult, SimTime, Simulator, SimulatorConfig,
};

/// Length of one simulated working day.
const DAY: SimTime = SimTime::from_secs(8 * 3600);

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    println!("═══════════════════════════════════════════════════════");
    println!("  simcore: single-server queue, parallel replications");
    println!("═══════════════════════════════════════════════════════");
    println!();

    let base = SimulatorConfig::auto(4, false).with_days(5);
    println!(
        "  {} replications × {} days, cache: {}",
        base.thread_count, base.days_per_thread, base.event_cache
    );
    println!();

    for kind in EventManagerKind::ALL {
        let config = base.clone().with_event_manager(kind);
        match run(config) {
            Ok(sim) => println!("  {:<22} {}", kind.to_string(), sim.stats()),
            Err(e) => println!("  {:<22} failed: {e}", kind.to_string()),
        }
    }
    println!();

    // One more run with a log on the first replication.
    let log = MemoryLogger::new();
    let config = base.with_threads(1).with_days(1).with_event_cache(EventCacheKind::Associative);
    if let Err(e) = logged_run(config, log.clone()) {
        println!("  logged run failed: {e}");
        return;
    }
    println!("  First log lines of replication 0 ({} total):", log.len());
    for line in log.lines().iter().take(5) {
        println!("    {line}");
    }
}

fn run(config: SimulatorConfig) -> SimResult<Simulator> {
    let mut sim = Simulator::builder()
        .config(config)
        .registry(registry()?)
        .initial_events(|data, _| first_arrival(data))
        .build()?;
    sim.start(false, false)?;
    sim.finalize_run()?;
    Ok(sim)
}

fn logged_run(config: SimulatorConfig, sink: MemoryLogger) -> SimResult<()> {
    let mut sim = Simulator::builder()
        .config(config)
        .registry(registry()?)
        .initial_events(move |data, nr| {
            if nr == 0 && data.current_day() == 0 {
                data.activate_logging(Box::new(sink.clone()));
            }
            first_arrival(data)
        })
        .build()?;
    sim.start(false, false)?;
    sim.finalize_run()
}

fn registry() -> SimResult<EventRegistry> {
    let mut r = EventRegistry::new();
    r.register_type::<Arrival>("arrival")?;
    r.register_type::<Departure>("departure")?;
    Ok(r)
}

fn first_arrival(data: &mut SimData) -> Vec<Box<dyn Event>> {
    let id = data.next_event_id();
    vec![Box::new(Arrival::at(SimTime::ZERO, id, data.thread_nr() as u64)) as Box<dyn Event>]
}

// ── Model ────────────────────────────────────────────────────────────

/// A client arrives; service ends with a [`Departure`].
#[derive(Debug, Clone, Default)]
struct Arrival {
    header: EventHeader,
    /// Linear congruential state for interarrival and service times.
    seed: u64,
}

impl Arrival {
    fn at(time: SimTime, id: EventId, seed: u64) -> Self {
        Arrival {
            header: EventHeader::new(time, id),
            seed,
        }
    }

    fn next_seed(&self) -> u64 {
        self.seed
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407)
    }
}

impl KindedEvent for Arrival {
    const KIND: EventKind = EventKind::new(1);
}

impl Event for Arrival {
    fn kind(&self) -> EventKind {
        Self::KIND
    }

    fn header(&self) -> &EventHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut EventHeader {
        &mut self.header
    }

    fn execute(&mut self, data: &mut SimData) -> Option<Box<dyn Event>> {
        let seed = self.next_seed();
        let service = 30_000 + (seed >> 33) % 60_000;
        let interarrival = 20_000 + (seed >> 17) % 100_000;

        if let (Some(mut departure), Some(end)) =
            (data.get_typed_event::<Departure>(), self.time().plus(service))
        {
            let id = data.next_event_id();
            departure.reschedule(end, id);
            data.schedule(departure);
        }
        if data.logging_active() {
            let info = format!("service {service} ms");
            data.log_event_execution("Arrival", Some(1), &info);
        }

        let next = self.time().plus(interarrival).filter(|t| *t < DAY)?;
        Some(Box::new(Arrival::at(next, data.next_event_id(), seed)))
    }

    fn copy(&self, time: SimTime, id: EventId) -> Box<dyn Event> {
        Box::new(Arrival::at(time, id, self.seed))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

/// A client leaves the server.
#[derive(Debug, Clone, Default)]
struct Departure {
    header: EventHeader,
}

impl KindedEvent for Departure {
    const KIND: EventKind = EventKind::new(2);
}

impl Event for Departure {
    fn kind(&self) -> EventKind {
        Self::KIND
    }

    fn header(&self) -> &EventHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut EventHeader {
        &mut self.header
    }

    fn execute(&mut self, data: &mut SimData) -> Option<Box<dyn Event>> {
        if data.logging_active() {
            data.log_event_execution("Departure", Some(1), "");
        }
        None
    }

    fn copy(&self, time: SimTime, id: EventId) -> Box<dyn Event> {
        Box::new(Departure {
            header: EventHeader::new(time, id),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}
