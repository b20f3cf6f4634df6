//! Discrete-event network emulator for deterministic testing.
//!
//! Real networks drop and damage packets. To exercise the protocol without
//! depending on actual network conditions, [`Simulator`] drives an
//! [`SrSender`] and an [`SrReceiver`] through a simulated channel with a
//! configurable fault model:
//!
//! | Fault       | Description                                              |
//! |-------------|----------------------------------------------------------|
//! | Loss        | Drop a packet with probability `loss_prob`.              |
//! | Corruption  | With probability `corrupt_prob` overwrite the first      |
//! |             | payload byte (75%), the seqnum (12.5%) or the acknum     |
//! |             | (12.5%). The stored checksum is left untouched.          |
//! | Delay       | Each packet takes 1 to 10 time units; packets towards    |
//! |             | one entity never overtake each other.                    |
//!
//! Time is virtual: events are processed in timestamp order and the run ends
//! when no events remain. All randomness comes from a seeded RNG, so a given
//! [`SimulatorConfig`] always produces the same run.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{check_probability, ConfigError, SrConfig};
use crate::context::{Application, Channel, Entity, Timer};
use crate::packet::{Message, Packet};
use crate::receiver::{ReceiverStats, SrReceiver};
use crate::sender::{SenderStats, SrSender, SubmitOutcome};

/// Header value written by a corrupting channel.
const GARBLED_FIELD: i32 = 999_999;

/// Configuration for the emulated channel and message source.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Number of messages the application hands to A.
    pub messages: usize,
    /// Probability that any given packet is silently dropped.
    pub loss_prob: f64,
    /// Probability that a delivered packet is damaged.
    pub corrupt_prob: f64,
    /// Mean time between two application messages.
    pub lambda: f64,
    pub seed: u64,
    /// Virtual time after which the run is abandoned.
    pub max_time: f64,
    pub protocol: SrConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults by default: the channel only delays.
        Self {
            messages: 20,
            loss_prob: 0.0,
            corrupt_prob: 0.0,
            lambda: 10.0,
            seed: 1,
            max_time: 1.0e7,
            protocol: SrConfig::default(),
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("loss", self.loss_prob)?;
        check_probability("corrupt", self.corrupt_prob)?;
        if !self.lambda.is_finite() || self.lambda <= 0.0 {
            return Err(ConfigError::BadInterarrival(self.lambda));
        }
        if self.max_time.is_nan() || self.max_time <= 0.0 {
            return Err(ConfigError::BadMaxTime(self.max_time));
        }
        Ok(())
    }
}

/// Outcome of a complete run.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Messages generated by the application, including dropped ones.
    pub generated: usize,
    /// Messages A accepted into its window, in submission order.
    pub submitted: Vec<Message>,
    /// Messages B handed to the application, in delivery order.
    pub delivered: Vec<Message>,
    pub sender: SenderStats,
    pub receiver: ReceiverStats,
    /// Packets handed to the channel by either entity.
    pub to_channel: u64,
    pub lost: u64,
    pub corrupted: u64,
    /// Starts of a running timer or stops of a stopped one.
    pub timer_misuse: u64,
    pub end_time: f64,
    /// `true` when `max_time` elapsed before the event list drained.
    pub timed_out: bool,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulator terminated at time {:.3}", self.end_time)?;
        writeln!(f, "  messages generated:           {}", self.generated)?;
        writeln!(f, "  dropped (window full):        {}", self.sender.window_full)?;
        writeln!(f, "  packets sent by A:            {}", self.sender.packets_sent)?;
        writeln!(f, "  new ACKs received by A:       {}", self.sender.new_acks)?;
        writeln!(f, "  timeouts:                     {}", self.sender.timeouts)?;
        writeln!(f, "  packets resent by A:          {}", self.sender.packets_resent)?;
        writeln!(f, "  packets delivered by B:       {}", self.receiver.packets_delivered)?;
        writeln!(f, "  ACKs sent by B:               {}", self.receiver.acks_sent)?;
        writeln!(f, "  packets into channel:         {}", self.to_channel)?;
        writeln!(f, "  packets lost:                 {}", self.lost)?;
        write!(f, "  packets corrupted:            {}", self.corrupted)?;
        if self.timed_out {
            write!(f, "\n  (stopped at max_time before the event list drained)")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum EventKind {
    FromApplication,
    FromChannel(Packet),
    TimerInterrupt,
}

#[derive(Debug)]
struct Event {
    time: f64,
    /// Insertion counter; breaks ties and identifies timer events.
    id: u64,
    entity: Entity,
    kind: EventKind,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    // Reversed so `BinaryHeap` pops the earliest event first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

fn slot(entity: Entity) -> usize {
    match entity {
        Entity::A => 0,
        Entity::B => 1,
    }
}

// ---------------------------------------------------------------------------
// Network: everything except the two protocol entities
// ---------------------------------------------------------------------------

struct Network {
    rng: StdRng,
    loss_prob: f64,
    corrupt_prob: f64,
    lambda: f64,
    time: f64,
    next_id: u64,
    events: BinaryHeap<Event>,
    /// Id of the armed timer event per entity; stale ids are cancelled timers.
    timers: [Option<u64>; 2],
    /// Latest scheduled arrival per destination, for FIFO delivery.
    last_arrival: [f64; 2],
    delivered: Vec<Message>,
    to_channel: u64,
    lost: u64,
    corrupted: u64,
    timer_misuse: u64,
}

impl Network {
    fn schedule(&mut self, time: f64, entity: Entity, kind: EventKind) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.events.push(Event {
            time,
            id,
            entity,
            kind,
        });
        id
    }

    fn schedule_next_arrival(&mut self) {
        let gap = self.lambda * self.rng.gen::<f64>() * 2.0;
        self.schedule(self.time + gap, Entity::A, EventKind::FromApplication);
    }

    fn send(&mut self, from: Entity, mut packet: Packet) {
        self.to_channel += 1;
        if self.rng.gen::<f64>() < self.loss_prob {
            self.lost += 1;
            log::debug!("[sim] {from} → packet lost (seq={} ack={})", packet.seqnum, packet.acknum);
            return;
        }

        let dest = from.peer();
        let earliest = self.last_arrival[slot(dest)].max(self.time);
        let arrival = earliest + 1.0 + 9.0 * self.rng.gen::<f64>();
        self.last_arrival[slot(dest)] = arrival;

        if self.rng.gen::<f64>() < self.corrupt_prob {
            self.corrupted += 1;
            let x = self.rng.gen::<f64>();
            if x < 0.75 {
                packet.payload[0] = b'Z';
            } else if x < 0.875 {
                packet.seqnum = GARBLED_FIELD;
            } else {
                packet.acknum = GARBLED_FIELD;
            }
            log::debug!("[sim] {from} → packet corrupted");
        }

        self.schedule(arrival, dest, EventKind::FromChannel(packet));
    }

    fn start_timer(&mut self, entity: Entity, increment: f64) {
        if self.timers[slot(entity)].is_some() {
            self.timer_misuse += 1;
            log::warn!("[sim] {entity} tried to start a timer that is already running");
            return;
        }
        let id = self.schedule(self.time + increment, entity, EventKind::TimerInterrupt);
        self.timers[slot(entity)] = Some(id);
    }

    fn stop_timer(&mut self, entity: Entity) {
        if self.timers[slot(entity)].take().is_none() {
            self.timer_misuse += 1;
            log::warn!("[sim] {entity} tried to stop a timer that is not running");
        }
    }
}

/// The collaborators one entity sees while handling an event.
struct EntityContext<'a> {
    net: &'a mut Network,
    entity: Entity,
}

impl Channel for EntityContext<'_> {
    fn to_channel(&mut self, packet: Packet) {
        self.net.send(self.entity, packet);
    }
}

impl Timer for EntityContext<'_> {
    fn start_timer(&mut self, increment: f64) {
        self.net.start_timer(self.entity, increment);
    }

    fn stop_timer(&mut self) {
        self.net.stop_timer(self.entity);
    }
}

impl Application for EntityContext<'_> {
    fn to_application(&mut self, message: Message) {
        log::debug!("[sim] {} delivered {message}", self.entity);
        self.net.delivered.push(message);
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// A complete emulated A → B transfer.
pub struct Simulator {
    config: SimulatorConfig,
    net: Network,
    sender: SrSender,
    receiver: SrReceiver,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let net = Network {
            rng: StdRng::seed_from_u64(config.seed),
            loss_prob: config.loss_prob,
            corrupt_prob: config.corrupt_prob,
            lambda: config.lambda,
            time: 0.0,
            next_id: 0,
            events: BinaryHeap::new(),
            timers: [None; 2],
            last_arrival: [0.0; 2],
            delivered: Vec::with_capacity(config.messages),
            to_channel: 0,
            lost: 0,
            corrupted: 0,
            timer_misuse: 0,
        };
        Ok(Self {
            sender: SrSender::new(config.protocol),
            receiver: SrReceiver::new(config.protocol),
            config,
            net,
        })
    }

    /// Run until the event list drains or `max_time` passes.
    pub fn run(mut self) -> SimulationReport {
        log::info!(
            "[sim] {} messages, loss={} corrupt={} lambda={} window={}",
            self.config.messages,
            self.config.loss_prob,
            self.config.corrupt_prob,
            self.config.lambda,
            self.config.protocol.window_size()
        );

        let mut generated = 0;
        let mut submitted = Vec::with_capacity(self.config.messages);
        let mut timed_out = false;

        if self.config.messages > 0 {
            self.net.schedule_next_arrival();
        }

        while let Some(event) = self.net.events.pop() {
            if event.time > self.config.max_time {
                timed_out = true;
                break;
            }
            self.net.time = event.time;

            match event.kind {
                EventKind::FromApplication => {
                    let message = Message::filled(b'a' + (generated % 26) as u8);
                    generated += 1;
                    if generated < self.config.messages {
                        self.net.schedule_next_arrival();
                    }
                    let mut ctx = EntityContext {
                        net: &mut self.net,
                        entity: Entity::A,
                    };
                    if let SubmitOutcome::Sent(_) = self.sender.submit(&mut ctx, &message) {
                        submitted.push(message);
                    }
                }
                EventKind::FromChannel(packet) => {
                    let mut ctx = EntityContext {
                        net: &mut self.net,
                        entity: event.entity,
                    };
                    match event.entity {
                        Entity::A => {
                            self.sender.on_ack(&mut ctx, &packet);
                        }
                        Entity::B => {
                            self.receiver.on_packet(&mut ctx, &packet);
                        }
                    }
                }
                EventKind::TimerInterrupt => {
                    if self.net.timers[slot(event.entity)] != Some(event.id) {
                        continue; // cancelled
                    }
                    self.net.timers[slot(event.entity)] = None;
                    if event.entity == Entity::A {
                        let mut ctx = EntityContext {
                            net: &mut self.net,
                            entity: Entity::A,
                        };
                        self.sender.on_timeout(&mut ctx);
                    }
                }
            }
        }

        let report = SimulationReport {
            generated,
            submitted,
            delivered: self.net.delivered,
            sender: *self.sender.stats(),
            receiver: *self.receiver.stats(),
            to_channel: self.net.to_channel,
            lost: self.net.lost,
            corrupted: self.net.corrupted,
            timer_misuse: self.net.timer_misuse,
            end_time: self.net.time,
            timed_out,
        };
        log::info!("[sim] finished at t={:.3}", report.end_time);
        report
    }
}
