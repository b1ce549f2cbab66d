use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::stats::{LinkStats, PacketLossSimulation};
use super::transport::{Channel, Reliability, Transport, TransportError, TransportEvent};

#[derive(Debug)]
struct DelayedPacket {
    release_ms: u64,
    sequence: u64,
    channel: Channel,
    bytes: Vec<u8>,
}

impl PartialEq for DelayedPacket {
    fn eq(&self, other: &Self) -> bool {
        self.release_ms == other.release_ms && self.sequence == other.sequence
    }
}

impl Eq for DelayedPacket {}

impl PartialOrd for DelayedPacket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedPacket {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed for a min-heap
        other
            .release_ms
            .cmp(&self.release_ms)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Debug, Default)]
struct Direction {
    queue: BinaryHeap<DelayedPacket>,
    last_sequenced_release: u64,
    stats: LinkStats,
    received: LinkStats,
}

#[derive(Debug)]
struct Link {
    now_ms: u64,
    open: bool,
    next_sequence: u64,
    simulation: PacketLossSimulation,
    rng: StdRng,
    // indexed by the receiving side
    directions: [Direction; 2],
}

/// One end of an in-process link with simulated loss and latency. Time only
/// moves when [`MemoryEndpoint::advance`] is called.
#[derive(Debug)]
pub struct MemoryEndpoint {
    link: Rc<RefCell<Link>>,
    side: usize,
    events: VecDeque<TransportEvent>,
    closed_seen: bool,
}

/// Creates a connected pair. Both ends see `Connected` on their first poll.
pub fn memory_pair(
    simulation: PacketLossSimulation,
    seed: u64,
) -> (MemoryEndpoint, MemoryEndpoint) {
    let link = Rc::new(RefCell::new(Link {
        now_ms: 0,
        open: true,
        next_sequence: 0,
        simulation,
        rng: StdRng::seed_from_u64(seed),
        directions: [Direction::default(), Direction::default()],
    }));
    let endpoint = |side| MemoryEndpoint {
        link: Rc::clone(&link),
        side,
        events: VecDeque::from([TransportEvent::Connected]),
        closed_seen: false,
    };
    (endpoint(0), endpoint(1))
}

impl MemoryEndpoint {
    /// Moves the shared clock forward. Affects both ends.
    pub fn advance(&self, elapsed: Duration) {
        self.link.borrow_mut().now_ms += elapsed.as_millis() as u64;
    }

    pub fn now(&self) -> Duration {
        Duration::from_millis(self.link.borrow().now_ms)
    }

    pub fn set_simulation(&self, simulation: PacketLossSimulation) {
        self.link.borrow_mut().simulation = simulation;
    }

    pub fn in_flight(&self) -> usize {
        self.link.borrow().directions[1 - self.side].queue.len()
    }
}

impl Transport for MemoryEndpoint {
    fn send(
        &mut self,
        channel: Channel,
        bytes: &[u8],
        reliability: Reliability,
    ) -> Result<(), TransportError> {
        let mut link = self.link.borrow_mut();
        if !link.open {
            return Err(TransportError::Closed);
        }
        let link = &mut *link;
        let peer = 1 - self.side;
        link.directions[peer].stats.record_sent(bytes.len());

        if reliability == Reliability::Unreliable && link.simulation.should_drop(&mut link.rng) {
            link.directions[peer].stats.record_lost();
            log::trace!("dropped {} byte packet", bytes.len());
            return Ok(());
        }

        let mut release_ms = link.now_ms + link.simulation.delay_ms(&mut link.rng) as u64;
        let direction = &mut link.directions[peer];
        if channel == Channel::Sequenced {
            release_ms = release_ms.max(direction.last_sequenced_release);
            direction.last_sequenced_release = release_ms;
        }
        direction.queue.push(DelayedPacket {
            release_ms,
            sequence: link.next_sequence,
            channel,
            bytes: bytes.to_vec(),
        });
        link.next_sequence += 1;
        Ok(())
    }

    fn poll(&mut self) -> Option<TransportEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        let mut link = self.link.borrow_mut();
        if !link.open {
            if self.closed_seen {
                return None;
            }
            self.closed_seen = true;
            return Some(TransportEvent::Disconnected);
        }
        let now = link.now_ms;
        let direction = &mut link.directions[self.side];
        if direction.queue.peek()?.release_ms > now {
            return None;
        }
        let packet = direction.queue.pop()?;
        direction.received.record_received(packet.bytes.len());
        Some(TransportEvent::Received {
            channel: packet.channel,
            bytes: packet.bytes,
        })
    }

    fn is_connected(&self) -> bool {
        self.link.borrow().open
    }

    fn stats(&self) -> LinkStats {
        let link = self.link.borrow();
        let outbound = &link.directions[1 - self.side].stats;
        LinkStats {
            packets_received: link.directions[self.side].received.packets_received,
            bytes_received: link.directions[self.side].received.bytes_received,
            rtt_ms: link.simulation.mean_latency_ms() * 2.0,
            ..outbound.clone()
        }
    }

    fn disconnect(&mut self) {
        let mut link = self.link.borrow_mut();
        if link.open {
            link.open = false;
            for direction in &mut link.directions {
                direction.queue.clear();
            }
        }
        self.closed_seen = true;
    }
}
