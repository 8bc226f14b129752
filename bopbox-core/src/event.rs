//! Bounded publish/subscribe bus between services.
//!
//! Subscribers own their inbox (an embassy [`Channel`]) and register it
//! together with the event kinds they care about. Delivery is
//! non-blocking: when an inbox is full the event is dropped for that
//! subscriber only and a warning is logged.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::rwlock::RwLock;
use heapless::Vec;
use pn532_proto::Uid;

/// Maximum number of subscriptions a bus accepts.
pub const MAX_SUBSCRIBERS: usize = 8;

/// Number of distinct event kinds the interest mask can express.
pub const MAX_EVENT_KINDS: usize = 32;

/// Maximum event payload in bytes.
pub const EVENT_PAYLOAD_LEN: usize = 32;

/// Default inbox depth for subscribers.
pub const DEFAULT_INBOX_DEPTH: usize = 4;

/// Subscriber-owned event inbox.
pub type Inbox<M, const N: usize> = Channel<M, Event, N>;

/// Event categories. The discriminant is the bit index in a subscription's
/// interest mask and must stay below [`MAX_EVENT_KINDS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EventKind {
    /// A new tag entered the field. Payload: UID bytes.
    TagDetected = 0,
    /// The previously detected tag left the field. Payload: its UID bytes.
    TagRemoved = 1,
}

impl EventKind {
    /// Interest-mask bit for this kind.
    #[inline]
    pub const fn mask(self) -> u32 {
        1 << (self as u8)
    }

    /// Combined mask for a set of kinds.
    pub fn mask_of(kinds: &[EventKind]) -> u32 {
        kinds.iter().fold(0, |mask, kind| mask | kind.mask())
    }
}

/// Fixed-size event value, copied into every matching inbox.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Event {
    kind: EventKind,
    len: u8,
    payload: [u8; EVENT_PAYLOAD_LEN],
}

impl Event {
    /// Build an event, truncating `data` to [`EVENT_PAYLOAD_LEN`] bytes.
    pub fn new(kind: EventKind, data: &[u8]) -> Self {
        let len = data.len().min(EVENT_PAYLOAD_LEN);
        let mut payload = [0u8; EVENT_PAYLOAD_LEN];
        payload[..len].copy_from_slice(&data[..len]);
        Self {
            kind,
            len: len as u8,
            payload,
        }
    }

    /// `TagDetected` event carrying the UID bytes.
    pub fn tag_detected(uid: &Uid) -> Self {
        Self::new(EventKind::TagDetected, uid.as_bytes())
    }

    /// `TagRemoved` event carrying the UID of the tag that went away.
    pub fn tag_removed(uid: &Uid) -> Self {
        Self::new(EventKind::TagRemoved, uid.as_bytes())
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload[..usize::from(self.len)]
    }

    /// UID carried by a tag event, `None` for other kinds.
    pub fn uid(&self) -> Option<Uid> {
        match self.kind {
            EventKind::TagDetected | EventKind::TagRemoved => Some(Uid::new(self.payload())),
        }
    }
}

impl core::fmt::Debug for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("payload", &self.payload())
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Event {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Event({}, {=[u8]:X})", self.kind, self.payload())
    }
}

/// Bus errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// All [`MAX_SUBSCRIBERS`] slots are taken.
    BusFull,
}

impl core::fmt::Display for BusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BusError::BusFull => write!(f, "event bus subscriber table is full"),
        }
    }
}

/// Receiving end a subscriber registers with the bus.
pub trait Mailbox: Sync {
    /// Hand over `event` without waiting. Returns `false` if it was dropped.
    fn offer(&self, event: Event) -> bool;
}

impl<M: RawMutex + Sync, const N: usize> Mailbox for Channel<M, Event, N> {
    fn offer(&self, event: Event) -> bool {
        self.try_send(event).is_ok()
    }
}

struct Subscription {
    mask: u32,
    inbox: &'static dyn Mailbox,
}

/// Publish/subscribe bus with a fixed subscriber table.
///
/// Publishing takes the table's read lock, so any number of publishers run
/// concurrently; subscribing takes the write lock.
pub struct EventBus<M: RawMutex> {
    subscriptions: RwLock<M, Vec<Subscription, MAX_SUBSCRIBERS>>,
}

impl<M: RawMutex> EventBus<M> {
    /// Create an empty bus.
    pub const fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    /// Register `inbox` for events whose kind is in `kinds`.
    ///
    /// Subscriptions are permanent.
    pub async fn subscribe(
        &self,
        inbox: &'static dyn Mailbox,
        kinds: &[EventKind],
    ) -> Result<(), BusError> {
        let mask = EventKind::mask_of(kinds);
        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions
            .push(Subscription { mask, inbox })
            .is_err()
        {
            warn!("event bus full subscribers={}", MAX_SUBSCRIBERS);
            return Err(BusError::BusFull);
        }
        debug!(
            "event bus subscribed slot={} mask=0x{:08x}",
            subscriptions.len() - 1,
            mask
        );
        Ok(())
    }

    /// Offer `event` to every subscriber interested in its kind.
    ///
    /// Never waits on an inbox. Returns how many inboxes accepted the event.
    pub async fn publish(&self, event: Event) -> usize {
        let bit = event.kind().mask();
        let subscriptions = self.subscriptions.read().await;
        let mut delivered = 0;
        for (slot, subscription) in subscriptions.iter().enumerate() {
            if subscription.mask & bit == 0 {
                continue;
            }
            if subscription.inbox.offer(event) {
                delivered += 1;
            } else {
                warn!(
                    "event dropped, inbox full slot={} kind={:?}",
                    slot,
                    event.kind()
                );
            }
        }
        delivered
    }

    /// Number of registered subscriptions.
    pub async fn subscriber_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

impl<M: RawMutex> Default for EventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use embassy_futures::block_on;
    use embassy_futures::join::join;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use std::boxed::Box;

    type TestInbox = Inbox<CriticalSectionRawMutex, DEFAULT_INBOX_DEPTH>;
    type TestBus = EventBus<CriticalSectionRawMutex>;

    fn inbox() -> &'static TestInbox {
        Box::leak(Box::new(Channel::new()))
    }

    fn uid() -> Uid {
        Uid::new(&[0x04, 0xA2, 0x3B, 0x1C])
    }

    #[test]
    fn test_kind_masks() {
        assert_eq!(EventKind::TagDetected.mask(), 0b01);
        assert_eq!(EventKind::TagRemoved.mask(), 0b10);
        assert_eq!(
            EventKind::mask_of(&[EventKind::TagDetected, EventKind::TagRemoved]),
            0b11
        );
        assert_eq!(EventKind::mask_of(&[]), 0);
    }

    #[test]
    fn test_event_payload_truncated() {
        let data = [0xABu8; 40];
        let event = Event::new(EventKind::TagDetected, &data);
        assert_eq!(event.payload().len(), EVENT_PAYLOAD_LEN);
    }

    #[test]
    fn test_event_uid_roundtrip() {
        let event = Event::tag_removed(&uid());
        assert_eq!(event.kind(), EventKind::TagRemoved);
        assert_eq!(event.uid(), Some(uid()));
    }

    #[test]
    fn test_publish_filters_by_kind() {
        let bus = TestBus::new();
        let detected = inbox();
        let everything = inbox();

        block_on(async {
            bus.subscribe(detected, &[EventKind::TagDetected])
                .await
                .unwrap();
            bus.subscribe(
                everything,
                &[EventKind::TagDetected, EventKind::TagRemoved],
            )
            .await
            .unwrap();

            assert_eq!(bus.publish(Event::tag_detected(&uid())).await, 2);
            assert_eq!(bus.publish(Event::tag_removed(&uid())).await, 1);
        });

        assert_eq!(detected.len(), 1);
        assert_eq!(everything.len(), 2);
        assert_eq!(
            detected.try_receive().unwrap().kind(),
            EventKind::TagDetected
        );
    }

    #[test]
    fn test_ninth_subscription_rejected() {
        let bus = TestBus::new();
        block_on(async {
            for _ in 0..MAX_SUBSCRIBERS {
                bus.subscribe(inbox(), &[EventKind::TagDetected])
                    .await
                    .unwrap();
            }
            assert_eq!(
                bus.subscribe(inbox(), &[EventKind::TagDetected])
                    .await,
                Err(BusError::BusFull)
            );
            assert_eq!(bus.subscriber_count().await, MAX_SUBSCRIBERS);
        });
    }

    #[test]
    fn test_full_inbox_does_not_block_others() {
        let bus = TestBus::new();
        let slow = inbox();
        let fast = inbox();

        block_on(async {
            bus.subscribe(slow, &[EventKind::TagDetected])
                .await
                .unwrap();
            bus.subscribe(fast, &[EventKind::TagDetected])
                .await
                .unwrap();

            for _ in 0..DEFAULT_INBOX_DEPTH {
                assert_eq!(bus.publish(Event::tag_detected(&uid())).await, 2);
            }
            // Drain only the fast subscriber; the slow inbox stays full.
            while fast.try_receive().is_ok() {}

            assert_eq!(bus.publish(Event::tag_detected(&uid())).await, 1);
        });

        assert_eq!(slow.len(), DEFAULT_INBOX_DEPTH);
        assert_eq!(fast.len(), 1);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = TestBus::new();
        assert_eq!(block_on(bus.publish(Event::tag_detected(&uid()))), 0);
    }

    #[test]
    fn test_concurrent_publish_and_subscribe() {
        let bus = TestBus::new();
        let early = inbox();
        let late = inbox();

        let delivered = block_on(async {
            bus.subscribe(early, &[EventKind::TagDetected])
                .await
                .unwrap();
            let publishing = async {
                let first = bus.publish(Event::tag_detected(&uid())).await;
                let second = bus.publish(Event::tag_detected(&uid())).await;
                first + second
            };
            let subscribing = async {
                bus.subscribe(late, &[EventKind::TagDetected])
                    .await
                    .unwrap();
            };
            join(publishing, subscribing).await.0
        });

        assert_eq!(early.len(), 2);
        // Every delivery beyond the early inbox landed in the late one.
        assert_eq!(late.len(), delivered - 2);
        assert_eq!(block_on(bus.subscriber_count()), 2);

        let before = late.len();
        assert_eq!(block_on(bus.publish(Event::tag_detected(&uid()))), 2);
        assert_eq!(early.len(), 3);
        assert_eq!(late.len(), before + 1);
    }
}
