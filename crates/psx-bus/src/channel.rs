use portable_atomic::{fence, AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};

use crate::buttons::ButtonSnapshot;

/// Double-buffered hand-off of button state from the sampling context to the
/// protocol context.
///
/// The sampling side publishes through a [`ButtonPublisher`]; the protocol
/// side calls [`read`](Self::read). Each field has a single writer: slots and
/// `write_index` belong to the publisher, `read_index` and `consumed` to the
/// reader, `latching` to whoever owns the settings. Each slot is stored as
/// one word (both button bytes plus a publication sequence number), so a
/// reader can never observe half of an update.
pub struct ButtonChannel {
    slots: [AtomicU32; 2],
    write_index: AtomicU8,
    read_index: AtomicU8,
    consumed: AtomicU16,
    latching: AtomicBool,
}

const fn pack(snapshot: ButtonSnapshot, seq: u16) -> u32 {
    (snapshot.pack() as u32) | ((seq as u32) << 16)
}

impl ButtonChannel {
    pub const fn new(latching: bool) -> Self {
        Self {
            slots: [
                AtomicU32::new(pack(ButtonSnapshot::RELEASED, 0)),
                AtomicU32::new(pack(ButtonSnapshot::RELEASED, 0)),
            ],
            write_index: AtomicU8::new(0),
            read_index: AtomicU8::new(0),
            consumed: AtomicU16::new(0),
            latching: AtomicBool::new(latching),
        }
    }

    /// Writer handle. There must be only one.
    pub fn publisher(&self) -> ButtonPublisher<'_> {
        ButtonPublisher {
            channel: self,
            latch: ButtonSnapshot::RELEASED,
            last_sample: ButtonSnapshot::RELEASED,
            seq: 0,
            seen: self.consumed.load(Ordering::Acquire),
        }
    }

    pub fn set_latching(&self, latching: bool) {
        self.latching.store(latching, Ordering::Release);
    }

    pub fn is_latching(&self) -> bool {
        self.latching.load(Ordering::Acquire)
    }

    /// Take the most recently published state, with opposite directions
    /// neutralised.
    ///
    /// Only the protocol context may call this.
    pub fn read(&self) -> ButtonSnapshot {
        let index = self.write_index.load(Ordering::Acquire) as usize & 1;
        self.read_index.store(index as u8, Ordering::Release);
        fence(Ordering::Acquire);
        let raw = self.slots[index].load(Ordering::Acquire);
        self.consumed.store((raw >> 16) as u16, Ordering::Release);
        ButtonSnapshot::unpack(raw as u16).socd_cleaned()
    }
}

/// Write side of a [`ButtonChannel`].
pub struct ButtonPublisher<'a> {
    channel: &'a ButtonChannel,
    latch: ButtonSnapshot,
    last_sample: ButtonSnapshot,
    seq: u16,
    seen: u16,
}

impl ButtonPublisher<'_> {
    /// Publish a freshly sampled state.
    ///
    /// In latching mode every press since the reader's last read stays
    /// visible until the reader has taken it; in direct mode the sample is
    /// published as is.
    pub fn publish(&mut self, sample: ButtonSnapshot) {
        let channel = self.channel;

        if channel.is_latching() {
            let consumed = channel.consumed.load(Ordering::Acquire);
            if consumed != self.seen {
                self.seen = consumed;
                if consumed == self.seq {
                    self.latch = ButtonSnapshot::RELEASED;
                } else if consumed == self.seq.wrapping_sub(1) {
                    // The reader picked up the publication before the last
                    // one, so the last sample has not been delivered yet.
                    self.latch = self.last_sample;
                }
            }
            self.latch = self.latch.latch(sample);
        } else {
            self.latch = sample;
        }

        self.last_sample = sample;
        self.seq = self.seq.wrapping_add(1);

        // Never overwrite the slot the reader is looking at.
        let target = 1 - (channel.read_index.load(Ordering::Acquire) & 1);
        channel.slots[target as usize]
            .store(pack(self.latch, self.seq), Ordering::Relaxed);
        fence(Ordering::Release);
        channel.write_index.store(target, Ordering::Release);
    }

    /// The raw state passed to the last [`publish`](Self::publish).
    pub fn last_sample(&self) -> ButtonSnapshot {
        self.last_sample
    }
}
