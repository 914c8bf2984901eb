/// Buttons of a digital pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    Select,
    Start,
    Up,
    Right,
    Down,
    Left,
    L2,
    R2,
    L1,
    R1,
    Triangle,
    Circle,
    Cross,
    Square,
}

impl Button {
    pub const ALL: [Button; 14] = [
        Button::Select,
        Button::Start,
        Button::Up,
        Button::Right,
        Button::Down,
        Button::Left,
        Button::L2,
        Button::R2,
        Button::L1,
        Button::R1,
        Button::Triangle,
        Button::Circle,
        Button::Cross,
        Button::Square,
    ];

    /// Position on the wire as `(byte, mask)`; byte 0 is the first button
    /// byte of the poll response.
    pub const fn position(self) -> (usize, u8) {
        match self {
            Button::Select => (0, 1 << 0),
            // Bits 1 and 2 (L3, R3) are unused on a digital pad.
            Button::Start => (0, 1 << 3),
            Button::Up => (0, 1 << 4),
            Button::Right => (0, 1 << 5),
            Button::Down => (0, 1 << 6),
            Button::Left => (0, 1 << 7),
            Button::L2 => (1, 1 << 0),
            Button::R2 => (1, 1 << 1),
            Button::L1 => (1, 1 << 2),
            Button::R1 => (1, 1 << 3),
            Button::Triangle => (1, 1 << 4),
            Button::Circle => (1, 1 << 5),
            Button::Cross => (1, 1 << 6),
            Button::Square => (1, 1 << 7),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Button::Select => "SELECT",
            Button::Start => "START",
            Button::Up => "UP",
            Button::Right => "RIGHT",
            Button::Down => "DOWN",
            Button::Left => "LEFT",
            Button::L2 => "L2",
            Button::R2 => "R2",
            Button::L1 => "L1",
            Button::R1 => "R1",
            Button::Triangle => "TRIANGLE",
            Button::Circle => "CIRCLE",
            Button::Cross => "CROSS",
            Button::Square => "SQUARE",
        }
    }
}

/// Button state in wire order. A cleared bit means pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonSnapshot {
    pub buttons1: u8,
    pub buttons2: u8,
}

impl ButtonSnapshot {
    /// Nothing pressed.
    pub const RELEASED: Self = Self { buttons1: 0xFF, buttons2: 0xFF };

    pub const fn new(buttons1: u8, buttons2: u8) -> Self {
        Self { buttons1, buttons2 }
    }

    /// Build a snapshot from the set of pressed buttons.
    pub fn from_pressed(pressed: impl IntoIterator<Item = Button>) -> Self {
        let mut snapshot = Self::RELEASED;
        for button in pressed {
            snapshot.press(button);
        }
        snapshot
    }

    pub fn press(&mut self, button: Button) {
        let (byte, mask) = button.position();
        *self.byte_mut(byte) &= !mask;
    }

    pub fn release(&mut self, button: Button) {
        let (byte, mask) = button.position();
        *self.byte_mut(byte) |= mask;
    }

    pub const fn is_pressed(&self, button: Button) -> bool {
        let (byte, mask) = button.position();
        let value = if byte == 0 { self.buttons1 } else { self.buttons2 };
        value & mask == 0
    }

    pub fn pressed(&self) -> impl Iterator<Item = Button> + '_ {
        Button::ALL.into_iter().filter(|b| self.is_pressed(*b))
    }

    fn byte_mut(&mut self, byte: usize) -> &mut u8 {
        if byte == 0 {
            &mut self.buttons1
        } else {
            &mut self.buttons2
        }
    }

    /// Accumulate presses: a button pressed in either snapshot stays pressed.
    pub const fn latch(self, other: Self) -> Self {
        Self {
            buttons1: self.buttons1 & other.buttons1,
            buttons2: self.buttons2 & other.buttons2,
        }
    }

    /// Neutralise opposite directions held together.
    ///
    /// Left with right releases both, and up with down releases both; the
    /// two axes are handled independently.
    pub fn socd_cleaned(mut self) -> Self {
        if self.is_pressed(Button::Left) && self.is_pressed(Button::Right) {
            self.release(Button::Left);
            self.release(Button::Right);
        }
        if self.is_pressed(Button::Up) && self.is_pressed(Button::Down) {
            self.release(Button::Up);
            self.release(Button::Down);
        }
        self
    }

    pub(crate) const fn pack(self) -> u16 {
        (self.buttons1 as u16) | ((self.buttons2 as u16) << 8)
    }

    pub(crate) const fn unpack(raw: u16) -> Self {
        Self { buttons1: raw as u8, buttons2: (raw >> 8) as u8 }
    }
}

impl Default for ButtonSnapshot {
    fn default() -> Self {
        Self::RELEASED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_matches_wire_layout() {
        let all = ButtonSnapshot::from_pressed(Button::ALL);
        // L3 and R3 are never reported.
        assert_eq!(all, ButtonSnapshot::new(0b0000_0110, 0x00));

        let s = ButtonSnapshot::from_pressed([Button::Start, Button::Cross]);
        assert_eq!(s.buttons1, 0xF7);
        assert_eq!(s.buttons2, 0xBF);
    }

    #[test]
    fn socd_neutralises_each_axis_independently() {
        let s = ButtonSnapshot::from_pressed([Button::Up, Button::Down])
            .socd_cleaned();
        assert_eq!(s, ButtonSnapshot::RELEASED);

        let s = ButtonSnapshot::from_pressed([
            Button::Left,
            Button::Right,
            Button::Up,
        ])
        .socd_cleaned();
        assert!(s.is_pressed(Button::Up));
        assert!(!s.is_pressed(Button::Left));
        assert!(!s.is_pressed(Button::Right));

        let s = ButtonSnapshot::from_pressed([Button::Down, Button::Left])
            .socd_cleaned();
        assert!(s.is_pressed(Button::Down));
        assert!(s.is_pressed(Button::Left));
    }

    #[test]
    fn latch_keeps_presses_from_either_side() {
        let a = ButtonSnapshot::from_pressed([Button::Cross]);
        let b = ButtonSnapshot::from_pressed([Button::Start]);
        let l = a.latch(b);
        assert!(l.is_pressed(Button::Cross));
        assert!(l.is_pressed(Button::Start));
        assert!(!l.is_pressed(Button::Circle));
    }

    #[test]
    fn pack_roundtrips_byte_order() {
        let s = ButtonSnapshot::new(0x12, 0x34);
        assert_eq!(s.pack(), 0x3412);
        assert_eq!(ButtonSnapshot::unpack(0x3412), s);
    }
}
