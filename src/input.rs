use crate::bridge::DisplayBridge;
use crate::error::Result;
use std::collections::HashMap;
use winit::event::VirtualKeyCode;
use winit_input_helper::WinitInputHelper;

/// Generates a keymap from a mapping of QWERTY keys to keypad keys,
/// represented as a [`HashMap`](std::collections::HashMap).
macro_rules! keymap {
    ($($keycode:ident => $mapping:literal),*) => {
        lazy_static::lazy_static! {
            /// Host key codes and the keypad key each one stands for.
            pub static ref KEYMAP: HashMap<VirtualKeyCode, u8> = HashMap::from([
                $((VirtualKeyCode::$keycode, $mapping)),*
            ]);
        }
    };
}

// 1 2 3 C      1 2 3 4
// 4 5 6 D  <-  Q W E R
// 7 8 9 E      A S D F
// A 0 B F      Z X C V
keymap! {
    Key1 => 0x1,
    Key2 => 0x2,
    Key3 => 0x3,
    Key4 => 0xC,
    Q => 0x4,
    W => 0x5,
    E => 0x6,
    R => 0xD,
    A => 0x7,
    S => 0x8,
    D => 0x9,
    F => 0xE,
    Z => 0xA,
    X => 0x0,
    C => 0xB,
    V => 0xF
}

/// Per-frame key state as seen by the host window.
pub trait KeyEdges {
    fn pressed(&self, code: VirtualKeyCode) -> bool;
    fn released(&self, code: VirtualKeyCode) -> bool;
    fn held(&self, code: VirtualKeyCode) -> bool;
}

impl KeyEdges for WinitInputHelper {
    fn pressed(&self, code: VirtualKeyCode) -> bool {
        self.key_pressed(code)
    }

    fn released(&self, code: VirtualKeyCode) -> bool {
        self.key_released(code)
    }

    fn held(&self, code: VirtualKeyCode) -> bool {
        self.key_held(code)
    }
}

/// Forwards this frame's key edges to the machine.
///
/// A key tapped within a single frame is pressed and then released, so it
/// does not stay down.
pub fn forward(input: &impl KeyEdges, bridge: &DisplayBridge) -> Result<()> {
    for (&code, &key) in KEYMAP.iter() {
        let pressed = input.pressed(code);
        if pressed {
            bridge.press(key)?;
        }
        if (pressed || input.released(code)) && !input.held(code) {
            bridge.release(key)?;
        }
    }
    Ok(())
}
