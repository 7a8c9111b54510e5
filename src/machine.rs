use crate::config::Config;
use crate::error::{Error, Result};
use crate::font;
use crate::framebuffer::{self, Framebuffer};
use crate::instruction::{Instruction, UnknownOpcode};
use crate::memory::{AddressSpace, PROGRAM_ORIGIN, STACK_BASE};
use crate::timer::Timers;
use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const REGISTER_COUNT: usize = 16;
pub const KEY_COUNT: usize = 16;
/// Register index of VF, the flag register.
const FLAG: usize = 0xF;

wrapper! {
    RegisterArray => REGISTER_COUNT
}

/// What the program counter does after an instruction.
enum Flow {
    Next,
    Skip,
    Jump(u16),
    Stay,
}

/// The whole CHIP-8 machine: registers, memory, timers, keypad and display.
#[derive(Debug)]
pub struct Machine {
    i: u16,                   // Index register
    pc: u16,                  // Program counter
    sp: u16,                  // Stack pointer
    memory: AddressSpace,     // Memory
    display: Framebuffer,     // Display
    timers: Timers,           // Delay and sound timers
    registers: RegisterArray, // Variable registers (V0..=VF)
    keys: [bool; KEY_COUNT],  // Keypad
    halted: bool,             // Waiting in Fx0A
    stack_depth: usize,       // Maximum nested calls
    rng: StdRng,
}

impl Default for Machine {
    fn default() -> Self {
        Self::from_parts(Config::default().stack_depth, StdRng::from_entropy())
    }
}

impl Machine {
    pub fn new() -> Self {
        Default::default()
    }

    /// A zeroed machine with the limits and random source from `config`.
    pub fn with_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self::from_parts(config.stack_depth, rng))
    }

    fn from_parts(stack_depth: usize, rng: StdRng) -> Self {
        Self {
            i: 0,
            pc: PROGRAM_ORIGIN,
            sp: STACK_BASE,
            memory: AddressSpace::default(),
            display: Framebuffer::default(),
            timers: Timers::default(),
            registers: RegisterArray::default(),
            keys: [false; KEY_COUNT],
            halted: false,
            stack_depth,
            rng,
        }
    }

    /// Resets the machine and loads `program` at the origin.
    ///
    /// Key states survive a reload since they mirror the host keyboard.
    pub fn load(&mut self, program: &[u8]) -> Result<()> {
        self.memory.load(program)?;
        self.i = 0;
        self.pc = PROGRAM_ORIGIN;
        self.sp = STACK_BASE;
        self.display = Framebuffer::default();
        self.display.touch();
        self.timers = Timers::default();
        self.registers = RegisterArray::default();
        self.halted = false;
        info!("Reset machine [pc: {:#05X}]", self.pc);
        Ok(())
    }

    /// Fetches and decodes the instruction at the program counter.
    pub fn fetch(&self) -> Result<Instruction> {
        let word = self.memory.read_word(self.pc as usize)?;
        Instruction::try_from(word).map_err(|UnknownOpcode(opcode)| Error::UnknownInstruction {
            opcode,
            address: self.pc,
        })
    }

    /// Executes exactly one instruction.
    pub fn step(&mut self) -> Result<()> {
        let inst = self.fetch()?;
        debug!("{:#05X}: {}", self.pc, inst);
        self.execute(inst)
    }

    /// Applies `inst` as though it had been fetched from the program counter.
    pub fn execute(&mut self, inst: Instruction) -> Result<()> {
        use Instruction::*;

        let flow = match inst {
            Clear => {
                self.display.clear();
                Flow::Next
            }
            Return => Flow::Jump(self.pop()?.wrapping_add(2)),
            Jump(nnn) => Flow::Jump(nnn),
            Call(nnn) => {
                self.push(self.pc)?;
                Flow::Jump(nnn)
            }
            SkipIfEqual { x, nn } => self.skip_if(self.v(x) == nn),
            SkipIfNotEqual { x, nn } => self.skip_if(self.v(x) != nn),
            SkipIfRegistersEqual { x, y } => self.skip_if(self.v(x) == self.v(y)),
            Set { x, nn } => {
                self.set_v(x, nn);
                Flow::Next
            }
            Add { x, nn } => {
                self.set_v(x, self.v(x).wrapping_add(nn));
                Flow::Next
            }
            Move { x, y } => {
                self.set_v(x, self.v(y));
                Flow::Next
            }
            Or { x, y } => {
                self.set_v(x, self.v(x) | self.v(y));
                Flow::Next
            }
            And { x, y } => {
                self.set_v(x, self.v(x) & self.v(y));
                Flow::Next
            }
            Xor { x, y } => {
                self.set_v(x, self.v(x) ^ self.v(y));
                Flow::Next
            }
            AddRegisters { x, y } => {
                let (sum, carry) = self.v(x).overflowing_add(self.v(y));
                self.set_v(x, sum);
                self.set_flag(carry);
                Flow::Next
            }
            Subtract { x, y } => {
                let (vx, vy) = (self.v(x), self.v(y));
                self.set_v(x, vx.wrapping_sub(vy));
                self.set_flag(vy <= vx);
                Flow::Next
            }
            ShiftRight { x } => {
                let vx = self.v(x);
                self.set_v(x, vx >> 1);
                self.set_flag(vx & 0x01 != 0);
                Flow::Next
            }
            SubtractFrom { x, y } => {
                let (vx, vy) = (self.v(x), self.v(y));
                self.set_v(x, vy.wrapping_sub(vx));
                self.set_flag(vx <= vy);
                Flow::Next
            }
            ShiftLeft { x } => {
                let vx = self.v(x);
                self.set_v(x, vx << 1);
                self.set_flag(vx & 0x80 != 0);
                Flow::Next
            }
            SkipIfRegistersNotEqual { x, y } => self.skip_if(self.v(x) != self.v(y)),
            SetIndex(nnn) => {
                self.i = nnn;
                Flow::Next
            }
            JumpOffset(nnn) => {
                let target = usize::from(self.v(0)) + usize::from(nnn);
                Flow::Jump(AddressSpace::resolve(target)? as u16)
            }
            Random { x, nn } => {
                let value = self.rng.gen::<u8>() & nn;
                self.set_v(x, value);
                Flow::Next
            }
            Draw { x, y, n } => {
                self.draw(x, y, n)?;
                Flow::Next
            }
            SkipIfKeyDown { x } => self.skip_if(self.key(self.v(x))?),
            SkipIfKeyUp { x } => self.skip_if(!self.key(self.v(x))?),
            ReadDelay { x } => {
                self.set_v(x, self.timers.delay);
                Flow::Next
            }
            WaitKey { x } => match self.keys.iter().position(|&pressed| pressed) {
                Some(key) => {
                    self.halted = false;
                    self.set_v(x, key as u8);
                    debug!("Key wait satisfied by key {key:X}");
                    Flow::Next
                }
                None => {
                    if !self.halted {
                        debug!("Halted waiting for a key");
                    }
                    self.halted = true;
                    Flow::Stay
                }
            },
            SetDelay { x } => {
                self.timers.delay = self.v(x);
                Flow::Next
            }
            SetSound { x } => {
                self.timers.sound = self.v(x);
                Flow::Next
            }
            AddIndex { x } => {
                self.i = self.i.wrapping_add(u16::from(self.v(x)));
                Flow::Next
            }
            Glyph { x } => {
                self.i = font::glyph_address(self.v(x));
                Flow::Next
            }
            Bcd { x } => {
                let vx = self.v(x);
                let digits = self.memory.slice_mut(self.i as usize, 3)?;
                digits.copy_from_slice(&[vx / 100, (vx / 10) % 10, vx % 10]);
                Flow::Next
            }
            StoreRegisters { x } => {
                let count = usize::from(x) + 1;
                let dest = self.memory.slice_mut(self.i as usize, count)?;
                dest.copy_from_slice(&self.registers[..count]);
                Flow::Next
            }
            LoadRegisters { x } => {
                let count = usize::from(x) + 1;
                let src = self.memory.slice(self.i as usize, count)?;
                self.registers[..count].copy_from_slice(src);
                Flow::Next
            }
        };

        self.pc = match flow {
            Flow::Next => self.pc.wrapping_add(2),
            Flow::Skip => self.pc.wrapping_add(4),
            Flow::Jump(target) => target,
            Flow::Stay => self.pc,
        };
        Ok(())
    }

    /// One timer decrement cycle.
    pub fn tick_timers(&mut self) {
        self.timers.tick();
    }

    /// True while paused in an unsatisfied key wait.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Whether the display changed since the last call. Reading clears it.
    pub fn display_changed(&mut self) -> bool {
        self.display.take_changed()
    }

    pub fn framebuffer(&self) -> &[u8; framebuffer::BYTES] {
        self.display.as_bytes()
    }

    pub fn display(&self) -> &Framebuffer {
        &self.display
    }

    pub fn press(&mut self, key: u8) -> Result<()> {
        *self.key_mut(key)? = true;
        Ok(())
    }

    pub fn release(&mut self, key: u8) -> Result<()> {
        *self.key_mut(key)? = false;
        Ok(())
    }

    pub fn any_key_pressed(&self) -> bool {
        self.keys.contains(&true)
    }

    pub fn sound_active(&self) -> bool {
        self.timers.sound_active()
    }

    /// Reads V`index`. Only the low nibble of `index` is used.
    pub fn register(&self, index: usize) -> u8 {
        self.registers[index & 0xF]
    }

    /// Writes V`index`. Only the low nibble of `index` is used.
    pub fn set_register(&mut self, index: usize, value: u8) {
        self.registers[index & 0xF] = value;
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn sp(&self) -> u16 {
        self.sp
    }

    pub fn timers(&self) -> Timers {
        self.timers
    }

    pub fn memory(&self) -> &AddressSpace {
        &self.memory
    }

    /// Number of return addresses currently on the stack.
    pub fn call_depth(&self) -> usize {
        usize::from(self.sp - STACK_BASE) / 2
    }

    fn v(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }

    fn set_v(&mut self, register: u8, value: u8) {
        self.registers[register as usize] = value;
    }

    // VF is always written after the result so the flag wins when x is F.
    fn set_flag(&mut self, on: bool) {
        self.registers[FLAG] = u8::from(on);
    }

    fn skip_if(&self, condition: bool) -> Flow {
        if condition {
            Flow::Skip
        } else {
            Flow::Next
        }
    }

    fn key(&self, key: u8) -> Result<bool> {
        self.keys
            .get(key as usize)
            .copied()
            .ok_or(Error::InvalidKey(key))
    }

    fn key_mut(&mut self, key: u8) -> Result<&mut bool> {
        self.keys.get_mut(key as usize).ok_or(Error::InvalidKey(key))
    }

    fn push(&mut self, address: u16) -> Result<()> {
        if self.call_depth() >= self.stack_depth {
            return Err(Error::StackOverflow {
                depth: self.call_depth(),
            });
        }
        let sp = self.sp + 2;
        self.memory.write_word(sp as usize, address)?;
        self.sp = sp;
        trace!("Pushed {address:#05X} [depth: {}]", self.call_depth());
        Ok(())
    }

    fn pop(&mut self) -> Result<u16> {
        if self.sp <= STACK_BASE {
            return Err(Error::StackUnderflow { address: self.pc });
        }
        let address = self.memory.read_word(self.sp as usize)?;
        self.sp -= 2;
        trace!("Popped {address:#05X} [depth: {}]", self.call_depth());
        Ok(address)
    }

    fn draw(&mut self, x: u8, y: u8, height: u8) -> Result<()> {
        // VF is cleared before the coordinates are read, so Dxyn with x or y
        // equal to F draws at 0.
        self.set_flag(false);
        let x = self.v(x) as usize;
        let y = self.v(y) as usize;
        let sprite = self.memory.slice(self.i as usize, height as usize)?;
        trace!("Drawing sprite [x: {x}] [y: {y}] [height: {height}]");
        let mut collision = false;
        for (row, &bits) in sprite.iter().enumerate() {
            collision |= self.display.draw_row(x, y + row, bits);
        }
        self.display.touch();
        self.set_flag(collision);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(program: &[u8]) -> Machine {
        let mut machine = Machine::with_config(&Config {
            seed: Some(8),
            ..Default::default()
        })
        .unwrap();
        machine.load(program).unwrap();
        machine
    }

    #[test]
    fn draw_clears_flag_before_reading_coordinates() {
        // I := 0x208, VF := 10, draw one row at (VF, VF).
        let mut machine = machine(&[0xA2, 0x08, 0x6F, 0x0A, 0xDF, 0xF1, 0x00, 0x00, 0x80]);
        for _ in 0..3 {
            machine.step().unwrap();
        }
        assert!(machine.display().pixel(0, 0));
        assert!(!machine.display().pixel(10, 10));
        assert_eq!(machine.register(0xF), 0);
    }

    #[test]
    fn register_index_wraps_to_low_nibble() {
        let mut machine = Machine::new();
        machine.set_register(0x13, 0x42);
        assert_eq!(machine.register(3), 0x42);
        assert_eq!(machine.register(0x23), 0x42);
        assert_eq!(machine.register(0x1F), machine.register(0xF));
    }

    #[test]
    fn starts_at_origin() {
        let machine = Machine::new();
        assert_eq!(machine.pc(), PROGRAM_ORIGIN);
        assert_eq!(machine.sp(), STACK_BASE);
        assert!(!machine.is_halted());
    }

    #[test]
    fn add_immediate_wraps() {
        let mut machine = machine(&[0x70, 0x01]);
        machine.set_register(0, 0xFF);
        machine.step().unwrap();
        assert_eq!(machine.register(0), 0x00);
        // 7xnn never touches the flag.
        assert_eq!(machine.register(0xF), 0);
    }

    #[test]
    fn flag_wins_over_result_in_vf() {
        let mut machine = machine(&[0x8F, 0x14]);
        machine.set_register(0xF, 0xFF);
        machine.set_register(1, 0x02);
        machine.step().unwrap();
        assert_eq!(machine.register(0xF), 1);
    }

    #[test]
    fn shifts_capture_the_dropped_bit() {
        let mut machine = machine(&[0x81, 0x06, 0x82, 0x0E]);
        machine.set_register(1, 0b0000_0011);
        machine.set_register(2, 0b1000_0001);
        machine.step().unwrap();
        assert_eq!(machine.register(1), 0b0000_0001);
        assert_eq!(machine.register(0xF), 1);
        machine.step().unwrap();
        assert_eq!(machine.register(2), 0b0000_0010);
        assert_eq!(machine.register(0xF), 1);
    }

    #[test]
    fn random_is_masked() {
        let mut machine = machine(&[0xC0, 0x00, 0xC1, 0x0F]);
        machine.set_register(0, 0xAA);
        machine.step().unwrap();
        assert_eq!(machine.register(0), 0);
        machine.step().unwrap();
        assert_eq!(machine.register(1) & 0xF0, 0);
    }

    #[test]
    fn jump_with_offset_is_bounds_checked() {
        let mut machine = machine(&[0xB3, 0x00, 0x00, 0x00]);
        machine.set_register(0, 4);
        machine.step().unwrap();
        assert_eq!(machine.pc(), 0x304);

        let mut machine = self::machine(&[0xBF, 0xFF]);
        machine.set_register(0, 1);
        assert!(matches!(
            machine.step(),
            Err(Error::OutOfBounds { address: 0x1000 })
        ));
    }

    #[test]
    fn glyph_points_into_font() {
        let mut machine = machine(&[0xF3, 0x29]);
        machine.set_register(3, 0xB);
        machine.step().unwrap();
        assert_eq!(machine.index(), 55);
        assert_eq!(
            machine.memory().slice(55, 5).unwrap(),
            &[0xE0, 0x90, 0xE0, 0x90, 0xE0]
        );
    }

    #[test]
    fn register_block_transfer_leaves_index() {
        let mut machine = machine(&[0xA3, 0x00, 0xF2, 0x55, 0x60, 0x00, 0xF2, 0x65]);
        machine.set_register(0, 1);
        machine.set_register(1, 2);
        machine.set_register(2, 3);
        machine.set_register(3, 4);
        for _ in 0..2 {
            machine.step().unwrap();
        }
        assert_eq!(machine.memory().slice(0x300, 4).unwrap(), &[1, 2, 3, 0]);
        assert_eq!(machine.index(), 0x300);
        machine.step().unwrap();
        assert_eq!(machine.register(0), 0);
        machine.step().unwrap();
        assert_eq!(machine.register(0), 1);
        assert_eq!(machine.register(3), 4);
        assert_eq!(machine.index(), 0x300);
    }

    #[test]
    fn timers_load_and_read() {
        let mut machine = machine(&[0x60, 0x09, 0xF0, 0x15, 0xF0, 0x18, 0xF1, 0x07]);
        for _ in 0..3 {
            machine.step().unwrap();
        }
        assert!(machine.sound_active());
        machine.tick_timers();
        machine.step().unwrap();
        assert_eq!(machine.register(1), 8);
        assert_eq!(machine.timers(), Timers { delay: 8, sound: 8 });
    }

    #[test]
    fn stack_depth_is_enforced() {
        let mut machine = Machine::with_config(&Config {
            stack_depth: 2,
            ..Default::default()
        })
        .unwrap();
        // A subroutine that calls itself.
        machine.load(&[0x22, 0x00]).unwrap();
        machine.step().unwrap();
        machine.step().unwrap();
        assert_eq!(machine.call_depth(), 2);
        assert!(matches!(
            machine.step(),
            Err(Error::StackOverflow { depth: 2 })
        ));
        assert_eq!(machine.call_depth(), 2);
    }

    #[test]
    fn return_without_call_fails() {
        let mut machine = machine(&[0x00, 0xEE]);
        assert!(matches!(
            machine.step(),
            Err(Error::StackUnderflow { address: 0x200 })
        ));
    }

    #[test]
    fn unknown_instruction_reports_address() {
        let mut machine = machine(&[0x60, 0x01, 0x80, 0x08]);
        machine.step().unwrap();
        assert!(matches!(
            machine.step(),
            Err(Error::UnknownInstruction {
                opcode: 0x8008,
                address: 0x202
            })
        ));
        // Nothing was guessed at.
        assert_eq!(machine.pc(), 0x202);
    }

    #[test]
    fn key_skip_rejects_keys_off_the_pad() {
        let mut machine = machine(&[0xE0, 0x9E]);
        machine.set_register(0, 0x10);
        assert!(matches!(machine.step(), Err(Error::InvalidKey(0x10))));
        assert!(matches!(machine.press(16), Err(Error::InvalidKey(16))));
    }

    #[test]
    fn fetch_past_the_end_is_out_of_bounds() {
        let mut machine = machine(&[0x1F, 0xFF]);
        machine.step().unwrap();
        assert!(matches!(machine.step(), Err(Error::OutOfBounds { .. })));
    }
}
