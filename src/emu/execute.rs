use super::{
    Chip8Error, FONT_GLYPH_SIZE, FONT_START_ADDRESS, Instruction, OpcodeClass, Processor, State,
};

impl Processor {
    /// Dispatches on the opcode class. PC has already been advanced past `ins`.
    pub(crate) fn execute(&mut self, ins: Instruction) -> Result<(), Chip8Error> {
        let Instruction { nnn, nn, n, x, y, .. } = ins;

        match ins.opcode_class() {
            OpcodeClass::ClearOrReturn => match n.get() {
                0x0 => self.display.clear(),
                0xE => self.pc = self.memory.pop()?,
                _ => ignored(ins),
            },
            OpcodeClass::Jump => self.pc = nnn,
            OpcodeClass::Call => {
                self.memory.push(self.pc)?;
                self.pc = nnn;
            }
            OpcodeClass::SkipIfEqualImm => self.skip_if(self.memory.v[x] == nn),
            OpcodeClass::SkipIfNotEqualImm => self.skip_if(self.memory.v[x] != nn),
            OpcodeClass::SkipIfEqualReg => self.skip_if(self.memory.v[x] == self.memory.v[y]),
            OpcodeClass::SetImm => self.memory.v[x] = nn,
            OpcodeClass::AddImm => self.memory.v[x] = self.memory.v[x].wrapping_add(nn),
            OpcodeClass::Arithmetic => self.execute_alu(ins),
            OpcodeClass::SkipIfNotEqualReg => self.skip_if(self.memory.v[x] != self.memory.v[y]),
            OpcodeClass::SetIndex => self.memory.i = nnn,
            OpcodeClass::JumpWithOffset => self.pc = nnn.wrapping_add(self.memory.v[0].into()),
            OpcodeClass::Random => self.memory.v[x] = self.rng.next_byte() & nn,
            OpcodeClass::Draw => self.execute_draw(ins)?,
            OpcodeClass::SkipOnKey => match nn {
                0x9E => self.skip_if(self.memory.v[x] == self.current_key),
                0xA1 => self.skip_if(self.memory.v[x] != self.current_key),
                _ => ignored(ins),
            },
            OpcodeClass::Misc => self.execute_misc(ins)?,
        }

        Ok(())
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc = self.pc.wrapping_add(2);
        }
    }

    /// 8XYN. VF is written before Vx, so with X=F the result wins.
    fn execute_alu(&mut self, ins: Instruction) {
        let Instruction { x, y, .. } = ins;
        let vx = self.memory.v[x];
        let vy = self.memory.v[y];
        let inverted_sub_flag = self.quirks.inverted_sub_flag;
        let reread = self.quirks.operands_after_flag;
        let v = &mut self.memory.v;

        match ins.n.get() {
            0x0 => v[x] = vy,
            0x1 => v[x] = vx | vy,
            0x2 => v[x] = vx & vy,
            0x3 => v[x] = vx ^ vy,
            0x4 => {
                let (sum, carry) = vx.overflowing_add(vy);
                v[0xF] = u8::from(carry);
                v[x] = sum;
            }
            0x5 => {
                let borrow = vy > vx;
                v[0xF] = u8::from(borrow == inverted_sub_flag);
                let (vx, vy) = if reread { (v[x], v[y]) } else { (vx, vy) };
                v[x] = vx.wrapping_sub(vy);
            }
            0x6 => {
                v[0xF] = vx & 1;
                let vx = if reread { v[x] } else { vx };
                v[x] = vx >> 1;
            }
            0x7 => {
                let borrow = vx > vy;
                v[0xF] = u8::from(borrow == inverted_sub_flag);
                let (vx, vy) = if reread { (v[x], v[y]) } else { (vx, vy) };
                v[x] = vy.wrapping_sub(vx);
            }
            0xE => {
                v[0xF] = if self.quirks.shift_left_flag_by_three {
                    vx >> 3
                } else {
                    vx >> 7
                };
                let vx = if reread { v[x] } else { vx };
                v[x] = vx << 1;
            }
            _ => ignored(ins),
        }
    }

    /// DXYN: XOR an N-row sprite from `RAM[I..]` onto the display at (Vx, Vy),
    /// wrapping around both edges. VF is set when any lit pixel is erased.
    ///
    /// With `operands_after_flag`, Vx and Vy are read per pixel after VF is
    /// cleared, so a VF origin moves as soon as a collision sets the flag.
    fn execute_draw(&mut self, ins: Instruction) -> Result<(), Chip8Error> {
        let origin = (self.memory.v[ins.x], self.memory.v[ins.y]);
        let height = usize::from(ins.n);
        let base = usize::from(self.memory.i);

        // Read the whole sprite up front so a bad address leaves the display untouched
        let mut sprite = [0u8; 15];
        for (row, byte) in sprite.iter_mut().take(height).enumerate() {
            *byte = self.memory.read(base + row)?;
        }

        self.memory.v[0xF] = 0;
        for (row, &byte) in sprite[..height].iter().enumerate() {
            for bit in 0..8u8 {
                let (origin_x, origin_y) = if self.quirks.operands_after_flag {
                    (self.memory.v[ins.x], self.memory.v[ins.y])
                } else {
                    origin
                };
                let sprite_bit = (byte >> (7 - bit)) & 1 != 0;
                let column = usize::from(origin_x) + usize::from(bit);
                let line = usize::from(origin_y) + row;
                if self.display.xor_pixel(column, line, sprite_bit) {
                    self.memory.v[0xF] = 1;
                }
            }
        }

        Ok(())
    }

    /// FXNN, dispatched on NN.
    fn execute_misc(&mut self, ins: Instruction) -> Result<(), Chip8Error> {
        let x = ins.x;
        let i = usize::from(self.memory.i);

        match ins.nn {
            0x07 => self.memory.v[x] = self.delay_timer,
            0x0A => {
                self.state = State::AwaitingKey { register: x };
                log::debug!("waiting for key into V{:X}", x);
            }
            0x15 => self.delay_timer = self.memory.v[x],
            // Sound is not emulated
            0x18 => {}
            0x1E => self.memory.i = self.memory.i.wrapping_add(self.memory.v[x].into()),
            0x29 => {
                self.memory.i = if self.quirks.font_pointer_through_ram {
                    self.memory
                        .read(FONT_GLYPH_SIZE * usize::from(x))?
                        .into()
                } else {
                    let digit = usize::from(self.memory.v[x] & 0x0F);
                    (FONT_START_ADDRESS + FONT_GLYPH_SIZE * digit) as u16
                };
            }
            0x33 => {
                let value = self.memory.v[x];
                let digits = [value / 100, (value / 10) % 10, value % 10];
                for (offset, digit) in digits.into_iter().enumerate() {
                    let addr = if self.quirks.bcd_single_address {
                        i
                    } else {
                        i + offset
                    };
                    self.memory.write(addr, digit)?;
                }
            }
            0x55 => {
                for reg_index in 0..self.transfer_count(ins) {
                    let value = self.memory.v[reg_index];
                    self.memory.write(i + reg_index, value)?;
                }
            }
            0x65 => {
                for reg_index in 0..self.transfer_count(ins) {
                    self.memory.v[reg_index] = self.memory.read(i + reg_index)?;
                }
            }
            _ => ignored(ins),
        }

        Ok(())
    }

    /// Number of registers moved by FX55/FX65.
    fn transfer_count(&self, ins: Instruction) -> usize {
        if self.quirks.exclusive_register_transfer {
            usize::from(ins.x)
        } else {
            usize::from(ins.x) + 1
        }
    }
}

fn ignored(ins: Instruction) {
    log::warn!("ignoring unsupported instruction {:04X}", ins.word);
}

#[cfg(test)]
mod tests {
    use crate::emu::{
        Chip8Error, DISPLAY_X, Processor, Quirks, State, TickResult, random::FixedRandom,
    };

    fn rom(words: &[u16]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    fn run_with(quirks: Quirks, words: &[u16], ticks: usize) -> Processor {
        let mut cpu =
            Processor::with_config(&rom(words), quirks, Box::new(FixedRandom(0xAB))).unwrap();
        for _ in 0..ticks {
            cpu.tick().unwrap();
        }
        cpu
    }

    fn run(words: &[u16], ticks: usize) -> Processor {
        run_with(Quirks::legacy(), words, ticks)
    }

    #[test]
    fn set_then_skip_if_equal_always_skips() {
        for x in 0..16u16 {
            let cpu = run(&[0x6000 | x << 8 | 0x5A, 0x3000 | x << 8 | 0x5A], 2);
            assert_eq!(cpu.pc(), 0x206, "V{x:X}");
        }
    }

    #[test]
    fn skip_if_not_equal_immediate() {
        let cpu = run(&[0x6105, 0x4105], 2);
        assert_eq!(cpu.pc(), 0x204);
        let cpu = run(&[0x6105, 0x4106], 2);
        assert_eq!(cpu.pc(), 0x206);
    }

    #[test]
    fn skip_on_register_comparison() {
        let cpu = run(&[0x6107, 0x6207, 0x5120], 3);
        assert_eq!(cpu.pc(), 0x208);
        let cpu = run(&[0x6107, 0x6207, 0x9120], 3);
        assert_eq!(cpu.pc(), 0x206);
        let cpu = run(&[0x6107, 0x6208, 0x9120], 3);
        assert_eq!(cpu.pc(), 0x208);
    }

    #[test]
    fn add_immediate_wraps_without_touching_vf() {
        let cpu = run(&[0x6F07, 0x61FF, 0x7102], 3);
        assert_eq!(cpu.registers()[1], 0x01);
        assert_eq!(cpu.registers()[0xF], 0x07);
    }

    #[test]
    fn logic_operations() {
        let cpu = run(&[0x610C, 0x620A, 0x8121], 3);
        assert_eq!(cpu.registers()[1], 0x0E);
        let cpu = run(&[0x610C, 0x620A, 0x8122], 3);
        assert_eq!(cpu.registers()[1], 0x08);
        let cpu = run(&[0x610C, 0x620A, 0x8123], 3);
        assert_eq!(cpu.registers()[1], 0x06);
        let cpu = run(&[0x610C, 0x620A, 0x8120], 3);
        assert_eq!(cpu.registers()[1], 0x0A);
    }

    #[test]
    fn add_sets_carry() {
        let cpu = run(&[0x61FF, 0x6201, 0x8124], 3);
        assert_eq!(cpu.registers()[1], 0x00);
        assert_eq!(cpu.registers()[0xF], 1);

        let cpu = run(&[0x6F01, 0x6110, 0x6201, 0x8124], 4);
        assert_eq!(cpu.registers()[1], 0x11);
        assert_eq!(cpu.registers()[0xF], 0);
    }

    #[test]
    fn result_overwrites_flag_when_target_is_vf() {
        let cpu = run(&[0x6F10, 0x6203, 0x8F24], 3);
        assert_eq!(cpu.registers()[0xF], 0x13);
    }

    #[test]
    fn legacy_sub_flags_a_borrow() {
        let cpu = run(&[0x6101, 0x6202, 0x8125], 3);
        assert_eq!(cpu.registers()[1], 0xFF);
        assert_eq!(cpu.registers()[0xF], 1);

        let cpu = run(&[0x6105, 0x6203, 0x8125], 3);
        assert_eq!(cpu.registers()[1], 0x02);
        assert_eq!(cpu.registers()[0xF], 0);
    }

    #[test]
    fn compliant_sub_flags_no_borrow() {
        let cpu = run_with(Quirks::compliant(), &[0x6101, 0x6202, 0x8125], 3);
        assert_eq!(cpu.registers()[1], 0xFF);
        assert_eq!(cpu.registers()[0xF], 0);

        let cpu = run_with(Quirks::compliant(), &[0x6105, 0x6205, 0x8125], 3);
        assert_eq!(cpu.registers()[1], 0x00);
        assert_eq!(cpu.registers()[0xF], 1);
    }

    #[test]
    fn reverse_sub() {
        let cpu = run(&[0x6105, 0x6203, 0x8127], 3);
        assert_eq!(cpu.registers()[1], 0xFE);
        assert_eq!(cpu.registers()[0xF], 1);

        let cpu = run_with(Quirks::compliant(), &[0x6105, 0x6203, 0x8127], 3);
        assert_eq!(cpu.registers()[1], 0xFE);
        assert_eq!(cpu.registers()[0xF], 0);

        let cpu = run(&[0x6103, 0x6205, 0x8127], 3);
        assert_eq!(cpu.registers()[1], 0x02);
        assert_eq!(cpu.registers()[0xF], 0);
    }

    #[test]
    fn legacy_sub_reads_vf_operand_after_flag() {
        let cpu = run(&[0x6105, 0x6F03, 0x81F5], 3);
        assert_eq!(cpu.registers()[0xF], 0);
        assert_eq!(cpu.registers()[1], 0x05);

        let cpu = run_with(Quirks::compliant(), &[0x6105, 0x6F03, 0x81F5], 3);
        assert_eq!(cpu.registers()[0xF], 1);
        assert_eq!(cpu.registers()[1], 0x02);
    }

    #[test]
    fn legacy_reverse_sub_reads_vf_operand_after_flag() {
        let cpu = run(&[0x6103, 0x6F05, 0x81F7], 3);
        assert_eq!(cpu.registers()[0xF], 0);
        assert_eq!(cpu.registers()[1], 0xFD);

        let cpu = run_with(Quirks::compliant(), &[0x6103, 0x6F05, 0x81F7], 3);
        assert_eq!(cpu.registers()[0xF], 1);
        assert_eq!(cpu.registers()[1], 0x02);
    }

    #[test]
    fn legacy_shifts_of_vf_operate_on_the_new_flag() {
        let cpu = run(&[0x6F81, 0x8FFE], 2);
        assert_eq!(cpu.registers()[0xF], 0x20);
        let cpu = run_with(Quirks::compliant(), &[0x6F81, 0x8FFE], 2);
        assert_eq!(cpu.registers()[0xF], 0x02);

        let cpu = run(&[0x6F05, 0x8FF6], 2);
        assert_eq!(cpu.registers()[0xF], 0x00);
        let cpu = run_with(Quirks::compliant(), &[0x6F05, 0x8FF6], 2);
        assert_eq!(cpu.registers()[0xF], 0x02);
    }

    #[test]
    fn legacy_draw_with_vf_origin_uses_cleared_flag() {
        // Glyph '0' with VF = 10 as the x origin, row 5
        let words = [0x6F0A, 0x6105, 0xA000, 0xDF15];
        let cpu = run(&words, 4);
        assert!(cpu.display().pixel(0, 5));
        assert!(!cpu.display().pixel(10, 5));

        let cpu = run_with(Quirks::compliant(), &words, 4);
        assert!(cpu.display().pixel(10, 5));
        assert!(!cpu.display().pixel(0, 5));
    }

    #[test]
    fn shift_right_keeps_lsb_in_vf() {
        let cpu = run(&[0x6105, 0x6280, 0x8126], 3);
        assert_eq!(cpu.registers()[1], 0x02);
        assert_eq!(cpu.registers()[0xF], 1);
    }

    #[test]
    fn shift_left_flag() {
        let cpu = run(&[0x6181, 0x811E], 2);
        assert_eq!(cpu.registers()[1], 0x02);
        assert_eq!(cpu.registers()[0xF], 0x10);

        let cpu = run_with(Quirks::compliant(), &[0x6181, 0x811E], 2);
        assert_eq!(cpu.registers()[1], 0x02);
        assert_eq!(cpu.registers()[0xF], 1);
    }

    #[test]
    fn jumps() {
        let cpu = run(&[0x1234], 1);
        assert_eq!(cpu.pc(), 0x234);

        let cpu = run(&[0x6004, 0xB300], 2);
        assert_eq!(cpu.pc(), 0x304);
    }

    #[test]
    fn call_then_return_resumes_after_call() {
        let mut cpu = run(&[0x2206, 0x0000, 0x0000, 0x00EE], 1);
        assert_eq!(cpu.pc(), 0x206);
        assert_eq!(cpu.stack(), &[0x202]);

        cpu.tick().unwrap();
        assert_eq!(cpu.pc(), 0x202);
        assert!(cpu.stack().is_empty());
    }

    #[test]
    fn return_with_empty_stack_fails() {
        let mut cpu = run(&[0x00EE], 0);
        assert_eq!(cpu.tick(), Err(Chip8Error::StackUnderflow));
    }

    #[test]
    fn recursion_past_sixteen_levels_fails() {
        let mut cpu = run(&[0x2200], 16);
        assert_eq!(cpu.stack().len(), 16);
        assert_eq!(cpu.tick(), Err(Chip8Error::StackOverflow { depth: 16 }));
    }

    #[test]
    fn index_register_ops() {
        let cpu = run(&[0xA123], 1);
        assert_eq!(cpu.i(), 0x123);

        let cpu = run(&[0xAFFF, 0x6102, 0xF11E], 3);
        assert_eq!(cpu.i(), 0x1001);
    }

    #[test]
    fn random_is_masked() {
        let cpu = run(&[0xC10F], 1);
        assert_eq!(cpu.registers()[1], 0x0B);
    }

    #[test]
    fn clear_screen() {
        let mut cpu = run(&[0xA000, 0xD005, 0x00E0], 2);
        assert!(cpu.display().lit_count() > 0);
        cpu.tick().unwrap();
        assert_eq!(cpu.display().lit_count(), 0);
    }

    #[test]
    fn drawing_twice_restores_display_and_reports_collision() {
        // Glyph 'A' at (10, 5), drawn twice
        let mut cpu = run(&[0xA032, 0x600A, 0x6105, 0xD015, 0xD015], 3);
        let before = cpu.display().snapshot();

        cpu.tick().unwrap();
        assert_eq!(cpu.registers()[0xF], 0);
        assert_eq!(cpu.display().lit_count(), 4 + 2 + 4 + 2 + 2);
        assert!(cpu.display().pixel(10, 5));
        assert!(!cpu.display().pixel(11, 6));

        cpu.tick().unwrap();
        assert_eq!(cpu.registers()[0xF], 1);
        assert_eq!(cpu.display().snapshot(), before);
    }

    #[test]
    fn sprite_wraps_around_edges() {
        let mut words = vec![0x603F, 0x611F, 0xA20A, 0xD012, 0x1208];
        words.push(0xFF81);
        let cpu = run(&words, 4);
        let display = cpu.display();

        // Row 31: 0xFF from column 63 wraps to columns 0-6
        assert!(display.pixel(DISPLAY_X - 1, 31));
        for col in 0..7 {
            assert!(display.pixel(col, 31), "col {col}");
        }
        assert!(!display.pixel(7, 31));

        // Row 0: 0x81 lights column 63 and wrapped column 6
        assert!(display.pixel(63, 0));
        assert!(display.pixel(6, 0));
        assert!(!display.pixel(0, 0));
        assert_eq!(display.lit_count(), 10);
    }

    #[test]
    fn partial_collision_still_sets_vf() {
        // 0xC0 then 0x60 at the same spot: only column 1 collides
        let words = [0xA20A, 0xD001, 0xA20B, 0xD001, 0x1208, 0xC060];
        let cpu = run(&words, 4);
        assert_eq!(cpu.registers()[0xF], 1);
        assert!(cpu.display().pixel(0, 0));
        assert!(!cpu.display().pixel(1, 0));
        assert!(cpu.display().pixel(2, 0));
    }

    #[test]
    fn sprite_read_past_memory_fails_without_drawing() {
        let mut cpu = run(&[0xAFFF, 0xD002], 1);
        assert_eq!(
            cpu.tick(),
            Err(Chip8Error::MemoryOutOfBounds { address: 0x1000 })
        );
        assert_eq!(cpu.display().lit_count(), 0);
    }

    #[test]
    fn key_skips_compare_against_current_key() {
        let mut cpu = run(&[0x6107, 0xE19E], 1);
        cpu.set_key(0x7);
        cpu.tick().unwrap();
        assert_eq!(cpu.pc(), 0x206);

        let mut cpu = run(&[0x6107, 0xE1A1], 1);
        cpu.set_key(0x7);
        cpu.tick().unwrap();
        assert_eq!(cpu.pc(), 0x204);

        let mut cpu = run(&[0x6107, 0xE1A1], 1);
        cpu.set_key(0x3);
        cpu.tick().unwrap();
        assert_eq!(cpu.pc(), 0x206);
    }

    #[test]
    fn no_key_matches_register_holding_zero() {
        let cpu = run(&[0xE19E], 1);
        assert_eq!(cpu.pc(), 0x204);
    }

    #[test]
    fn delay_timer_round_trip() {
        let mut cpu = run(&[0x6130, 0xF115, 0xF207], 2);
        cpu.timer_tick();
        cpu.tick().unwrap();
        assert_eq!(cpu.registers()[2], 0x2F);
    }

    #[test]
    fn wait_for_key_enters_awaiting_state() {
        let cpu = run(&[0xF30A], 1);
        assert_eq!(cpu.state(), State::AwaitingKey { register: crate::u4::new(3) });
    }

    #[test]
    fn sound_timer_is_a_no_op() {
        let mut cpu = run(&[0x6105, 0xF118], 1);
        assert_eq!(cpu.tick(), Ok(TickResult::Executed));
        assert_eq!(cpu.pc(), 0x204);
        assert_eq!(cpu.registers()[1], 0x05);
        assert_eq!(cpu.delay_timer(), 0);
    }

    #[test]
    fn legacy_font_pointer_reads_through_ram() {
        // RAM[5 * 2] is the first row of glyph '2'
        let cpu = run(&[0x620A, 0xF229], 2);
        assert_eq!(cpu.i(), 0xF0);
    }

    #[test]
    fn compliant_font_pointer_addresses_glyph() {
        let cpu = run_with(Quirks::compliant(), &[0x621A, 0xF229], 2);
        assert_eq!(cpu.i(), 5 * 0xA);
    }

    #[test]
    fn legacy_bcd_writes_one_address() {
        let cpu = run(&[0x61EA, 0xA300, 0xF133], 3);
        let ram = cpu.memory().ram();
        assert_eq!(&ram[0x300..0x303], &[4, 0, 0]);
    }

    #[test]
    fn compliant_bcd_writes_three_addresses() {
        let cpu = run_with(Quirks::compliant(), &[0x61EA, 0xA300, 0xF133], 3);
        let ram = cpu.memory().ram();
        assert_eq!(&ram[0x300..0x303], &[2, 3, 4]);
        assert_eq!(cpu.i(), 0x300);
    }

    #[test]
    fn register_dump_and_load() {
        let words = [0x6011, 0x6122, 0x6233, 0x6344, 0xA300, 0xF355];
        let cpu = run(&words, 6);
        assert_eq!(&cpu.memory().ram()[0x300..0x304], &[0x11, 0x22, 0x33, 0x00]);
        assert_eq!(cpu.i(), 0x300);

        let cpu = run_with(Quirks::compliant(), &words, 6);
        assert_eq!(&cpu.memory().ram()[0x300..0x304], &[0x11, 0x22, 0x33, 0x44]);

        // Load glyph '0' rows back into registers
        let cpu = run(&[0xA000, 0xF365], 2);
        assert_eq!(&cpu.registers()[0..4], &[0xF0, 0x90, 0x90, 0x00]);
        let cpu = run_with(Quirks::compliant(), &[0xA000, 0xF365], 2);
        assert_eq!(&cpu.registers()[0..4], &[0xF0, 0x90, 0x90, 0x90]);
    }

    #[test]
    fn register_dump_past_memory_fails() {
        let mut cpu = run_with(Quirks::compliant(), &[0xAFFE, 0xF355], 1);
        assert_eq!(
            cpu.tick(),
            Err(Chip8Error::MemoryOutOfBounds { address: 0x1000 })
        );
    }

    #[test]
    fn unknown_sub_operations_only_advance_pc() {
        for word in [0x0123u16, 0x8008, 0xE0FF, 0xF0FF] {
            let cpu = run(&[0x6F05, word], 2);
            assert_eq!(cpu.pc(), 0x204, "{word:04X}");
            assert_eq!(cpu.registers()[0xF], 5);
            assert_eq!(cpu.current_instruction().map(|i| i.word), Some(word));
        }
    }
}
