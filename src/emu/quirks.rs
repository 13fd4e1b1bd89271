/// Switches for instruction behaviors where this machine's reference
/// behavior departs from the canonical CHIP-8 documentation.
///
/// The default is [`Quirks::legacy`], which reproduces the reference
/// behavior bit for bit, except that calls nest at most 16 levels deep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// 8XY5 sets VF=1 when Vy > Vx and 8XY7 sets VF=1 when Vx > Vy,
    /// i.e. VF flags a borrow instead of its absence.
    pub inverted_sub_flag: bool,
    /// 8XYE sets VF = Vx >> 3 instead of the most significant bit.
    pub shift_left_flag_by_three: bool,
    /// FX33 writes hundreds, tens and ones all to `RAM[I]`.
    pub bcd_single_address: bool,
    /// FX29 loads I from `RAM[5 * X]` instead of pointing at the glyph for Vx.
    pub font_pointer_through_ram: bool,
    /// FX55/FX65 transfer V0..V(X-1) instead of V0..=VX.
    pub exclusive_register_transfer: bool,
    /// 8XY5/6/7/E and DXYN read their operand registers after VF has been
    /// written, so VF as an operand sees the new flag.
    pub operands_after_flag: bool,
}

impl Quirks {
    pub const fn legacy() -> Self {
        Quirks {
            inverted_sub_flag: true,
            shift_left_flag_by_three: true,
            bcd_single_address: true,
            font_pointer_through_ram: true,
            exclusive_register_transfer: true,
            operands_after_flag: true,
        }
    }

    pub const fn compliant() -> Self {
        Quirks {
            inverted_sub_flag: false,
            shift_left_flag_by_three: false,
            bcd_single_address: false,
            font_pointer_through_ram: false,
            exclusive_register_transfer: false,
            operands_after_flag: false,
        }
    }
}

impl Default for Quirks {
    fn default() -> Self {
        Quirks::legacy()
    }
}

/// Named quirk presets, selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Profile {
    /// Reproduce the reference interpreter exactly
    #[default]
    Legacy,
    /// Follow the canonical CHIP-8 documentation
    Compliant,
}

impl From<Profile> for Quirks {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Legacy => Quirks::legacy(),
            Profile::Compliant => Quirks::compliant(),
        }
    }
}
