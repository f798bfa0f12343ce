//! Command grammar
//!
//! Keywords are case-insensitive and `=` separates like whitespace, so
//! `CLK0=100`, `clk0 100` and `clk 0 100` all mean the same thing.
//!
//! ```text
//! help | h | ?
//! scan [all | strict]
//! ping | whoami | status | init | reset | recover
//! oe on|off
//! freq <MHz>                      CLK0
//! clk <ch> <MHz>
//! {freq,ch,clk,cll}<ch> <MHz>     cll is a common typo of clk
//! peek <reg>
//! poke <reg> <val>                reg: hex or register name, val: hex
//! ```
//!
//! A frequency of 0 MHz disables the channel.

use syntonic_core::si5351::registers;
use syntonic_core::si5351::Channel;

/// Prefixes that take the channel number glued on (`clk1`, `ch2`)
const CHANNEL_PREFIXES: [&str; 4] = ["freq", "clk", "ch", "cll"];

/// Thoroughness of a bus scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanMode {
    /// Stop at the first peer
    Quick,
    /// Probe every address and list all peers
    Thorough,
    /// Register-0 read on every address
    Strict,
}

/// A parsed console command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Help,
    Scan(ScanMode),
    Ping,
    Whoami,
    Status,
    Init,
    /// Enable or disable every output
    OutputEnable(bool),
    /// Set a channel's frequency; 0 disables
    SetChannel { channel: Channel, mhz: u32 },
    Peek { register: u8 },
    Poke { register: u8, value: u8 },
    /// Transport deinit/settle/init
    Reset,
    /// Bus clear followed by transport init
    Recover,
}

/// Why a line did not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Keyword not recognized
    Unknown,
    /// Keyword recognized, arguments missing or malformed
    Usage(&'static str),
    /// Channel outside 0..=2
    InvalidChannel(u32),
    /// Argument is not a number
    InvalidNumber,
}

/// Split on whitespace and `=`
fn tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_ascii_whitespace() || c == '=')
        .filter(|token| !token.is_empty())
}

fn parse_decimal(token: &str) -> Result<u32, CommandError> {
    token.parse().map_err(|_| CommandError::InvalidNumber)
}

fn parse_hex(token: &str) -> Result<u8, CommandError> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u8::from_str_radix(digits, 16).map_err(|_| CommandError::InvalidNumber)
}

/// Register by name or hex address
fn parse_register(token: &str) -> Result<u8, CommandError> {
    match registers::by_name(token) {
        Some(info) => Ok(info.address),
        None => parse_hex(token),
    }
}

fn parse_channel(index: u32) -> Result<Channel, CommandError> {
    u8::try_from(index)
        .ok()
        .and_then(Channel::new)
        .ok_or(CommandError::InvalidChannel(index))
}

/// Channel number glued to a known prefix, e.g. `clk1` -> 1
fn channel_suffix(key: &str) -> Option<&str> {
    CHANNEL_PREFIXES.iter().find_map(|prefix| {
        let head = key.get(..prefix.len())?;
        let rest = key.get(prefix.len()..)?;
        let numeric = !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit());
        (head.eq_ignore_ascii_case(prefix) && numeric).then_some(rest)
    })
}

/// Parse one console line
///
/// An empty or blank line is reported as [`CommandError::Unknown`]; callers
/// normally skip those before parsing.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let mut args = tokens(line);
    let key = args.next().ok_or(CommandError::Unknown)?;
    let is = |word: &str| key.eq_ignore_ascii_case(word);

    if is("help") || is("h") || is("?") {
        return Ok(Command::Help);
    }

    if is("scan") {
        return match args.next() {
            None => Ok(Command::Scan(ScanMode::Quick)),
            Some(mode) if mode.eq_ignore_ascii_case("all") => Ok(Command::Scan(ScanMode::Thorough)),
            Some(mode) if mode.eq_ignore_ascii_case("strict") => Ok(Command::Scan(ScanMode::Strict)),
            Some(_) => Err(CommandError::Usage("scan [all|strict]")),
        };
    }

    let simple = [
        ("ping", Command::Ping),
        ("whoami", Command::Whoami),
        ("status", Command::Status),
        ("init", Command::Init),
        ("reset", Command::Reset),
        ("recover", Command::Recover),
    ];
    if let Some(&(_, command)) = simple.iter().find(|&&(word, _)| is(word)) {
        return Ok(command);
    }

    if is("oe") {
        return match args.next() {
            Some(mode) if mode.eq_ignore_ascii_case("on") => Ok(Command::OutputEnable(true)),
            Some(mode) if mode.eq_ignore_ascii_case("off") => Ok(Command::OutputEnable(false)),
            _ => Err(CommandError::Usage("oe on|off")),
        };
    }

    if is("freq") {
        let mhz = args.next().ok_or(CommandError::Usage("freq <MHz>"))?;
        return Ok(Command::SetChannel {
            channel: Channel::Clk0,
            mhz: parse_decimal(mhz)?,
        });
    }

    if is("clk") {
        let (Some(channel), Some(mhz)) = (args.next(), args.next()) else {
            return Err(CommandError::Usage("clk <ch:0|1|2> <MHz>"));
        };
        return Ok(Command::SetChannel {
            channel: parse_channel(parse_decimal(channel)?)?,
            mhz: parse_decimal(mhz)?,
        });
    }

    if let Some(suffix) = channel_suffix(key) {
        let channel = parse_channel(parse_decimal(suffix)?)?;
        let mhz = args.next().ok_or(CommandError::Usage("clk<ch>=<MHz>"))?;
        return Ok(Command::SetChannel {
            channel,
            mhz: parse_decimal(mhz)?,
        });
    }

    if is("peek") {
        let register = args.next().ok_or(CommandError::Usage("peek <reg>"))?;
        return Ok(Command::Peek {
            register: parse_register(register)?,
        });
    }

    if is("poke") {
        let (Some(register), Some(value)) = (args.next(), args.next()) else {
            return Err(CommandError::Usage("poke <reg> <val>"));
        };
        return Ok(Command::Poke {
            register: parse_register(register)?,
            value: parse_hex(value)?,
        });
    }

    Err(CommandError::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::format;

    fn set(channel: Channel, mhz: u32) -> Result<Command, CommandError> {
        Ok(Command::SetChannel { channel, mhz })
    }

    #[test]
    fn test_help_aliases() {
        for line in ["help", "h", "H", "?", "HELP"] {
            assert_eq!(parse(line), Ok(Command::Help));
        }
    }

    #[test]
    fn test_scan_modes() {
        assert_eq!(parse("scan"), Ok(Command::Scan(ScanMode::Quick)));
        assert_eq!(parse("SCAN all"), Ok(Command::Scan(ScanMode::Thorough)));
        assert_eq!(parse("scan Strict"), Ok(Command::Scan(ScanMode::Strict)));
        assert!(matches!(parse("scan fast"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("ping"), Ok(Command::Ping));
        assert_eq!(parse("WhoAmI"), Ok(Command::Whoami));
        assert_eq!(parse("status"), Ok(Command::Status));
        assert_eq!(parse("init"), Ok(Command::Init));
        assert_eq!(parse("reset"), Ok(Command::Reset));
        assert_eq!(parse("recover"), Ok(Command::Recover));
    }

    #[test]
    fn test_equals_is_separator() {
        assert_eq!(parse("clk0=100"), set(Channel::Clk0, 100));
        assert_eq!(parse("clk0 100"), set(Channel::Clk0, 100));
        assert_eq!(parse("clk 0 100"), set(Channel::Clk0, 100));
        assert_eq!(parse("clk=0=100"), set(Channel::Clk0, 100));
    }

    #[test]
    fn test_channel_prefixes() {
        assert_eq!(parse("freq1=50"), set(Channel::Clk1, 50));
        assert_eq!(parse("ch2=0"), set(Channel::Clk2, 0));
        assert_eq!(parse("CLL0=100"), set(Channel::Clk0, 100));
        assert_eq!(parse("Clk2 25"), set(Channel::Clk2, 25));
        assert_eq!(parse("clk3=10"), Err(CommandError::InvalidChannel(3)));
        assert!(matches!(parse("clk1"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_freq_implies_clk0() {
        assert_eq!(parse("freq 10"), set(Channel::Clk0, 10));
        assert_eq!(parse("freq=10"), set(Channel::Clk0, 10));
        assert!(matches!(parse("freq"), Err(CommandError::Usage(_))));
        assert_eq!(parse("freq ten"), Err(CommandError::InvalidNumber));
    }

    #[test]
    fn test_clk_arguments() {
        assert_eq!(parse("clk 1 20"), set(Channel::Clk1, 20));
        assert_eq!(parse("clk 7 20"), Err(CommandError::InvalidChannel(7)));
        assert!(matches!(parse("clk 1"), Err(CommandError::Usage(_))));
        assert_eq!(parse("clk x 20"), Err(CommandError::InvalidNumber));
    }

    #[test]
    fn test_output_enable() {
        assert_eq!(parse("oe on"), Ok(Command::OutputEnable(true)));
        assert_eq!(parse("OE OFF"), Ok(Command::OutputEnable(false)));
        assert!(matches!(parse("oe"), Err(CommandError::Usage(_))));
        assert!(matches!(parse("oe maybe"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_peek_poke() {
        assert_eq!(parse("peek 03"), Ok(Command::Peek { register: 0x03 }));
        assert_eq!(parse("peek 0xB7"), Ok(Command::Peek { register: 0xB7 }));
        assert_eq!(parse("peek oe"), Ok(Command::Peek { register: 0x03 }));
        assert_eq!(
            parse("poke 10 4f"),
            Ok(Command::Poke {
                register: 0x10,
                value: 0x4F
            })
        );
        assert_eq!(
            parse("poke xtal 0x92"),
            Ok(Command::Poke {
                register: 0xB7,
                value: 0x92
            })
        );
        assert_eq!(parse("peek 100"), Err(CommandError::InvalidNumber));
        assert!(matches!(parse("poke 10"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(parse("frobnicate"), Err(CommandError::Unknown));
        assert_eq!(parse("clock1=5"), Err(CommandError::Unknown));
        assert_eq!(parse(""), Err(CommandError::Unknown));
        assert_eq!(parse("  = "), Err(CommandError::Unknown));
    }

    proptest! {
        #[test]
        fn prop_never_panics(line in "\\PC{0,64}") {
            let _ = parse(&line);
        }

        #[test]
        fn prop_prefix_forms_agree(ch in 0u32..3, mhz in 0u32..200) {
            let expected = parse(&format!("clk {} {}", ch, mhz));
            for prefix in CHANNEL_PREFIXES {
                prop_assert_eq!(parse(&format!("{}{}={}", prefix, ch, mhz)), expected);
            }
        }
    }
}
