//! Help screen and boot banner text

/// Banner printed once the host opens the port
pub const BANNER: &[&str] = &[
    "",
    "**************************************************************",
    " Syntonic USB serial console (Si5351 @ I2C)",
    "**************************************************************",
    " Line ending: CR+LF   /   local echo: off",
    " Type 'help' or 'h' then [Enter]",
    "",
];

/// Help screen
pub const HELP: &[&str] = &[
    "",
    "====================  HELP MENU (Si5351)  ====================",
    " help / h / H / ?           : show this help",
    " scan                       : I2C scan, stop at first device",
    " scan all                   : I2C scan, list every device",
    " scan strict                : I2C scan with register-0 read",
    " ping                       : probe the Si5351 address",
    " whoami                     : read Reg0/Reg1",
    " status                     : device status and channel setup",
    " init                       : re-init Si5351 (PLLA, outputs off)",
    " freq <MHz>                 : set CLK0 (compat)",
    " clk <ch> <MHz>             : set CLKch (ch=0|1|2, MHz=0 disables)",
    " clk0=<MHz> / clk1=<MHz> / clk2=<MHz>",
    " ch0=<MHz>  / ch1=<MHz>  / ch2=<MHz>",
    " freq0=<MHz> ... / cll0=<MHz> ... (typo tolerant)",
    " oe on|off                  : enable/disable all outputs",
    " peek <reg>                 : read register (hex or name)",
    " poke <reg> <val>           : write register (hex)",
    " reset                      : re-initialize the I2C peripheral",
    " recover                    : clock a stuck bus free, then reset",
    "",
    " Examples:",
    "  clk 1 20    -> CLK1 = 20 MHz",
    "  freq1=50    -> CLK1 = 50 MHz",
    "  ch2=0       -> disable CLK2",
    "  peek oe     -> output enable register",
    "===============================================================",
    "",
];

/// Prompt shown after each command
pub const PROMPT: &str = "> ";
