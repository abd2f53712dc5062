//! Application-wide constants

pub mod x11 {
    /// GrabKey major opcode, used to attribute asynchronous errors to grab requests
    pub const GRAB_KEY_REQUEST: u8 = 33;
    /// UngrabKey major opcode
    pub const UNGRAB_KEY_REQUEST: u8 = 34;

    /// Core font used for notification text
    pub const CORE_FONT: &[u8] = b"fixed";

    /// Fallback when the server reports a zero physical screen size
    pub const DEFAULT_DPI: f64 = 96.0;

    /// Fully opaque value for _NET_WM_WINDOW_OPACITY
    pub const OPACITY_OPAQUE: u32 = 0xFFFF_FFFF;

    /// XInput2 version we request; raw events need 2.0
    pub const XINPUT_MAJOR: u16 = 2;
    pub const XINPUT_MINOR: u16 = 0;
}

pub mod keysym {
    pub const SHIFT_L: u32 = 0xFFE1;
    pub const INSERT: u32 = 0xFF63;

    /// Keysyms for Latin-1 characters equal their code points
    pub const LATIN1_MAX: u32 = 0xFF;
    /// Offset of the Unicode keysym range
    pub const UNICODE_OFFSET: u32 = 0x0100_0000;
    /// First function key keysym (F1); F2..F35 follow contiguously
    pub const F1: u32 = 0xFFBE;
    pub const MAX_FUNCTION_KEY: u8 = 35;
}

pub mod notification {
    use std::time::Duration;

    /// One-shot layout timer interval; rapid updates collapse into one pass
    pub const UPDATE_DEBOUNCE: Duration = Duration::from_millis(100);

    /// Vertical gap between stacked notifications
    pub const MARGIN_POINTS: i32 = 10;

    pub const DEFAULT_MAXIMUM_WIDTH_POINTS: i32 = 300;
    pub const DEFAULT_MAXIMUM_HEIGHT_POINTS: i32 = 100;

    /// Inner padding of the X11 notification window, in pixels
    pub const PADDING_PX: u32 = 8;
    /// Horizontal gap between rendered buttons, in pixels
    pub const BUTTON_SPACING_PX: u32 = 12;
    pub const BORDER_WIDTH_PX: u32 = 1;
}

pub mod paths {
    pub const CONFIG_DIR: &str = "clipdesk";
    pub const CONFIG_FILE: &str = "clipdesk.json";
}
