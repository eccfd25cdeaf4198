//! Renderer command sets per mode
//!
//! Pure functions returning the `set` / `unset` lines for the screen and
//! the per-mode axes. Numbers are printed with six decimals.

use crate::config::{ScopeParameters, HORIZ_DIVS, VERTC_DIVS, XY_DIVS};
use crate::types::{Channel, Mode, VoltmeterReadout};

const TEXT_COLOR: &str = "textcolor rgb '#d0d0d0'";

/// One renderer setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    Set(String),
    Unset(String),
}

impl Setting {
    fn set(s: impl Into<String>) -> Self {
        Setting::Set(s.into())
    }

    fn unset(s: impl Into<String>) -> Self {
        Setting::Unset(s.into())
    }
}

/// Window, grid and label styling applied after every renderer start
pub fn screen_setup() -> Vec<Setting> {
    vec![
        Setting::set(
            "term x11 background rgb '#151515' size 1000,500 position 50,550 font \"mbfont:Courier,18\"",
        ),
        Setting::unset("key"),
        Setting::set("style line 12 lc rgb '#c0c0c0' dt 3 lw 0.2"),
        Setting::set(" grid ls 12"),
        Setting::set(format!("xtics {}", TEXT_COLOR)),
        Setting::set(format!("ytics {}", TEXT_COLOR)),
        Setting::set(format!("y2tics {}", TEXT_COLOR)),
        Setting::set(format!("xlabel \"Time (s)\" {}", TEXT_COLOR)),
        Setting::set(format!("ylabel \"Channel 1 (V)\" {} offset 0,0", TEXT_COLOR)),
        Setting::set(format!("y2label \"Channel 2 (V)\" {} offset 0,0", TEXT_COLOR)),
    ]
}

/// Axis ranges, tics and labels for `mode`
pub fn axis_setup(mode: Mode, params: &ScopeParameters) -> Vec<Setting> {
    match mode {
        Mode::Analog => analog_axes(params),
        Mode::Xy => xy_axes(params),
        Mode::Digital => digital_axes(params),
        Mode::Voltmeter => voltmeter_axes(params),
    }
}

/// Plot command style for `mode`
pub fn plot_style(mode: Mode) -> &'static str {
    match mode {
        Mode::Analog | Mode::Voltmeter => {
            "u 1:2 axis x1y1 w l lw 3 lc rgb 'yellow', \"\" u 1:3 axis x1y2 w l lw 3 lc rgb 'cyan'"
        }
        Mode::Xy => "u 2:3 w l lw 2 lc rgb 'magenta'",
        Mode::Digital => {
            "u 1:($2+1.2) axis x1y1 w l lw 3 lc rgb 'yellow', \"\" u 1:3 axis x1y2 w l lw 3 lc rgb 'cyan'"
        }
    }
}

/// The two centered readout labels of the voltmeter display
pub fn voltmeter_labels(readout: &VoltmeterReadout) -> [Setting; 2] {
    let label = |index: u32, channel: Channel, y: &str| {
        Setting::set(format!(
            "label {} \"{}\" at 0,{} center {} font \"mbfont:Courier,24\"",
            index,
            readout.text(channel),
            y,
            TEXT_COLOR
        ))
    };
    [label(1, Channel::One, "0.5"), label(2, Channel::Two, "-0.5")]
}

fn time_limit(params: &ScopeParameters) -> f64 {
    params.tdiv * HORIZ_DIVS as f64 / 2.0
}

fn unit(params: &ScopeParameters, channel: Channel) -> &'static str {
    if params.is_calibrated(channel) {
        "V"
    } else {
        "a.u."
    }
}

fn time_axis(params: &ScopeParameters) -> [Setting; 2] {
    let tlim = time_limit(params);
    [
        Setting::set(format!("xrange [{:.6}:{:.6}]", -tlim, tlim)),
        Setting::set(format!(
            "xtics {:.6}, {:.6}, {:.6} format \"\"",
            -tlim, params.tdiv, tlim
        )),
    ]
}

fn analog_axes(params: &ScopeParameters) -> Vec<Setting> {
    let y1lim = params.y1div * VERTC_DIVS as f64 / 2.0;
    let y2lim = params.y2div * VERTC_DIVS as f64 / 2.0;
    let [xrange, xtics] = time_axis(params);

    vec![
        xrange,
        Setting::set(format!("yrange [{:.6}:{:.6}]", -y1lim, y1lim)),
        Setting::set(format!("y2range [{:.6}:{:.6}]", -y2lim, y2lim)),
        xtics,
        Setting::set(format!("ytics {:.6}, {:.6}, {:.6}", -y1lim, params.y1div, y1lim)),
        Setting::set(format!("y2tics {:.6}, {:.6}, {:.6}", -y2lim, params.y2div, y2lim)),
        Setting::set(format!(
            "ylabel \"Channel 1 ({})\" {} offset 0,0",
            unit(params, Channel::One),
            TEXT_COLOR
        )),
        Setting::set(format!(
            "y2label \"Channel 2 ({})\" {} offset 0,0",
            unit(params, Channel::Two),
            TEXT_COLOR
        )),
    ]
}

fn xy_axes(params: &ScopeParameters) -> Vec<Setting> {
    let xlim = params.y1div * XY_DIVS as f64 / 2.0;
    let ylim = params.y2div * XY_DIVS as f64 / 2.0;

    vec![
        Setting::set("size ratio 1"),
        Setting::set(format!("xrange [{:.6}:{:.6}]", -xlim, xlim)),
        Setting::set(format!("yrange [{:.6}:{:.6}]", -ylim, ylim)),
        Setting::set(format!(
            "xtics {:.6}, {:.6}, {:.6} format \"%.3f\"",
            -xlim, params.y1div, xlim
        )),
        Setting::set(format!(
            "ytics {:.6}, {:.6}, {:.6} format \"%.3f\"",
            -ylim, params.y2div, ylim
        )),
        Setting::set("y2tics format \"\""),
        Setting::set(format!(
            "xlabel \"Channel 1 ({})\" {} offset 0,0",
            unit(params, Channel::One),
            TEXT_COLOR
        )),
        Setting::set(format!(
            "ylabel \"Channel 2 ({})\" {} offset 0,0",
            unit(params, Channel::Two),
            TEXT_COLOR
        )),
        Setting::set("y2label \"\""),
    ]
}

fn digital_axes(params: &ScopeParameters) -> Vec<Setting> {
    let [xrange, xtics] = time_axis(params);

    vec![
        xrange,
        Setting::set("yrange [-0.2:2.4]"),
        Setting::set("y2range [-0.2:2.4]"),
        xtics,
        Setting::set("ytics (\"0\" 1.2, \"1\" 2.2)"),
        Setting::set("y2tics 0, 1, 1"),
        Setting::set(format!("ylabel \"Channel 1\" {} offset 0,7", TEXT_COLOR)),
        Setting::set(format!("y2label \"Channel 2\" {} offset 0,-6", TEXT_COLOR)),
    ]
}

fn voltmeter_axes(params: &ScopeParameters) -> Vec<Setting> {
    let [xrange, _] = time_axis(params);

    vec![
        xrange,
        Setting::set("yrange [-1:1]"),
        Setting::set("y2range [-1:1]"),
        Setting::unset("xtics"),
        Setting::unset("ytics"),
        Setting::unset("y2tics"),
        Setting::unset("ylabel"),
        Setting::unset("y2label"),
    ]
}
