use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use sundials::{Report, Summary};

const BAR_WIDTH: f64 = 14.0;
const GROUP_GAP: f64 = 12.0;
const PLOT_HEIGHT: f64 = 240.0;
const MARGIN: f64 = 40.0;
const COLORS: [&str; 2] = ["#1f77b4", "#ff7f0e"];

/// Renders a grouped bar chart comparing both methods: the mean error with a
/// standard deviation bar, followed by the error on every sample.
pub fn write_chart<W: Write>(w: &mut W, ids: &[String], report: &Report) -> io::Result<()> {
    let methods: [(&str, &Summary); 2] = [
        ("Geodesic regression", &report.geodesic),
        ("PLS", &report.pls),
    ];
    let groups = ids.len() + 1;
    let group_width = 2.0 * BAR_WIDTH + GROUP_GAP;
    let width = 2.0 * MARGIN + groups as f64 * group_width;
    let height = PLOT_HEIGHT + 2.0 * MARGIN + 40.0;

    let top = methods
        .iter()
        .flat_map(|(_, s)| s.errors.iter().copied().chain([s.mean + s.std]))
        .fold(0.0, f64::max);
    let scale = if top > 0.0 { PLOT_HEIGHT / top } else { 0.0 };
    let baseline = MARGIN + PLOT_HEIGHT;

    writeln!(
        w,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\">",
        width, height
    )?;
    writeln!(w, "  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>")?;
    writeln!(
        w,
        "  <text x=\"{}\" y=\"{}\" font-size=\"12\">Absolute error [degrees]</text>",
        MARGIN,
        MARGIN / 2.0
    )?;
    writeln!(
        w,
        "  <line x1=\"{0}\" y1=\"{1}\" x2=\"{2}\" y2=\"{1}\" stroke=\"black\"/>",
        MARGIN,
        baseline,
        width - MARGIN
    )?;

    for group in 0..groups {
        let x0 = MARGIN + group as f64 * group_width + GROUP_GAP / 2.0;
        let label = match group {
            0 => "Mean",
            g => ids[g - 1].as_str(),
        };
        writeln!(w, "  <g id=\"group{}\">", group)?;
        for (m, (_, summary)) in methods.iter().enumerate() {
            let value = match group {
                0 => summary.mean,
                g => summary.errors.get(g - 1).copied().unwrap_or(0.0),
            };
            let x = x0 + m as f64 * BAR_WIDTH;
            let h = value * scale;
            writeln!(
                w,
                "    <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\"/>",
                x,
                baseline - h,
                BAR_WIDTH,
                h,
                COLORS[m]
            )?;
            if group == 0 {
                let center = x + BAR_WIDTH / 2.0;
                let lo = baseline - (summary.mean - summary.std).max(0.0) * scale;
                let hi = baseline - (summary.mean + summary.std) * scale;
                writeln!(
                    w,
                    "    <line x1=\"{0}\" y1=\"{1}\" x2=\"{0}\" y2=\"{2}\" stroke=\"black\"/>",
                    center, lo, hi
                )?;
            }
        }
        writeln!(
            w,
            "    <text x=\"{}\" y=\"{}\" font-size=\"9\" transform=\"rotate(45 {0} {1})\">{}</text>",
            x0,
            baseline + 12.0,
            escape(label)
        )?;
        writeln!(w, "  </g>")?;
    }

    for (m, (name, _)) in methods.iter().enumerate() {
        let y = height - MARGIN / 2.0 - 14.0 * (1 - m) as f64;
        writeln!(
            w,
            "  <rect x=\"{}\" y=\"{}\" width=\"10\" height=\"10\" fill=\"{}\"/>",
            MARGIN,
            y - 9.0,
            COLORS[m]
        )?;
        writeln!(
            w,
            "  <text x=\"{}\" y=\"{}\" font-size=\"10\">{}</text>",
            MARGIN + 14.0,
            y,
            name
        )?;
    }
    writeln!(w, "</svg>")?;
    Ok(())
}

pub fn save_chart<P: AsRef<Path>>(p: P, ids: &[String], report: &Report) -> io::Result<()> {
    let mut f = BufWriter::new(File::create(p)?);
    write_chart(&mut f, ids, report)?;
    f.flush()
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
