use anyhow::Context as _;

use crate::cli::PaletteArgs;
use crate::config::SiteConfig;

pub const DEFAULT_PRIMARY_COLOR: &str = "#521d3a";

const DEFAULT_PRIMARY_HSL: Hsl = Hsl {
    h: 327,
    s: 48,
    l: 22,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsl {
    pub h: i32,
    pub s: i32,
    pub l: i32,
}

/// Named colors derived from one brand color, in output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub entries: Vec<(&'static str, String)>,
}

impl Palette {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

pub fn hex_to_hsl(hex: &str) -> Option<Hsl> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| -> Option<f64> {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .ok()
            .map(|v| f64::from(v) / 255.0)
    };
    let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let (mut h, mut s) = (0.0, 0.0);

    if max != min {
        let d = max - min;
        s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        h /= 6.0;
    }

    Some(Hsl {
        h: (h * 360.0).round() as i32,
        s: (s * 100.0).round() as i32,
        l: (l * 100.0).round() as i32,
    })
}

pub fn hsl_to_hex(h: i32, s: i32, l: i32) -> String {
    let l = f64::from(l) / 100.0;
    let a = f64::from(s) * l.min(1.0 - l) / 100.0;
    let channel = |n: f64| -> String {
        let k = (n + f64::from(h) / 30.0) % 12.0;
        let color = l - a * (k - 3.0).min(9.0 - k).min(1.0).max(-1.0);
        let value = (255.0 * color).round().clamp(0.0, 255.0) as u8;
        format!("{value:02x}")
    };
    format!("#{}{}{}", channel(0.0), channel(8.0), channel(4.0))
}

/// Generates the primary palette from a `#RRGGBB` brand color. Anything else
/// falls back to [`DEFAULT_PRIMARY_COLOR`].
pub fn generate_palette(base_color: &str) -> Palette {
    let (base, hsl) = match hex_to_hsl(base_color).filter(|_| is_hex_color(base_color)) {
        Some(hsl) => (base_color.to_owned(), hsl),
        None => {
            tracing::warn!(base_color, fallback = DEFAULT_PRIMARY_COLOR, "invalid primary color");
            (DEFAULT_PRIMARY_COLOR.to_owned(), DEFAULT_PRIMARY_HSL)
        }
    };
    let Hsl { h, s, l } = hsl;
    let is_light = l > 50;

    let entries = vec![
        ("primary-50", hsl_to_hex(h, s, (l + 70).min(98))),
        ("primary-100", hsl_to_hex(h, s, (l + 60).min(96))),
        ("primary-200", hsl_to_hex(h, s, (l + 50).min(93))),
        ("primary-300", hsl_to_hex(h, s, (l + 40).min(89))),
        (
            "primary-400",
            if is_light {
                base.clone()
            } else {
                hsl_to_hex(h, s, (l + 8).min(70))
            },
        ),
        (
            "primary-500",
            if is_light {
                hsl_to_hex(h, (s + 5).min(100), (l - 5).max(40))
            } else {
                hsl_to_hex(h, s, l)
            },
        ),
        (
            "primary-600",
            if is_light {
                hsl_to_hex(h, (s + 10).min(100), (l - 15).max(25))
            } else {
                base.clone()
            },
        ),
        ("primary-700", hsl_to_hex(h, (s + 10).min(100), (l - 18).max(20))),
        ("primary-800", hsl_to_hex(h, (s + 15).min(100), (l - 28).max(15))),
        ("primary-900", hsl_to_hex(h, (s + 20).min(100), (l - 38).max(10))),
        ("primary-950", hsl_to_hex(h, (s + 25).min(100), (l - 48).max(5))),
        ("primary", base.clone()),
        ("primary-light", hsl_to_hex(h, (s - 20).max(10), (l + 20).min(85))),
        ("primary-dark", hsl_to_hex(h, (s + 10).min(100), (l - 20).max(15))),
        ("primary-hover", hsl_to_hex(h, (s + 5).min(100), (l - 5).max(20))),
        ("primary-active", hsl_to_hex(h, (s + 8).min(100), (l - 10).max(15))),
        ("primary-focus", hsl_to_hex(h, (s - 10).max(15), (l + 10).min(75))),
        ("primary-muted", hsl_to_hex(h, (s - 35).max(5), (l + 30).min(92))),
        ("primary-border", hsl_to_hex(h, (s - 25).max(10), (l + 25).min(85))),
        ("primary-bg", hsl_to_hex(h, (s - 35).max(5), (l + 40).min(95))),
        (
            "primary-fg",
            if is_light {
                "#ffffff".to_owned()
            } else {
                hsl_to_hex(h, (s - 30).max(10), (l + 45).min(95))
            },
        ),
        ("primary-text", base.clone()),
        ("primary-text-light", hsl_to_hex(h, (s - 10).max(15), (l + 15).min(70))),
        (
            "primary-text-muted",
            hsl_to_hex(
                h,
                (s - 20).max(10),
                if is_light { (l - 20).max(30) } else { (l + 20).min(70) },
            ),
        ),
    ];

    Palette { entries }
}

/// `--color-*` custom property declarations for the palette of `base_color`.
pub fn css_custom_properties(base_color: &str) -> String {
    generate_palette(base_color)
        .entries
        .iter()
        .map(|(key, value)| format!("--color-{key}: {value};"))
        .collect::<Vec<_>>()
        .join("\n  ")
}

/// A `:root { ... }` stylesheet wrapping [`css_custom_properties`].
pub fn theme_stylesheet(base_color: &str) -> String {
    format!(":root {{\n  {}\n}}\n", css_custom_properties(base_color))
}

pub fn run(args: PaletteArgs) -> anyhow::Result<()> {
    let config = SiteConfig::from_env()
        .context("load config")?
        .with_overrides(None, args.color.as_deref());

    if args.stylesheet {
        print!("{}", theme_stylesheet(&config.primary_color));
    } else {
        println!("{}", css_custom_properties(&config.primary_color));
    }
    Ok(())
}
