//! Page size and margin parsing shared by both renderers.
//!
//! ```text
//! "A4"            → Named("A4")
//! "6in x 9in"     → Explicit { width: "6in", height: "9in" }
//! "1in,0.5in"     → top=1in right=0.5in bottom=1in left=0.5in
//! ```

use tracing::warn;

pub const POINTS_PER_INCH: f64 = 72.0;

/// Page format: a named paper size or explicit dimensions.
#[derive(Debug, Clone, PartialEq)]
pub enum PageSize {
    /// Name as given, e.g. `A4` or `Letter`.
    Named(String),
    /// CSS lengths, e.g. `6in` by `9in`.
    Explicit { width: String, height: String },
}

impl PageSize {
    /// A size string containing `x` is explicit dimensions; anything else is a name.
    pub fn parse(page_size: &str) -> Self {
        let trimmed = page_size.trim();
        match trimmed.split_once('x') {
            Some((w, h)) => PageSize::Explicit {
                width: w.trim().to_string(),
                height: h.trim().to_string(),
            },
            None => PageSize::Named(trimmed.to_string()),
        }
    }

    /// Width and height in points. Unknown names fall back to A4.
    pub fn points(&self) -> (f64, f64) {
        match self {
            PageSize::Explicit { width, height } => (to_points(width), to_points(height)),
            PageSize::Named(name) => named_dimensions(name).unwrap_or_else(|| {
                warn!("Unknown page size '{}', using A4", name);
                A4
            }),
        }
    }

    /// Width and height in inches.
    pub fn inches(&self) -> (f64, f64) {
        let (w, h) = self.points();
        (w / POINTS_PER_INCH, h / POINTS_PER_INCH)
    }
}

const A4: (f64, f64) = (595.28, 841.89);

/// Paper sizes in points, matched case-insensitively.
pub fn named_dimensions(name: &str) -> Option<(f64, f64)> {
    let dims = match name.trim().to_ascii_lowercase().as_str() {
        "a0" => (2383.94, 3370.39),
        "a1" => (1683.78, 2383.94),
        "a2" => (1190.55, 1683.78),
        "a3" => (841.89, 1190.55),
        "a4" => A4,
        "a5" => (419.53, 595.28),
        "a6" => (297.64, 419.53),
        "letter" => (612.0, 792.0),
        "legal" => (612.0, 1008.0),
        "tabloid" => (792.0, 1224.0),
        "ledger" => (1224.0, 792.0),
        _ => return None,
    };
    Some(dims)
}

/// Four margin lengths as given (CSS length strings).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Margins {
    pub top: String,
    pub right: String,
    pub bottom: String,
    pub left: String,
}

impl Margins {
    /// Parse a comma-separated margin list.
    ///
    /// An empty top is `1in`; right, bottom and left default to top, top
    /// and right respectively.
    pub fn parse(margin: &str) -> Self {
        let parts: Vec<&str> = margin.split(',').map(str::trim).collect();
        let part = |i: usize| parts.get(i).copied().filter(|p| !p.is_empty());

        let top = part(0).unwrap_or("1in").to_string();
        let right = part(1).map(str::to_string).unwrap_or_else(|| top.clone());
        let bottom = part(2).map(str::to_string).unwrap_or_else(|| top.clone());
        let left = part(3).map(str::to_string).unwrap_or_else(|| right.clone());
        Margins {
            top,
            right,
            bottom,
            left,
        }
    }

    /// `[top, right, bottom, left]` in points.
    pub fn points(&self) -> [f64; 4] {
        [
            to_points(&self.top),
            to_points(&self.right),
            to_points(&self.bottom),
            to_points(&self.left),
        ]
    }

    /// `[top, right, bottom, left]` in inches.
    pub fn inches(&self) -> [f64; 4] {
        self.points().map(|p| p / POINTS_PER_INCH)
    }
}

/// Page format plus margins, as the renderers receive them.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    pub size: PageSize,
    pub margins: Margins,
}

impl PageGeometry {
    pub fn parse(page_size: &str, margin: &str) -> Self {
        Self {
            size: PageSize::parse(page_size),
            margins: Margins::parse(margin),
        }
    }
}

/// Convert a CSS length to points.
///
/// Recognises `in`, `cm`, `mm`, `pt` and `px`; a bare number is taken as
/// points. Anything unparseable is one inch.
pub fn to_points(value: &str) -> f64 {
    let v = value.trim().to_ascii_lowercase();
    let (number, factor) = if let Some(n) = v.strip_suffix("in") {
        (n, POINTS_PER_INCH)
    } else if let Some(n) = v.strip_suffix("cm") {
        (n, POINTS_PER_INCH / 2.54)
    } else if let Some(n) = v.strip_suffix("mm") {
        (n, POINTS_PER_INCH / 25.4)
    } else if let Some(n) = v.strip_suffix("pt") {
        (n, 1.0)
    } else if let Some(n) = v.strip_suffix("px") {
        (n, 0.75)
    } else {
        (v.as_str(), 1.0)
    };

    match number.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => n * factor,
        _ => POINTS_PER_INCH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sides(m: &Margins) -> [&str; 4] {
        [&m.top, &m.right, &m.bottom, &m.left]
    }

    #[test]
    fn margin_fill_rule() {
        assert_eq!(sides(&Margins::parse("1in")), ["1in", "1in", "1in", "1in"]);
        assert_eq!(sides(&Margins::parse("1in,0.5in")), ["1in", "0.5in", "1in", "0.5in"]);
        assert_eq!(sides(&Margins::parse("1in,0.5in,2cm")), ["1in", "0.5in", "2cm", "0.5in"]);
        assert_eq!(
            sides(&Margins::parse("1in, 2in, 3in, 4in")),
            ["1in", "2in", "3in", "4in"]
        );
    }

    #[test]
    fn empty_margin_positions_fill() {
        assert_eq!(sides(&Margins::parse("")), ["1in", "1in", "1in", "1in"]);
        assert_eq!(sides(&Margins::parse("2cm,,")), ["2cm", "2cm", "2cm", "2cm"]);
    }

    #[test]
    fn page_size_with_x_is_explicit() {
        assert_eq!(
            PageSize::parse("6in x 9in"),
            PageSize::Explicit {
                width: "6in".into(),
                height: "9in".into()
            }
        );
        assert_eq!(PageSize::parse("Letter"), PageSize::Named("Letter".into()));
        assert_eq!(PageSize::parse("6in x 9in").inches(), (6.0, 9.0));
    }

    #[test]
    fn unknown_name_uses_a4() {
        assert_eq!(PageSize::parse("Foolscap").points(), A4);
        assert_eq!(PageSize::parse("letter").points(), (612.0, 792.0));
    }

    #[test]
    fn length_units() {
        assert_eq!(to_points("1in"), 72.0);
        assert_eq!(to_points("10pt"), 10.0);
        assert_eq!(to_points("96px"), 72.0);
        assert_eq!(to_points("36"), 36.0);
        assert!((to_points("2.54cm") - 72.0).abs() < 1e-9);
        assert!((to_points("25.4mm") - 72.0).abs() < 1e-9);
        assert_eq!(to_points("wide"), 72.0);
        assert_eq!(to_points("abcin"), 72.0);
    }
}
