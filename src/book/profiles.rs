//! Named print profiles: page size, margins and font stacks.

/// CSS font stacks a profile sets through the theme variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontStacks {
    pub body: &'static str,
    pub heading: &'static str,
    pub mono: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintProfile {
    pub name: &'static str,
    pub page_size: &'static str,
    pub margin: &'static str,
    pub fonts: FontStacks,
}

const NOTO: FontStacks = FontStacks {
    body: "\"Noto Serif\", Georgia, serif",
    heading: "\"Noto Sans\", Arial, sans-serif",
    mono: "\"Noto Sans Mono\", Menlo, monospace",
};

static PROFILES: [PrintProfile; 3] = [
    PrintProfile {
        name: "a4",
        page_size: "A4",
        margin: "1in,1in,1in,1in",
        fonts: NOTO,
    },
    PrintProfile {
        name: "letter",
        page_size: "Letter",
        margin: "1in,1in,1in,1in",
        fonts: NOTO,
    },
    PrintProfile {
        name: "book-6x9",
        page_size: "6in x 9in",
        margin: "0.75in,0.8in,0.9in,0.8in",
        fonts: NOTO,
    },
];

/// Look up a profile by name, case-insensitively.
pub fn resolve_profile(name: &str) -> Option<&'static PrintProfile> {
    PROFILES.iter().find(|p| p.name.eq_ignore_ascii_case(name.trim()))
}

pub fn list_profiles() -> &'static [PrintProfile] {
    &PROFILES
}

impl PrintProfile {
    /// Theme variable overrides for the profile's font stacks.
    pub fn font_overrides(&self) -> [(&'static str, &'static str); 3] {
        [
            ("font-body", self.fonts.body),
            ("font-heading", self.fonts.heading),
            ("font-mono", self.fonts.mono),
        ]
    }
}
