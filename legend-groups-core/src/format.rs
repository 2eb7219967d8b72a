//! Text formatting helpers: legacy color codes and `[placeholder]` templates.
//!
//! Messages and prefixes are authored with `&` color codes (`&6VIP`). Game
//! clients expect the section sign instead, so every string leaving the
//! system goes through [`translate_color_codes`].

use chrono::Duration;

use crate::error::{GroupError, Result};

/// The section sign clients use to introduce a color code.
pub const COLOR_CHAR: char = '§';

/// The alternate character used when authoring color codes.
pub const ALT_COLOR_CHAR: char = '&';

/// Whether `c` is a valid legacy formatting code (colors, styles, reset, hex).
#[must_use]
pub fn is_color_code(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r' | 'x')
}

/// Replace `alt` followed by a valid code with `§` and the lowercased code.
///
/// Characters not followed by a valid code are left untouched, so `&&` or
/// `R&D` survive translation.
#[must_use]
pub fn translate_color_codes(alt: char, text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == alt {
            if let Some(&next) = chars.peek() {
                if is_color_code(next) {
                    out.push(COLOR_CHAR);
                    out.push(next.to_ascii_lowercase());
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Remove translated (`§x`) color codes, leaving plain text.
#[must_use]
pub fn strip_color_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == COLOR_CHAR && chars.peek().is_some_and(|&n| is_color_code(n)) {
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}

/// Builder for a single outgoing message.
///
/// ```
/// # use legend_groups_core::format::MessageFormatter;
/// let msg = MessageFormatter::new("&aWelcome [playername]!")
///     .replace_key("playername", "Steve")
///     .render();
/// assert_eq!(msg, "§aWelcome Steve!");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFormatter {
    message: String,
}

impl MessageFormatter {
    /// Start from a raw template.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            message: template.into(),
        }
    }

    /// Replace every `[key]` with `value`.
    #[must_use]
    pub fn replace_key(mut self, key: &str, value: &str) -> Self {
        let placeholder = format!("[{key}]");
        if self.message.contains(&placeholder) {
            self.message = self.message.replace(&placeholder, value);
        }
        self
    }

    /// The message without color translation.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.message
    }

    /// Translate `&` color codes and return the final message.
    #[must_use]
    pub fn render(self) -> String {
        translate_color_codes(ALT_COLOR_CHAR, &self.message)
    }
}

/// Build a membership duration from day/hour/minute/second components.
///
/// # Errors
/// Returns [`GroupError::InvalidDuration`] if a component is negative, or
/// the total overflows.
pub fn membership_duration(days: i64, hours: i64, minutes: i64, seconds: i64) -> Result<Duration> {
    let invalid = || GroupError::InvalidDuration(format!("{days}d {hours}h {minutes}m {seconds}s"));
    if days < 0 || hours < 0 || minutes < 0 || seconds < 0 {
        return Err(invalid());
    }
    let total = days
        .checked_mul(86_400)
        .and_then(|d| hours.checked_mul(3_600).and_then(|h| d.checked_add(h)))
        .and_then(|dh| minutes.checked_mul(60).and_then(|m| dh.checked_add(m)))
        .and_then(|dhm| dhm.checked_add(seconds))
        .ok_or_else(invalid)?;
    Duration::try_seconds(total).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_valid_codes_only() {
        assert_eq!(translate_color_codes('&', "&6VIP"), "§6VIP");
        assert_eq!(translate_color_codes('&', "&LBold&r"), "§lBold§r");
        assert_eq!(translate_color_codes('&', "R&D"), "R&D");
        assert_eq!(translate_color_codes('&', "trailing&"), "trailing&");
        assert_eq!(translate_color_codes('&', "&&a"), "&§a");
    }

    #[test]
    fn strip_removes_translated_codes() {
        let colored = translate_color_codes('&', "&f[&4Admin&f] Steve");
        assert_eq!(strip_color_codes(&colored), "[Admin] Steve");
    }

    #[test]
    fn placeholders_replace_all_occurrences() {
        let msg = MessageFormatter::new("[a] and [a] but not [b]")
            .replace_key("a", "x")
            .render();
        assert_eq!(msg, "x and x but not [b]");
    }

    #[test]
    fn duration_components_add_up() {
        let d = membership_duration(1, 2, 3, 4).expect("duration");
        assert_eq!(d.num_seconds(), 86_400 + 2 * 3_600 + 3 * 60 + 4);
        assert!(membership_duration(0, -1, 0, 0).is_err());
        assert!(membership_duration(i64::MAX, 0, 0, 0).is_err());
    }
}
