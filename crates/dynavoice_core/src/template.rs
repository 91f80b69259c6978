//! Channel name template engine.
//!
//! Templates are rendered in a single left-to-right pass. Text produced by a
//! placeholder is never scanned again, so an activity called `##` stays `##`.
//!
//! | Placeholder | Value |
//! |---|---|
//! | `##` | channel number |
//! | `$#` | member count |
//! | `@@game@@` | first activity after alias resolution |
//! | `@@creator@@` | creator display name |
//! | `@@num@@` | member count |
//! | `@@nato@@` | NATO alphabet word for the channel number |
//! | `@@lock@@` | lock glyph when locked |
//! | `<<one/many>>` | `one` for a single member, `many` otherwise |

use crate::Alias;
use serde::{Deserialize, Serialize};

/// Maximum length of a channel name, in characters.
pub const MAX_NAME_LENGTH: usize = 100;

const LOCK_GLYPH: &str = "🔒";

const NATO: [&str; 26] = [
    "Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot", "Golf", "Hotel", "India", "Juliett",
    "Kilo", "Lima", "Mike", "November", "Oscar", "Papa", "Quebec", "Romeo", "Sierra", "Tango",
    "Uniform", "Victor", "Whiskey", "X-ray", "Yankee", "Zulu",
];

/// Everything a template may refer to.
///
/// # Examples
///
/// ```
/// use dynavoice_core::{NameContextBuilder, render};
///
/// let ctx = NameContextBuilder::default()
///     .creator_display_name("ana")
///     .channel_number(2usize)
///     .member_count(3usize)
///     .build()
///     .unwrap();
///
/// assert_eq!(render("@@creator@@'s room ## ($#)", &ctx), "ana's room 2 (3)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into))]
pub struct NameContext {
    /// Display name of the secondary's owner
    #[builder(default)]
    pub creator_display_name: String,
    /// Live number of secondaries of the same primary, this one included
    pub channel_number: usize,
    /// Detected activity labels in occupancy scan order
    #[builder(default)]
    pub activities: Vec<String>,
    /// Guild aliases
    #[builder(default)]
    pub aliases: Vec<Alias>,
    /// Number of non-bot occupants
    pub member_count: usize,
    /// Lock state
    #[builder(default)]
    pub locked: bool,
}

impl NameContext {
    /// Resolve an activity label through the alias table.
    pub fn resolve_alias<'a>(&'a self, activity: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|a| a.activity_name == activity)
            .map(|a| a.alias_text.as_str())
            .unwrap_or(activity)
    }

    /// First activity after alias resolution.
    pub fn topic(&self) -> Option<&str> {
        self.activities.first().map(|a| self.resolve_alias(a))
    }

    fn placeholder(&self, name: &str) -> Option<String> {
        let value = match name {
            "game" => self.topic().unwrap_or_default().to_string(),
            "creator" => self.creator_display_name.clone(),
            "num" => self.member_count.to_string(),
            "nato" => nato(self.channel_number),
            "lock" => {
                if self.locked {
                    LOCK_GLYPH.to_string()
                } else {
                    String::new()
                }
            }
            _ => return None,
        };
        Some(value)
    }
}

fn nato(number: usize) -> String {
    number
        .checked_sub(1)
        .and_then(|i| NATO.get(i))
        .map(|word| word.to_string())
        .unwrap_or_else(|| number.to_string())
}

/// Split `@@name@@rest` into `(name, rest)`.
fn split_placeholder(input: &str) -> Option<(&str, &str)> {
    let body = input.strip_prefix("@@")?;
    let end = body.find("@@")?;
    let name = &body[..end];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some((name, &body[end + 2..]))
}

/// Split `<<one/many>>rest` into `(one, many, rest)`.
fn split_plural(input: &str) -> Option<(&str, &str, &str)> {
    let body = input.strip_prefix("<<")?;
    let end = body.find(">>")?;
    let (one, many) = body[..end].split_once('/')?;
    Some((one, many, &body[end + 2..]))
}

/// Render a template against a context.
///
/// Rendering never fails: unknown placeholders pass through literally, an
/// empty result falls back to the channel number and the output is truncated
/// to [`MAX_NAME_LENGTH`] characters.
pub fn render(template: &str, ctx: &NameContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(c) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("##") {
            out.push_str(&ctx.channel_number.to_string());
            rest = after;
            continue;
        }
        if let Some(after) = rest.strip_prefix("$#") {
            out.push_str(&ctx.member_count.to_string());
            rest = after;
            continue;
        }
        if let Some((value, after)) = split_placeholder(rest)
            .and_then(|(name, after)| ctx.placeholder(name).map(|v| (v, after)))
        {
            out.push_str(&value);
            rest = after;
            continue;
        }
        if let Some((one, many, after)) = split_plural(rest) {
            out.push_str(if ctx.member_count == 1 { one } else { many });
            rest = after;
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    let trimmed = out.trim();
    if trimmed.is_empty() {
        return ctx.channel_number.to_string();
    }
    truncate_name(trimmed, MAX_NAME_LENGTH).to_string()
}

/// Truncate to at most `max` characters, never splitting a character.
pub fn truncate_name(name: &str, max: usize) -> &str {
    match name.char_indices().nth(max) {
        Some((idx, _)) => name[..idx].trim_end(),
        None => name,
    }
}

/// Reasons a template is rejected.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum TemplateViolation {
    /// Template is blank
    #[display("template must not be empty")]
    Empty,
    /// Template exceeds the name length limit
    #[display("template is {_0} characters long, the limit is 100")]
    TooLong(usize),
}

/// Check a template before it is stored.
pub fn validate_template(template: &str) -> Result<(), TemplateViolation> {
    let len = template.chars().count();
    if template.trim().is_empty() {
        Err(TemplateViolation::Empty)
    } else if len > MAX_NAME_LENGTH {
        Err(TemplateViolation::TooLong(len))
    } else {
        Ok(())
    }
}
