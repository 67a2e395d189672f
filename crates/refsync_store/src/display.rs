//! Derived display attributes: creator summaries, titles, note previews and
//! sortable dates.

use crate::model::{Creator, Item};
use crate::schema::item_type;

/// Maximum length of a note preview, in characters.
pub const NOTE_PREVIEW_LENGTH: usize = 200;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// A date field reduced to sortable parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDate {
    /// `YYYY-MM-DD`, with `00` for an unknown month or day.
    pub sortable: String,
    /// Four-digit year.
    pub year: i32,
}

/// Summarizes the primary creators: `A`, `A and B`, or `A et al.`
pub fn creator_summary(creators: &[Creator]) -> Option<String> {
    let mut primary: Vec<&Creator> = creators.iter().filter(|c| c.primary).collect();
    primary.sort_by_key(|c| c.order);

    match primary.as_slice() {
        [] => None,
        [only] => Some(only.summary_name().to_string()),
        [first, second] => Some(format!(
            "{} and {}",
            first.summary_name(),
            second.summary_name()
        )),
        [first, ..] => Some(format!("{} et al.", first.summary_name())),
    }
}

/// Plain-text first line of a note, truncated to [`NOTE_PREVIEW_LENGTH`].
pub fn note_preview(html: &str) -> String {
    let text = strip_html(html);
    let first_line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    first_line.chars().take(NOTE_PREVIEW_LENGTH).collect()
}

/// Lowercased title without markup or leading punctuation.
pub fn sort_title(title: &str) -> String {
    let text = strip_html(title);
    text.trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim_end()
        .to_lowercase()
}

/// Extracts a sortable date from free-form date text.
///
/// Understands ISO-like `YYYY`, `YYYY-MM`, `YYYY-MM-DD` (also with `/`), US
/// `MM/DD/YYYY`, and English month names (`March 5, 2019`, `5 Mar 2019`).
pub fn parse_date(raw: &str) -> Option<ParsedDate> {
    let tokens: Vec<&str> = raw
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect();

    let year_pos = tokens
        .iter()
        .position(|token| token.len() == 4 && token.chars().all(|c| c.is_ascii_digit()))?;
    let year: i32 = tokens[year_pos].parse().ok()?;

    let numbers_after: Vec<u32> = tokens[year_pos + 1..]
        .iter()
        .filter_map(|token| token.parse().ok())
        .collect();
    let numbers_before: Vec<u32> = tokens[..year_pos]
        .iter()
        .filter_map(|token| token.parse().ok())
        .collect();
    let named_month = tokens.iter().find_map(|token| month_from_name(token));

    let (month, day) = match named_month {
        Some(month) => {
            let day = numbers_before
                .first()
                .or(numbers_after.first())
                .copied()
                .unwrap_or(0);
            (month, day)
        }
        None if year_pos == 0 => (
            numbers_after.first().copied().unwrap_or(0),
            numbers_after.get(1).copied().unwrap_or(0),
        ),
        None => (
            numbers_before.first().copied().unwrap_or(0),
            numbers_before.get(1).copied().unwrap_or(0),
        ),
    };

    let month = if month <= 12 { month } else { 0 };
    let day = if month > 0 && day <= 31 { day } else { 0 };

    Some(ParsedDate {
        sortable: format!("{year:04}-{month:02}-{day:02}"),
        year,
    })
}

/// Recomputes the creator summary from the item's creators.
pub fn refresh_creator_summary(item: &mut Item) {
    item.derived.creator_summary = creator_summary(&item.creators);
}

/// Recomputes the display and sort titles.
///
/// Depends on the captured base title, note preview and creators, so it must
/// run after those are up to date.
pub fn refresh_titles(item: &mut Item) {
    let display = if item.is_note() {
        item.derived.note_preview.clone().unwrap_or_default()
    } else if !item.derived.base_title.is_empty() {
        item.derived.base_title.clone()
    } else if item.item_type == item_type::LETTER {
        bracketed_title("Letter to", &item.creators, "recipient")
    } else if item.item_type == item_type::INTERVIEW {
        bracketed_title("Interview by", &item.creators, "interviewer")
    } else {
        String::new()
    };

    item.derived.sort_title = sort_title(&display);
    item.derived.display_title = display;
}

fn bracketed_title(prefix: &str, creators: &[Creator], role: &str) -> String {
    let names: Vec<&str> = creators
        .iter()
        .filter(|c| c.creator_type == role)
        .map(Creator::summary_name)
        .filter(|name| !name.is_empty())
        .collect();

    match names.as_slice() {
        [] => String::new(),
        [one] => format!("[{prefix} {one}]"),
        [one, two] => format!("[{prefix} {one} and {two}]"),
        [one, ..] => format!("[{prefix} {one} et al.]"),
    }
}

fn month_from_name(token: &str) -> Option<u32> {
    if token.len() < 3 || token.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let prefix: String = token.chars().take(3).collect::<String>().to_lowercase();
    MONTHS
        .iter()
        .position(|month| *month == prefix)
        .map(|index| index as u32 + 1)
}

fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut tag = String::new();

    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                let name = tag
                    .trim_start_matches('/')
                    .split(|c: char| c.is_whitespace() || c == '/')
                    .next()
                    .unwrap_or("")
                    .to_ascii_lowercase();
                if matches!(
                    name.as_str(),
                    "p" | "br" | "div" | "li" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "tr"
                ) {
                    text.push('\n');
                }
            }
            _ if in_tag => tag.push(c),
            _ => text.push(c),
        }
    }

    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LibraryId;

    fn creator(last: &str, order: usize, primary: bool) -> Creator {
        Creator {
            creator_type: if primary { "author" } else { "editor" }.into(),
            first_name: String::new(),
            last_name: last.into(),
            name: String::new(),
            order,
            primary,
        }
    }

    #[test]
    fn creator_summaries() {
        assert_eq!(creator_summary(&[]), None);
        assert_eq!(
            creator_summary(&[creator("Smith", 0, true)]).as_deref(),
            Some("Smith")
        );
        assert_eq!(
            creator_summary(&[creator("Jones", 1, true), creator("Smith", 0, true)]).as_deref(),
            Some("Smith and Jones")
        );
        assert_eq!(
            creator_summary(&[
                creator("Smith", 0, true),
                creator("Editor", 1, false),
                creator("Jones", 2, true),
                creator("Brown", 3, true),
            ])
            .as_deref(),
            Some("Smith et al.")
        );
        assert_eq!(creator_summary(&[creator("Editor", 0, false)]), None);
    }

    #[test]
    fn note_preview_takes_first_paragraph() {
        let html = "<div><p>First &amp; foremost</p><p>Second</p></div>";
        assert_eq!(note_preview(html), "First & foremost");
        assert_eq!(note_preview(""), "");

        let long = format!("<p>{}</p>", "x".repeat(500));
        assert_eq!(note_preview(&long).chars().count(), NOTE_PREVIEW_LENGTH);
    }

    #[test]
    fn sort_title_normalizes() {
        assert_eq!(sort_title("\"The <i>Origin</i> of Species\""), "the origin of species\"");
        assert_eq!(sort_title("[Letter to Smith]"), "letter to smith]");
        assert_eq!(sort_title("  "), "");
    }

    #[test]
    fn parse_dates() {
        assert_eq!(parse_date("2019-03-05").unwrap().sortable, "2019-03-05");
        assert_eq!(parse_date("2019").unwrap().sortable, "2019-00-00");
        assert_eq!(parse_date("03/05/2019").unwrap().sortable, "2019-03-05");
        assert_eq!(parse_date("March 5, 2019").unwrap().sortable, "2019-03-05");
        assert_eq!(parse_date("5 Mar 2019").unwrap().sortable, "2019-03-05");
        assert_eq!(parse_date("Spring 1999").unwrap().year, 1999);
        assert!(parse_date("no date").is_none());
    }

    #[test]
    fn titles_for_notes_and_letters() {
        let mut note = Item::new(LibraryId::new("u1"), "NOTE2222", "note");
        note.derived.note_preview = Some("Reading list".into());
        refresh_titles(&mut note);
        assert_eq!(note.derived.display_title, "Reading list");
        assert_eq!(note.derived.sort_title, "reading list");

        let mut letter = Item::new(LibraryId::new("u1"), "LETR2222", "letter");
        letter.creators.push(Creator {
            creator_type: "recipient".into(),
            ..creator("Darwin", 0, false)
        });
        refresh_titles(&mut letter);
        assert_eq!(letter.derived.display_title, "[Letter to Darwin]");
    }
}
