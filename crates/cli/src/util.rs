use unicode_width::UnicodeWidthStr;

/// Widest a rendered column may get before values are cut with "..".
const MAX_COLUMN_WIDTH: usize = 28;

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate a string to fit within `width` display columns, adding ".." if truncated.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    if width < 3 {
        return s
            .chars()
            .next()
            .filter(|ch| unicode_width::UnicodeWidthChar::width(*ch).unwrap_or(0) <= width)
            .map(String::from)
            .unwrap_or_default();
    }

    let budget = width - 2;
    let mut used = 0;
    let mut end_byte = 0;
    for (i, ch) in s.char_indices() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            end_byte = i;
            break;
        }
        used += cw;
        end_byte = i + ch.len_utf8();
    }
    format!("{}..", &s[..end_byte])
}

/// Pad or truncate a string to exactly `width` display columns.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    // A wide char cut at the limit leaves the truncated text one column short.
    let s = if display_width(s) > width {
        truncate_display(s, width)
    } else {
        s.to_string()
    };
    let sw = display_width(&s);
    format!("{}{}", s, " ".repeat(width.saturating_sub(sw)))
}

/// Render rows as an aligned plain-text table with a dashed rule under the header.
pub(crate) fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }
    for w in &mut widths {
        *w = (*w).min(MAX_COLUMN_WIDTH);
    }

    let mut out = String::new();
    out.push_str(&table_line(headers.iter().copied(), &widths));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');
    for row in rows {
        out.push_str(&table_line(row.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells.zip(widths).map(|(c, &w)| pad_right(c, w)).collect();
    padded.join("  ").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_width_cjk() {
        assert_eq!(display_width("\u{4e16}\u{754c}"), 4);
        assert_eq!(display_width("BCM"), 3);
    }

    #[test]
    fn truncate_cuts() {
        assert_eq!(truncate_display("abcdef", 5), "abc..");
        assert_eq!(truncate_display("abc", 3), "abc");
        assert_eq!(truncate_display("abc", 2), "a");
        assert_eq!(truncate_display("", 0), "");
    }

    #[test]
    fn pad_right_short_and_long() {
        assert_eq!(pad_right("ab", 5), "ab   ");
        assert_eq!(pad_right("abcdef", 5), "abc..");
    }

    #[test]
    fn pad_right_fills_column_cut_by_wide_char() {
        // "計" is two columns wide and would straddle the three-column budget.
        assert_eq!(truncate_display("ab計cd", 5), "ab..");
        assert_eq!(pad_right("ab計cd", 5), "ab.. ");
        assert_eq!(display_width(&pad_right("ab計cd", 5)), 5);
        assert_eq!(pad_right("abc", 2), "a ");
    }

    #[test]
    fn table_aligns_columns() {
        let rows = vec![
            vec!["BCM".to_string(), "Match".to_string()],
            vec!["TPMS".to_string(), "Not Found".to_string()],
        ];
        let table = render_table(&["ECU", "Status"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "ECU   Status");
        assert_eq!(lines[1], "----  ---------");
        assert_eq!(lines[2], "BCM   Match");
        assert_eq!(lines[3], "TPMS  Not Found");
    }

    #[test]
    fn table_caps_wide_columns() {
        let long = "x".repeat(40);
        let table = render_table(&["ECU"], &[vec![long]]);
        let last = table.lines().last().unwrap();
        assert_eq!(display_width(last), MAX_COLUMN_WIDTH);
        assert!(last.ends_with(".."));
    }
}
