//! List output formatting

use super::theme::Theme;
use crossterm::style::Stylize;
use std::io::Write;

/// Print a section title followed by a blank line.
pub fn print_list_header(out: &mut impl Write, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", title.dark_grey());
    let _ = writeln!(out);
}

/// Print a single package row: name, version, then a dim trailing column.
pub fn print_list_row(out: &mut impl Write, name: &str, version: &str, trailing: &str) {
    let theme = Theme::default();
    let name_part = format!("{name:<width$}", width = theme.layout.name_width);
    let version_part = format!("{version:<width$}", width = theme.layout.version_width);

    let _ = writeln!(
        out,
        "  {} {} {}",
        name_part.with(theme.colors.package_name),
        version_part.with(theme.colors.version),
        trailing.with(theme.colors.secondary)
    );
}

/// Print the package count.
pub fn print_list_footer(out: &mut impl Write, count: usize, noun: &str) {
    let plural = if count == 1 { "" } else { "s" };
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}", format!("{count} {noun}{plural}").dark_grey());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_and_footer() {
        let mut buf = Vec::new();
        print_list_row(&mut buf, "ecsfgrun", "0.4.0", "2026-10-18");
        print_list_footer(&mut buf, 1, "package");
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("ecsfgrun"));
        assert!(text.contains("2026-10-18"));
        assert!(text.contains("1 package"));
        assert!(!text.contains("1 packages"));
    }
}
