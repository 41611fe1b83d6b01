//! Plain-text grid tables for the check summary and the analyzer output.

/// Render a grid table with a title, e.g.
///
/// ```text
/// WAF Health & Functional Check Summary
/// +----------+-------------------+--------------+------------------+
/// | Waf Name | URL               | Health Check | Functional Check |
/// +----------+-------------------+--------------+------------------+
/// | WAF 1    | http://localhost  |      ✓       |        ✗         |
/// +----------+-------------------+--------------+------------------+
/// ```
///
/// The first column is left-aligned, the rest are centered when narrow
/// (check marks) and left-aligned otherwise; widths fit the longest cell.
pub fn render_table(title: &str, headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let separator = {
        let mut line = String::from("+");
        for width in &widths {
            line.push_str(&"-".repeat(width + 2));
            line.push('+');
        }
        line
    };

    let render_row = |cells: &[String]| {
        let mut line = String::from("|");
        for (i, &width) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let len = cell.chars().count();
            if len < 4 && i > 0 {
                // Center short cells such as check marks.
                let pad = width - len;
                let left = pad / 2;
                line.push_str(&format!(" {}{}{} |", " ".repeat(left), cell, " ".repeat(pad - left)));
            } else {
                line.push_str(&format!(" {cell:<width$} |"));
            }
        }
        line
    };

    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&separator);
    out.push('\n');
    out.push_str(&render_row(
        &headers.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
    ));
    out.push('\n');
    out.push_str(&separator);
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&separator);
    out
}
