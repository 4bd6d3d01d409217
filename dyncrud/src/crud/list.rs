//! Simple list and detail views
//!
//! Plain HTML with stable classes, meant to be dropped into a page and
//! styled by the application. Values are the text-cast strings coming off
//! the reads, escaped; NULLs render as an em-styled placeholder.

use crate::db::{ListPage, Record};
use crate::forms::escape;
use crate::schema::TableSchema;

/// Render one page of rows as a table
///
/// Columns follow catalog order with humanized headers; a footer line shows
/// the page position.
#[must_use]
pub fn render_table(schema: &TableSchema, page: &ListPage) -> String {
    let columns: Vec<_> = crate::db::selected_columns(schema);

    let mut html = String::from("<table class=\"crud-list\">\n<thead>\n<tr>");
    for column in &columns {
        html.push_str(&format!("<th>{}</th>", escape(&column.label())));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    if page.rows.is_empty() {
        html.push_str(&format!(
            "<tr><td colspan=\"{}\" class=\"crud-empty\">No records found</td></tr>\n",
            columns.len()
        ));
    }
    for row in &page.rows {
        html.push_str("<tr>");
        for column in &columns {
            html.push_str(&format!("<td>{}</td>", cell(row, &column.name)));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table>\n");
    html.push_str(&format!(
        "<p class=\"crud-pagination\">Page {} of {} ({} total)</p>\n",
        page.page,
        page.total_pages().max(1),
        page.total
    ));
    html
}

/// Render a single row as a definition list
#[must_use]
pub fn render_detail(schema: &TableSchema, record: &Record) -> String {
    let mut html = String::from("<dl class=\"crud-detail\">\n");
    for column in crate::db::selected_columns(schema) {
        html.push_str(&format!(
            "<dt>{}</dt>\n<dd>{}</dd>\n",
            escape(&column.label()),
            cell(record, &column.name)
        ));
    }
    html.push_str("</dl>\n");
    html
}

fn cell(record: &Record, column: &str) -> String {
    match record.get(column) {
        Some(Some(value)) => escape(value),
        _ => "<em>null</em>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ColumnKind};

    fn schema() -> TableSchema {
        let mk = |name: &str, is_primary: bool| Column {
            name: name.into(),
            sql_type: "text".into(),
            kind: if is_primary { ColumnKind::Integer } else { ColumnKind::Text },
            nullable: !is_primary,
            default: None,
            is_primary,
            max_length: None,
            meta: None,
        };
        TableSchema {
            table: "contacts".into(),
            primary_key: "id".into(),
            columns: vec![mk("id", true), mk("full_name", false)],
        }
    }

    fn record(pairs: &[(&str, Option<&str>)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.map(ToString::to_string)))
            .collect()
    }

    #[test]
    fn test_render_table() {
        let page = ListPage {
            rows: vec![record(&[("id", Some("1")), ("full_name", Some("Ada <3"))])],
            total: 1,
            page: 1,
            per_page: 25,
        };
        let html = render_table(&schema(), &page);
        assert!(html.contains("<th>Full name</th>"));
        assert!(html.contains("<td>Ada &lt;3</td>"));
        assert!(html.contains("Page 1 of 1 (1 total)"));
    }

    #[test]
    fn test_render_table_empty() {
        let page = ListPage {
            rows: vec![],
            total: 0,
            page: 1,
            per_page: 25,
        };
        let html = render_table(&schema(), &page);
        assert!(html.contains("No records found"));
    }

    #[test]
    fn test_render_detail_null() {
        let html = render_detail(&schema(), &record(&[("id", Some("1")), ("full_name", None)]));
        assert!(html.contains("<dd><em>null</em></dd>"));
    }
}
