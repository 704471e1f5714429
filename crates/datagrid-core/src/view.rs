//! Table body and pagination models built from a [`WirePage`].
//!
//! Both the server (initial render) and the refresher (incremental repaint)
//! build the same models, so the markup of a refreshed grid matches the markup
//! of a freshly loaded one.

use std::fmt::Write as _;

use crate::serializer::{WireAction, WirePage};

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyRow {
    /// One cell per display field, then one cell holding every action link.
    Data {
        cells: Vec<String>,
        actions: Vec<WireAction>,
    },
    /// Shown instead of data rows when the page is empty.
    Placeholder { colspan: usize, message: String },
}

impl BodyRow {
    pub fn cell_count(&self) -> usize {
        match self {
            BodyRow::Data { cells, .. } => cells.len() + 1,
            BodyRow::Placeholder { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableBody {
    pub rows: Vec<BodyRow>,
}

impl TableBody {
    /// `header_columns` is the number of display columns in the table header;
    /// the placeholder spans them plus the actions column.
    pub fn from_page(page: &WirePage, header_columns: usize, empty_message: &str) -> Self {
        if page.items.is_empty() {
            return Self {
                rows: vec![BodyRow::Placeholder {
                    colspan: header_columns + 1,
                    message: empty_message.to_string(),
                }],
            };
        }
        Self {
            rows: page
                .items
                .iter()
                .map(|item| BodyRow::Data {
                    cells: item.data.clone(),
                    actions: item.actions.clone(),
                })
                .collect(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.rows.as_slice(), [BodyRow::Placeholder { .. }])
    }

    /// Inner HTML of `<tbody>`. Cells are escaped; action labels are trusted
    /// markup from the grid definition.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for row in &self.rows {
            html.push_str("<tr>");
            match row {
                BodyRow::Data { cells, actions } => {
                    for cell in cells {
                        let _ = write!(html, "<td>{}</td>", escape_html(cell));
                    }
                    html.push_str("<td class=\"datagrid-actions\">");
                    for action in actions {
                        let _ = write!(
                            html,
                            "<a href=\"{}\">{}</a> ",
                            escape_html(&action.url),
                            action.label
                        );
                    }
                    html.push_str("</td>");
                }
                BodyRow::Placeholder { colspan, message } => {
                    let _ = write!(
                        html,
                        "<td colspan=\"{colspan}\" class=\"datagrid-empty\">{}</td>",
                        escape_html(message)
                    );
                }
            }
            html.push_str("</tr>");
        }
        html
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItemKind {
    Previous,
    Page(u32),
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageItem {
    pub kind: PageItemKind,
    pub active: bool,
    pub disabled: bool,
    /// Page requested when the item is clicked; `None` when disabled.
    pub target: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub items: Vec<PageItem>,
    pub current_page: u32,
    pub page_count: u32,
}

impl Pagination {
    pub fn new(current_page: u32, page_count: u32) -> Self {
        let page_count = page_count.max(1);
        let current_page = current_page.max(1);
        let mut items = Vec::with_capacity(page_count as usize + 2);

        let has_previous = current_page > 1;
        items.push(PageItem {
            kind: PageItemKind::Previous,
            active: false,
            disabled: !has_previous,
            target: has_previous.then(|| (current_page - 1).min(page_count)),
        });
        items.extend((1..=page_count).map(|n| PageItem {
            kind: PageItemKind::Page(n),
            active: n == current_page,
            disabled: false,
            target: Some(n),
        }));
        let has_next = current_page < page_count;
        items.push(PageItem {
            kind: PageItemKind::Next,
            active: false,
            disabled: !has_next,
            target: has_next.then(|| current_page + 1),
        });

        Self {
            items,
            current_page,
            page_count,
        }
    }

    pub fn from_page(page: &WirePage) -> Self {
        Self::new(page.current_page, page.nb_pages)
    }

    pub fn previous(&self) -> &PageItem {
        &self.items[0]
    }

    pub fn next(&self) -> &PageItem {
        &self.items[self.items.len() - 1]
    }

    pub fn pages(&self) -> &[PageItem] {
        &self.items[1..self.items.len() - 1]
    }

    pub fn active_page(&self) -> Option<u32> {
        self.pages().iter().find(|i| i.active).and_then(|i| i.target)
    }

    /// Inner HTML of the pagination `<ul>`. Enabled items carry `data-page`.
    pub fn to_html(&self, previous_label: &str, next_label: &str) -> String {
        let mut html = String::new();
        for item in &self.items {
            let label = match item.kind {
                PageItemKind::Previous => escape_html(previous_label),
                PageItemKind::Next => escape_html(next_label),
                PageItemKind::Page(n) => n.to_string(),
            };
            let mut class = String::from("page-item");
            if item.active {
                class.push_str(" active");
            }
            if item.disabled {
                class.push_str(" disabled");
            }
            match item.target {
                Some(target) => {
                    let _ = write!(
                        html,
                        "<li class=\"{class}\" data-page=\"{target}\"><div class=\"page-link\">{label}</div></li>"
                    );
                }
                None => {
                    let _ = write!(
                        html,
                        "<li class=\"{class}\"><div class=\"page-link\">{label}</div></li>"
                    );
                }
            }
        }
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::WireRow;

    fn wire(items: usize, current_page: u32, nb_pages: u32) -> WirePage {
        WirePage {
            items: (0..items)
                .map(|i| WireRow {
                    data: vec![format!("row {i}"), "<b>x</b>".into()],
                    actions: vec![WireAction {
                        url: format!("/rows/{i}?a=1&b=2"),
                        label: "Edit".into(),
                    }],
                })
                .collect(),
            nb_pages,
            current_page,
            total_count: items as u64,
            errors: Vec::new(),
        }
    }

    #[test]
    fn one_row_per_item_with_actions_cell() {
        let body = TableBody::from_page(&wire(3, 1, 1), 2, "No results");
        assert_eq!(body.rows.len(), 3);
        assert!(body.rows.iter().all(|r| r.cell_count() == 3));
        let html = body.to_html();
        assert_eq!(html.matches("<tr>").count(), 3);
        assert!(html.contains("<td>&lt;b&gt;x&lt;/b&gt;</td>"));
        assert!(html.contains("<a href=\"/rows/0?a=1&amp;b=2\">Edit</a>"));
    }

    #[test]
    fn empty_page_renders_single_placeholder() {
        let body = TableBody::from_page(&wire(0, 1, 1), 4, "No results");
        assert!(body.is_placeholder());
        assert_eq!(
            body.rows,
            vec![BodyRow::Placeholder {
                colspan: 5,
                message: "No results".into()
            }]
        );
        assert_eq!(
            body.to_html(),
            "<tr><td colspan=\"5\" class=\"datagrid-empty\">No results</td></tr>"
        );
    }

    #[test]
    fn pagination_rules_hold_for_every_page() {
        for page_count in 1..=6u32 {
            for current in 1..=page_count {
                let p = Pagination::new(current, page_count);
                assert_eq!(p.items.len(), page_count as usize + 2);
                assert_eq!(p.previous().disabled, current == 1);
                assert_eq!(p.next().disabled, current == page_count);
                let active: Vec<&PageItem> = p.items.iter().filter(|i| i.active).collect();
                assert_eq!(active.len(), 1);
                assert_eq!(active[0].kind, PageItemKind::Page(current));
                assert_eq!(p.active_page(), Some(current));
            }
        }
    }

    #[test]
    fn middle_page_links_both_ways() {
        let p = Pagination::new(2, 3);
        assert_eq!(p.previous().target, Some(1));
        assert_eq!(p.next().target, Some(3));
        let html = p.to_html("Previous", "Next");
        assert!(html.starts_with(
            "<li class=\"page-item\" data-page=\"1\"><div class=\"page-link\">Previous</div></li>"
        ));
        assert!(html.contains("<li class=\"page-item active\" data-page=\"2\">"));
    }

    #[test]
    fn page_beyond_range_only_links_back() {
        let p = Pagination::new(9, 3);
        assert!(p.next().disabled);
        assert_eq!(p.previous().target, Some(3));
        assert_eq!(p.active_page(), None);
    }

    #[test]
    fn last_representable_page_does_not_overflow() {
        let p = Pagination::new(u32::MAX, 3);
        assert!(p.next().disabled);
        assert_eq!(p.next().target, None);
        assert_eq!(p.previous().target, Some(3));
        assert_eq!(p.current_page, u32::MAX);
    }
}
