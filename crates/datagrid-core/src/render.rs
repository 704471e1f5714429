//! Server-side HTML for a grid: filter form, table and pagination, plus the
//! script tag that binds the refresher to them.

use std::fmt::Write as _;

use serde::Serialize;

use crate::binding::{FieldError, FilterState, GridRequest, ORDERING_PARAM, PAGE_PARAM};
use crate::definition::{FilterField, GridDefinition, Widget};
use crate::serializer::WirePage;
use crate::view::{escape_html, Pagination, TableBody};

pub struct RenderUrls {
    /// The grid's HTML page; the form posts here when the script is not running.
    pub page: String,
    pub ajax: String,
    pub script: String,
}

/// Settings handed to the browser refresher.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientConfig<'a> {
    id: &'a str,
    endpoint: &'a str,
    method: &'static str,
    form_id: String,
    page_field_id: String,
    table_holder_id: String,
    pagination_id: String,
    header_columns: usize,
    ordering_param: &'static str,
    empty_message: &'a str,
    previous_label: &'a str,
    next_label: &'a str,
}

pub fn render_grid<P, R>(
    definition: &GridDefinition<P, R>,
    wire: &WirePage,
    state: &FilterState,
    request: &GridRequest,
    urls: &RenderUrls,
) -> String {
    let labels = definition.labels();
    let mut html = String::new();
    let _ = write!(
        html,
        "<div class=\"datagrid\" id=\"{}-datagrid\">",
        escape_html(definition.id())
    );

    let _ = write!(
        html,
        "<form id=\"{}\" method=\"{}\" action=\"{}\" class=\"datagrid-filter-form\">",
        escape_html(&definition.form_element_id()),
        definition.method().as_str().to_ascii_lowercase(),
        escape_html(&urls.page)
    );
    for field in definition.filter_fields() {
        let value = request
            .get(&field.name)
            .map(str::to_string)
            .unwrap_or_else(|| state.value(&field.name).canonical());
        render_field(&mut html, &definition.filter_element_id(&field.name), field, &value);
    }
    let _ = write!(
        html,
        "<input type=\"hidden\" name=\"{PAGE_PARAM}\" id=\"{}\" value=\"{}\">",
        escape_html(&definition.page_element_id()),
        wire.current_page
    );
    let _ = write!(
        html,
        "<button type=\"submit\" class=\"datagrid-submit\">{}</button></form>",
        escape_html(&labels.submit)
    );

    render_errors(&mut html, &wire.errors);

    let titles: Vec<&str> = definition.display_titles().collect();
    let _ = write!(
        html,
        "<div id=\"{}\" class=\"datagrid-table-holder\"><table class=\"datagrid-table\"><thead><tr>",
        escape_html(&definition.table_holder_element_id())
    );
    for title in &titles {
        let _ = write!(html, "<th>{}</th>", escape_html(title));
    }
    let body = TableBody::from_page(wire, titles.len(), &labels.empty);
    let _ = write!(html, "</tr></thead><tbody>{}</tbody></table></div>", body.to_html());

    let pagination = Pagination::from_page(wire);
    let _ = write!(
        html,
        "<ul id=\"{}\" class=\"pagination datagrid-pagination\">{}</ul>",
        escape_html(&definition.pagination_element_id()),
        pagination.to_html(&labels.previous, &labels.next)
    );

    let config = ClientConfig {
        id: definition.id(),
        endpoint: &urls.ajax,
        method: definition.method().as_str(),
        form_id: definition.form_element_id(),
        page_field_id: definition.page_element_id(),
        table_holder_id: definition.table_holder_element_id(),
        pagination_id: definition.pagination_element_id(),
        header_columns: titles.len(),
        ordering_param: ORDERING_PARAM,
        empty_message: &labels.empty,
        previous_label: &labels.previous,
        next_label: &labels.next,
    };
    let config = serde_json::to_string(&config)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/");
    let _ = write!(
        html,
        "<script type=\"module\">import {{ DataGrid }} from \"{}\"; new DataGrid({config});</script></div>",
        escape_html(&urls.script)
    );
    html
}

fn render_field(html: &mut String, element_id: &str, field: &FilterField, value: &str) {
    let id = escape_html(element_id);
    let name = escape_html(&field.name);
    let required = if field.options.required { " required" } else { "" };
    let placeholder = field
        .options
        .placeholder
        .as_deref()
        .map(|p| format!(" placeholder=\"{}\"", escape_html(p)))
        .unwrap_or_default();

    let _ = write!(
        html,
        "<div class=\"datagrid-filter\"><label for=\"{id}\">{}</label>",
        escape_html(field.label())
    );
    match &field.widget {
        Widget::Choice(choices) => {
            let _ = write!(html, "<select id=\"{id}\" name=\"{name}\"{required}><option value=\"\"></option>");
            for choice in choices {
                let selected = if choice.value == value { " selected" } else { "" };
                let _ = write!(
                    html,
                    "<option value=\"{}\"{selected}>{}</option>",
                    escape_html(&choice.value),
                    escape_html(&choice.label)
                );
            }
            html.push_str("</select>");
        }
        Widget::Checkbox => {
            let checked = matches!(value.to_ascii_lowercase().as_str(), "1" | "on" | "true" | "yes");
            let _ = write!(
                html,
                "<input type=\"checkbox\" id=\"{id}\" name=\"{name}\" value=\"1\"{}{required}>",
                if checked { " checked" } else { "" }
            );
        }
        widget => {
            let kind = match widget {
                Widget::Integer | Widget::Number => "number",
                Widget::Date => "date",
                _ => "text",
            };
            let step = match widget {
                Widget::Number => " step=\"any\"",
                _ => "",
            };
            let _ = write!(
                html,
                "<input type=\"{kind}\" id=\"{id}\" name=\"{name}\" value=\"{}\"{step}{placeholder}{required}>",
                escape_html(value)
            );
        }
    }
    html.push_str("</div>");
}

fn render_errors(html: &mut String, errors: &[FieldError]) {
    if errors.is_empty() {
        return;
    }
    html.push_str("<ul class=\"datagrid-errors\">");
    for error in errors {
        let _ = write!(
            html,
            "<li data-field=\"{}\">{}</li>",
            escape_html(&error.field),
            escape_html(&error.message)
        );
    }
    html.push_str("</ul>");
}
