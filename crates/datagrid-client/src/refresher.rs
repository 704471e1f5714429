//! Refresh cycle for one grid instance.
//!
//! `Idle → Loading → Idle`: a trigger (submit or pagination click) takes a new
//! token, sends one request and the response is painted only when its token is
//! still the latest. Failures clear loading and keep the previous table.

use datagrid_core::{FieldError, Method, PageItem, Pagination, TableBody, WirePage};
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::form::FilterForm;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Filter form submitted: page resets to 1.
    Submit,
    /// Pagination item clicked.
    Page(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub token: u64,
    pub method: Method,
    pub pairs: Vec<(String, String)>,
}

#[derive(Debug)]
pub enum Outcome {
    Applied,
    /// A newer request was issued after this one; its response was dropped.
    Stale,
    Failed(ClientError),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

/// What the grid currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridView {
    pub body: TableBody,
    pub pagination: Pagination,
    pub errors: Vec<FieldError>,
    pub total_count: u64,
}

impl GridView {
    pub fn from_page(page: &WirePage, header_columns: usize, empty_message: &str) -> Self {
        Self {
            body: TableBody::from_page(page, header_columns, empty_message),
            pagination: Pagination::from_page(page),
            errors: page.errors.clone(),
            total_count: page.total_count,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RefresherConfig {
    pub method: Method,
    /// Number of `<th>` in the table header.
    pub header_columns: usize,
    pub empty_message: String,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            method: Method::Get,
            header_columns: 0,
            empty_message: "No results".into(),
        }
    }
}

pub struct Refresher<T> {
    transport: T,
    config: RefresherConfig,
    form: FilterForm,
    view: Option<GridView>,
    latest: u64,
    loading: bool,
}

impl<T: Transport> Refresher<T> {
    pub fn new(transport: T, config: RefresherConfig, form: FilterForm) -> Self {
        Self {
            transport,
            config,
            form,
            view: None,
            latest: 0,
            loading: false,
        }
    }

    /// Seed the view with the server-rendered first page.
    pub fn with_initial_page(mut self, page: &WirePage) -> Self {
        self.view = Some(self.build_view(page));
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn form(&self) -> &FilterForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FilterForm {
        &mut self.form
    }

    pub fn view(&self) -> Option<&GridView> {
        self.view.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Enter `Loading` for a new trigger and return the request to send.
    pub fn begin(&mut self, trigger: Trigger) -> Ticket {
        match trigger {
            Trigger::Submit => self.form.set_page(1),
            Trigger::Page(page) => self.form.set_page(page),
        }
        self.latest += 1;
        self.loading = true;
        debug!(token = self.latest, page = self.form.page(), "grid refresh started");
        Ticket {
            token: self.latest,
            method: self.config.method,
            pairs: self.form.to_pairs(),
        }
    }

    /// Apply the response for `token`. Only the latest token repaints or
    /// leaves `Loading`.
    pub fn finish(&mut self, token: u64, result: Result<WirePage, ClientError>) -> Outcome {
        if token != self.latest {
            debug!(token, latest = self.latest, "discarding stale grid response");
            return Outcome::Stale;
        }
        self.loading = false;
        match result {
            Ok(page) => {
                self.view = Some(self.build_view(&page));
                Outcome::Applied
            }
            Err(err) => {
                warn!(token, error = %err, "grid refresh failed; keeping previous table");
                Outcome::Failed(err)
            }
        }
    }

    pub async fn refresh(&mut self, trigger: Trigger) -> Outcome {
        let ticket = self.begin(trigger);
        let result = self.transport.fetch(ticket.method, &ticket.pairs).await;
        self.finish(ticket.token, result)
    }

    pub async fn submit(&mut self) -> Outcome {
        self.refresh(Trigger::Submit).await
    }

    pub async fn go_to_page(&mut self, page: u32) -> Outcome {
        self.refresh(Trigger::Page(page)).await
    }

    /// Follow a pagination item. Disabled items do nothing.
    pub async fn click(&mut self, item: &PageItem) -> Option<Outcome> {
        match item.target {
            Some(page) if !item.disabled => Some(self.go_to_page(page).await),
            _ => None,
        }
    }

    fn build_view(&self, page: &WirePage) -> GridView {
        GridView::from_page(page, self.config.header_columns, &self.config.empty_message)
    }
}
